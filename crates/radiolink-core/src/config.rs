use std::{default::Default, time::Duration};

use crate::{
    constants::{
        DEFAULT_ACK_DELAY, DEFAULT_ACK_POLL_INTERVAL, DEFAULT_ACK_TIMEOUT, DEFAULT_MAX_FRAME_SIZE,
        DEFAULT_MAX_RETRIES, DEFAULT_RX_BUFFER_SIZE, DEFAULT_TX_BUFFER_SIZE, FRAME_HEADER_SIZE,
    },
    error::{ErrorKind, Result},
};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Configuration options to tune buffering and delivery behavior.
pub struct Config {
    /// Number of receive slots (fragments and complete messages awaiting delivery).
    pub rx_buffer_size: usize,
    /// Number of transmit slots (one per outbound frame).
    pub tx_buffer_size: usize,
    /// Max total frame size in bytes, header included. Fixed by the transport.
    pub max_frame_size: usize,
    /// Max time to wait for the driver to report an ACK after a transmission.
    pub ack_timeout: Duration,
    /// Sleep between two polls of the driver ACK flag.
    pub ack_poll_interval: Duration,
    /// Number of transmission attempts before a frame is dropped.
    pub max_retries: u8,
    /// Delay honored before answering an ACK request. None sends the ACK immediately.
    pub ack_delay: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rx_buffer_size: DEFAULT_RX_BUFFER_SIZE,
            tx_buffer_size: DEFAULT_TX_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            ack_poll_interval: DEFAULT_ACK_POLL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            ack_delay: Some(DEFAULT_ACK_DELAY),
        }
    }
}

impl Config {
    /// Payload bytes carried by one frame.
    pub fn payload_capacity(&self) -> usize {
        self.max_frame_size.saturating_sub(FRAME_HEADER_SIZE)
    }

    /// Number of poll intervals one ACK wait may sleep before timing out.
    pub fn ack_poll_budget(&self) -> u32 {
        let interval = self.ack_poll_interval.as_micros();
        if interval == 0 {
            return 0;
        }
        (self.ack_timeout.as_micros() / interval).min(u32::MAX as u128) as u32
    }

    /// Checks that the configuration can drive a radio.
    pub fn validate(&self) -> Result<()> {
        if self.rx_buffer_size == 0 {
            return Err(ErrorKind::InvalidConfig("rx_buffer_size must be at least 1"));
        }
        if self.tx_buffer_size == 0 {
            return Err(ErrorKind::InvalidConfig("tx_buffer_size must be at least 1"));
        }
        // parts_total travels in a single byte
        if self.tx_buffer_size > u8::MAX as usize {
            return Err(ErrorKind::InvalidConfig("tx_buffer_size must not exceed 255"));
        }
        if self.max_frame_size <= FRAME_HEADER_SIZE {
            return Err(ErrorKind::InvalidConfig("max_frame_size leaves no room for payload"));
        }
        if self.max_frame_size > u8::MAX as usize {
            return Err(ErrorKind::InvalidConfig("max_frame_size must not exceed 255"));
        }
        if self.max_retries == 0 {
            return Err(ErrorKind::InvalidConfig("max_retries must be at least 1"));
        }
        if self.ack_poll_interval.is_zero() {
            return Err(ErrorKind::InvalidConfig("ack_poll_interval must be non-zero"));
        }
        Ok(())
    }
}
