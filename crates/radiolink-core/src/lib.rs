#![warn(missing_docs)]

//! radiolink-core: foundational types and utilities.
//!
//! This crate provides the minimal set of core items shared across all layers:
//! - Configuration types
//! - Error handling
//! - Protocol constants
//! - Capability traits the protocol requires from the radio and the host
//!
//! Protocol-specific logic lives in specialized crates:
//! - `radiolink-protocol`: frame codec, CRC-8, messages, segmentation
//! - `radiolink-host`: slot buffers, reassembly, delivery and the control loop

/// One-byte node address used on the radio network.
pub type NodeAddress = u8;

/// Protocol constants shared across layers.
pub mod constants {
    use std::time::Duration;

    /// The size of the frame header: part, parts total, reserved, CRC-8.
    pub const FRAME_HEADER_SIZE: usize = 4;
    /// Maximum frame size of an RFM69 packet.
    pub const DEFAULT_MAX_FRAME_SIZE: usize = 61;
    /// Payload bytes per frame with the default frame size.
    /// Derived from max_frame_size - header_size
    ///       57 = 61 - 4
    pub const DEFAULT_PAYLOAD_CAPACITY: usize = DEFAULT_MAX_FRAME_SIZE - FRAME_HEADER_SIZE;
    /// Default number of receive slots.
    pub const DEFAULT_RX_BUFFER_SIZE: usize = 50;
    /// Default number of transmit slots.
    pub const DEFAULT_TX_BUFFER_SIZE: usize = 50;
    /// Default time to wait for an ACK after each transmission.
    pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(200);
    /// Default sleep between two polls of the driver ACK flag.
    pub const DEFAULT_ACK_POLL_INTERVAL: Duration = Duration::from_millis(1);
    /// Default number of transmission attempts before a frame is dropped.
    pub const DEFAULT_MAX_RETRIES: u8 = 3;
    /// Default delay honored before answering an ACK request.
    pub const DEFAULT_ACK_DELAY: Duration = Duration::from_millis(5);
    /// CRC-8 generator polynomial. Part of the wire contract.
    pub const CRC8_POLY: u8 = 0x31;
    /// CRC-8 seed. Part of the wire contract.
    pub const CRC8_INIT: u8 = 0xFF;
}

/// Configuration options for the protocol and control loop.
pub mod config;
/// Host-provided delay primitive.
pub mod delay;
/// Radio driver capability interface.
pub mod driver;
/// Error types and results.
pub mod error;

pub use config::Config;
pub use delay::Delay;
pub use driver::RadioDriver;
