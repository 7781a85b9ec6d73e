//! Per-frame delivery state machine.
//!
//! ```text
//! Queued -> AwaitingAck -> Acked
//!                       -> TimedOut -> Queued   (retries < ceiling)
//!                                   -> Dropped  (retries == ceiling)
//! ```
//!
//! Only one frame is in flight at a time. The ACK wait blocks the control loop.

use std::time::Duration;

use radiolink_core::{Delay, NodeAddress, RadioDriver};

/// Where an outbound frame stands in its delivery.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryState {
    /// Waiting in the transmit buffer.
    Queued,
    /// Sent, polling the driver for an ACK.
    AwaitingAck,
    /// Acknowledged by the peer; the slot is freed.
    Acked,
    /// No ACK arrived within the wait budget.
    TimedOut,
    /// Retry ceiling reached; the frame is discarded.
    Dropped,
}

impl DeliveryState {
    /// True for states that release the slot.
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryState::Acked | DeliveryState::Dropped)
    }

    /// State reached once the driver has been handed the frame.
    ///
    /// A frame the driver failed to send cannot be acknowledged, so it times out at once.
    pub fn after_transmit(sent: bool) -> Self {
        if sent {
            DeliveryState::AwaitingAck
        } else {
            DeliveryState::TimedOut
        }
    }

    /// State reached when an ACK wait ends.
    pub fn after_wait(acked: bool) -> Self {
        if acked {
            DeliveryState::Acked
        } else {
            DeliveryState::TimedOut
        }
    }
}

/// Polls `driver` for an ACK from `dest`, sleeping `interval` between polls.
///
/// Gives up after sleeping `poll_budget` times. The driver is always checked once
/// more after the last sleep.
pub fn await_ack<D, T>(
    driver: &mut D,
    delay: &mut T,
    dest: NodeAddress,
    poll_budget: u32,
    interval: Duration,
) -> bool
where
    D: RadioDriver + ?Sized,
    T: Delay + ?Sized,
{
    let mut waited = 0;
    loop {
        if driver.ack_received(dest) {
            tracing::trace!("ACK from node {} after {} poll(s)", dest, waited);
            return true;
        }
        if waited >= poll_budget {
            return false;
        }
        delay.delay(interval);
        waited += 1;
    }
}

/// Decides what happens to a frame after a timed-out attempt.
///
/// `retries` is the attempt count including the one that just timed out.
pub fn next_state_after_timeout(retries: u8, ceiling: u8) -> DeliveryState {
    if retries >= ceiling {
        DeliveryState::Dropped
    } else {
        DeliveryState::Queued
    }
}
