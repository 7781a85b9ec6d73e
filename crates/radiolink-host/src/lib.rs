#![warn(missing_docs)]

//! radiolink-host: buffering, reassembly and delivery on top of a radio driver.

/// Per-frame delivery state machine and ACK wait.
pub mod delivery;
/// The radio control loop.
pub mod radio;
/// Merging received fragments into complete messages.
pub mod reassembly;
/// Fixed-capacity message slot arrays.
pub mod slot_buffer;
/// Traffic counters.
pub mod statistics;

pub use delivery::DeliveryState;
pub use radio::{ErrorHandler, MessageHandler, Radio};
pub use slot_buffer::{Direction, SlotBuffer, SlotIndex};
pub use statistics::RadioStatistics;
