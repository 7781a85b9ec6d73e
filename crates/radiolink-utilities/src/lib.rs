#![warn(missing_docs)]

//! Utilities for running radiolink without radio hardware.
//!
//! ## Simulated air
//! [`SimulatedAir`] is an in-memory medium shared by any number of
//! [`AirDriver`]s. It can lose, corrupt or refuse frames on demand, which is how
//! the end-to-end tests drive retries and CRC failures.
//!
//! ## Delays
//! [`StdDelay`] sleeps the calling thread. [`ManualDelay`] only records the time
//! that would have been spent, so ACK timeouts cost nothing in tests.

/// In-memory radio medium and driver.
pub mod air;
/// Host and test delay primitives.
pub mod delay;

pub use air::{AirDriver, SimulatedAir};
pub use delay::{ManualDelay, StdDelay};
