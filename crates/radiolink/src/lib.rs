#![warn(missing_docs)]

//! Radiolink: a small public API facade for the workspace.
//!
//! This crate re-exports the types needed to move arbitrary-length messages
//! between nodes of a packet radio network whose frames hold only a few dozen
//! bytes:
//!
//! - The control loop (`Radio`) and its configuration (`Config`)
//! - The capabilities a radio must provide (`RadioDriver`, `Delay`)
//! - Errors (`ErrorKind`, `RadioError`)
//! - An in-memory medium for tests and demos (`SimulatedAir`, `AirDriver`)
//!
//! Example
//! ```
//! use radiolink::prelude::*;
//!
//! let air = SimulatedAir::new();
//! let mut sender = Radio::new(1, Config::default(), air.attach(1), ManualDelay::default()).unwrap();
//! let mut receiver = Radio::new(2, Config::default(), air.attach(2), ManualDelay::default()).unwrap();
//!
//! let inbox = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
//! let sink = inbox.clone();
//! receiver.set_message_handler(move |_, payload| sink.borrow_mut().push(payload.to_vec()));
//!
//! sender.transmit(2, b"hello").unwrap();
//! sender.poll();
//! receiver.poll();
//!
//! assert_eq!(*inbox.borrow(), vec![b"hello".to_vec()]);
//! ```

// Core configuration, capabilities and errors
pub use radiolink_core::{
    config::Config,
    error::{ErrorKind, RadioError, Result},
    Delay, NodeAddress, RadioDriver,
};
// Host: the control loop and its buffers
pub use radiolink_host::{DeliveryState, Radio, RadioStatistics};
// Protocol: wire format
pub use radiolink_protocol::{FrameHeader, Message};
// Utilities: simulated medium and delays
pub use radiolink_utilities::{AirDriver, ManualDelay, SimulatedAir, StdDelay};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        AirDriver, Config, Delay, ErrorKind, ManualDelay, NodeAddress, Radio, RadioDriver,
        RadioError, RadioStatistics, SimulatedAir, StdDelay,
    };
}
