#![warn(missing_docs)]

//! radiolink-protocol: frame layout, integrity checking and message segmentation.

/// CRC-8 used to protect every frame.
pub mod crc;
/// Frame header codec.
pub mod frame;
/// Messages and fragments moving through the slot buffers.
pub mod message;
/// Splitting outbound payloads into radio-sized fragments.
pub mod segmentation;

pub use frame::{build_frame, verify_and_strip, FrameHeader};
pub use message::Message;
pub use segmentation::{parts_needed, segment};
