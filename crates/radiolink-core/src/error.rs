//! Error types and results.
//!
//! Two layers of errors exist:
//! - [`RadioError`]: the fault kinds counted by the radio and reported to the
//!   application error handler. None of them is fatal for the process.
//! - [`ErrorKind`]: the error returned by fallible library calls. It wraps a
//!   [`RadioError`] when the failure is one of the counted faults.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
};

/// Wrapped result type for radiolink operations.
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Faults detected by the radio layer.
///
/// Every occurrence increments the radio error counter and is forwarded to the
/// optional error handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioError {
    /// An incoming frame was dropped because no receive slot was free.
    ReceiveBufferFull,
    /// An outbound message was rejected before any fragment was enqueued.
    TransmitBufferFull,
    /// Memory for a frame or message payload could not be obtained.
    AllocationFailure,
    /// A received frame failed the CRC-8 check and was discarded.
    CrcMismatch,
    /// An outbound frame exceeded its retry ceiling and was dropped.
    AckTimeoutExhausted,
}

impl Display for RadioError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RadioError::ReceiveBufferFull => write!(fmt, "Receive buffer full, frame dropped."),
            RadioError::TransmitBufferFull => {
                write!(fmt, "Transmit buffer full, message rejected.")
            }
            RadioError::AllocationFailure => write!(fmt, "Could not allocate message memory."),
            RadioError::CrcMismatch => write!(fmt, "CRC-8 of received frame does not match."),
            RadioError::AckTimeoutExhausted => {
                write!(fmt, "No ACK received within the configured number of retries.")
            }
        }
    }
}

impl Error for RadioError {}

/// Enum with all possible errors that could occur.
#[derive(Debug)]
pub enum ErrorKind {
    /// One of the counted radio faults.
    Radio(RadioError),
    /// A frame is too short to carry a header and at least one payload byte.
    FrameTooShort {
        /// Minimum acceptable length.
        min: usize,
        /// Received length.
        actual: usize,
    },
    /// A frame header describes a part that can never be delivered.
    MalformedHeader {
        /// Part index found in the header.
        part: u8,
        /// Parts total found in the header.
        parts_total: u8,
    },
    /// The configuration cannot drive a radio.
    InvalidConfig(&'static str),
    /// Wrapper around a std io::Error returned by a driver primitive.
    IOError(io::Error),
}

impl ErrorKind {
    /// Returns the counted radio fault behind this error, if any.
    pub fn radio_error(&self) -> Option<RadioError> {
        match self {
            ErrorKind::Radio(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Radio(e) => write!(fmt, "Radio error. Reason: {}", e),
            ErrorKind::FrameTooShort { min, actual } => write!(
                fmt,
                "The received frame was too short: need at least {} bytes, got {}.",
                min, actual
            ),
            ErrorKind::MalformedHeader { part, parts_total } => write!(
                fmt,
                "Frame header describes part {} of {}, which cannot be reassembled.",
                part, parts_total
            ),
            ErrorKind::InvalidConfig(reason) => write!(fmt, "Invalid configuration: {}", reason),
            ErrorKind::IOError(e) => write!(fmt, "An IO Error occurred. Reason: {:?}.", e),
        }
    }
}

impl Error for ErrorKind {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ErrorKind::Radio(e) => Some(e),
            ErrorKind::IOError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(inner: io::Error) -> ErrorKind {
        ErrorKind::IOError(inner)
    }
}

impl From<RadioError> for ErrorKind {
    fn from(inner: RadioError) -> ErrorKind {
        ErrorKind::Radio(inner)
    }
}
