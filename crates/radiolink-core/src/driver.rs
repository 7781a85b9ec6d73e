//! Radio driver abstraction for pluggable hardware.

use std::io::Result;

use crate::NodeAddress;

/// Raw radio primitives required by the protocol.
///
/// This trait lets various radios (RFM69 over SPI, an in-memory simulator, etc.)
/// be plugged into the control loop without coupling to a concrete driver.
/// Encryption, addressing filters and the frame-level ACK handshake belong to
/// the driver.
pub trait RadioDriver {
    /// Sends one frame to `dest`, requesting a radio-level ACK.
    fn transmit(&mut self, dest: NodeAddress, frame: &[u8]) -> Result<()>;

    /// Returns true when a received frame is waiting to be read.
    fn receive_pending(&mut self) -> bool;

    /// Reads the pending frame into `buffer`, returning its sender and contents.
    fn receive<'a>(&mut self, buffer: &'a mut [u8]) -> Result<(NodeAddress, &'a [u8])>;

    /// Answers an ACK request from `dest`.
    fn send_ack(&mut self, dest: NodeAddress) -> Result<()>;

    /// Returns true once `dest` acknowledged the last transmitted frame.
    fn ack_received(&mut self, dest: NodeAddress) -> bool;

    /// Returns true when the frame just received from `src` asked for an ACK.
    fn ack_requested(&mut self, src: NodeAddress) -> bool;
}

impl<D: RadioDriver + ?Sized> RadioDriver for &mut D {
    fn transmit(&mut self, dest: NodeAddress, frame: &[u8]) -> Result<()> {
        (**self).transmit(dest, frame)
    }

    fn receive_pending(&mut self) -> bool {
        (**self).receive_pending()
    }

    fn receive<'a>(&mut self, buffer: &'a mut [u8]) -> Result<(NodeAddress, &'a [u8])> {
        (**self).receive(buffer)
    }

    fn send_ack(&mut self, dest: NodeAddress) -> Result<()> {
        (**self).send_ack(dest)
    }

    fn ack_received(&mut self, dest: NodeAddress) -> bool {
        (**self).ack_received(dest)
    }

    fn ack_requested(&mut self, src: NodeAddress) -> bool {
        (**self).ack_requested(src)
    }
}
