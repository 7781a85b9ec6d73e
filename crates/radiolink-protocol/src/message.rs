use radiolink_core::{
    error::{ErrorKind, RadioError, Result},
    NodeAddress,
};

use crate::frame::{build_frame, FrameHeader};

/// A logical unit of data moving between two addressed nodes.
///
/// A message with `parts_total == 1` is complete and can be handed to the
/// application. Anything larger is a fragment waiting for its siblings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Node that produced the message.
    pub source: NodeAddress,
    /// Node the message is addressed to.
    pub destination: NodeAddress,
    /// Owned payload bytes.
    pub payload: Vec<u8>,
    /// 0-based fragment index.
    pub part: u8,
    /// Number of fragments the original message was split into.
    pub parts_total: u8,
    /// Failed delivery attempts so far.
    pub retries: u8,
}

impl Message {
    /// Creates a complete, single-part message.
    pub fn new(source: NodeAddress, destination: NodeAddress, payload: Vec<u8>) -> Self {
        Self::fragment(source, destination, payload, 0, 1)
    }

    /// Creates one fragment of a multi-part message.
    pub fn fragment(
        source: NodeAddress,
        destination: NodeAddress,
        payload: Vec<u8>,
        part: u8,
        parts_total: u8,
    ) -> Self {
        Self { source, destination, payload, part, parts_total, retries: 0 }
    }

    /// Copies a verified frame payload into a new receive-side message.
    pub fn from_frame(
        source: NodeAddress,
        destination: NodeAddress,
        header: &FrameHeader,
        payload: &[u8],
    ) -> Result<Self> {
        let mut owned = Vec::new();
        owned
            .try_reserve_exact(payload.len())
            .map_err(|_| ErrorKind::Radio(RadioError::AllocationFailure))?;
        owned.extend_from_slice(payload);
        Ok(Self::fragment(source, destination, owned, header.part, header.parts_total))
    }

    /// True when the message needs no reassembly.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.parts_total == 1
    }

    /// True when the message is one part of a larger message.
    #[inline]
    pub fn is_fragment(&self) -> bool {
        self.parts_total > 1
    }

    /// Borrowed payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the message, returning its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Serializes this message into a wire frame.
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        build_frame(&self.payload, self.part, self.parts_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::verify_and_strip;

    #[test]
    fn test_single_part_message_is_complete() {
        let msg = Message::new(1, 2, vec![1, 2, 3]);
        assert!(msg.is_complete());
        assert!(!msg.is_fragment());
        assert_eq!(msg.retries, 0);
        assert_eq!(msg.len(), 3);
    }

    #[test]
    fn test_fragment_is_not_complete() {
        let msg = Message::fragment(1, 2, vec![0; 57], 1, 3);
        assert!(msg.is_fragment());
        assert!(!msg.is_complete());
    }

    #[test]
    fn test_frame_round_trip_keeps_part_info() {
        let msg = Message::fragment(7, 9, b"chunk".to_vec(), 2, 4);
        let frame = msg.to_frame().unwrap();
        let (header, payload) = verify_and_strip(&frame).unwrap();

        let received = Message::from_frame(7, 9, &header, payload).unwrap();
        assert_eq!(received, msg);
    }
}
