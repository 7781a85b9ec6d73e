//! Frame construction and validation.
//!
//! Every radio frame starts with a fixed 4-byte header followed by the payload:
//!
//! ```text
//! [part:u8][parts_total:u8][reserved:u8 = 0][crc8:u8] || payload
//! ```
//!
//! The CRC-8 covers the whole frame with the CRC field set to zero.

use std::io::{self, Cursor, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use radiolink_core::{
    constants::FRAME_HEADER_SIZE,
    error::{ErrorKind, RadioError, Result},
};

use crate::crc::{crc8, digest};

/// Offset of the CRC field inside the header.
pub const CRC_OFFSET: usize = 3;

/// Header prepended to every frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct FrameHeader {
    /// 0-based index of this fragment.
    pub part: u8,
    /// Number of fragments the message was split into.
    pub parts_total: u8,
    /// Always zero on transmit, ignored on receive.
    pub reserved: u8,
    /// CRC-8 over the frame with this field zeroed.
    pub crc8: u8,
}

impl FrameHeader {
    /// Creates a header with a zeroed CRC field.
    pub fn new(part: u8, parts_total: u8) -> Self {
        Self { part, parts_total, reserved: 0, crc8: 0 }
    }

    /// Writes the header in wire order.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.part)?;
        writer.write_u8(self.parts_total)?;
        writer.write_u8(self.reserved)?;
        writer.write_u8(self.crc8)
    }

    /// Reads a header from the start of the cursor.
    pub fn read_from(cursor: &mut Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            part: cursor.read_u8()?,
            parts_total: cursor.read_u8()?,
            reserved: cursor.read_u8()?,
            crc8: cursor.read_u8()?,
        })
    }

    /// True when this header describes a part that a receiver can place.
    pub fn is_well_formed(&self) -> bool {
        self.parts_total > 0 && self.part < self.parts_total
    }
}

/// Builds a complete frame for `payload` with a valid CRC.
///
/// Fails with [`RadioError::AllocationFailure`] when the frame buffer cannot be allocated.
pub fn build_frame(payload: &[u8], part: u8, parts_total: u8) -> Result<Vec<u8>> {
    let mut frame = Vec::new();
    frame
        .try_reserve_exact(FRAME_HEADER_SIZE + payload.len())
        .map_err(|_| ErrorKind::Radio(RadioError::AllocationFailure))?;

    FrameHeader::new(part, parts_total).write_to(&mut frame)?;
    frame.extend_from_slice(payload);
    frame[CRC_OFFSET] = crc8(&frame);
    Ok(frame)
}

/// Validates a received frame and returns its header and payload.
///
/// Frames without at least one payload byte are rejected as too short. A CRC
/// mismatch yields [`RadioError::CrcMismatch`]. A header whose part index does not
/// fit its parts total is rejected as malformed.
pub fn verify_and_strip(frame: &[u8]) -> Result<(FrameHeader, &[u8])> {
    if frame.len() <= FRAME_HEADER_SIZE {
        return Err(ErrorKind::FrameTooShort { min: FRAME_HEADER_SIZE + 1, actual: frame.len() });
    }

    let header = FrameHeader::read_from(&mut Cursor::new(frame))?;

    let mut digest = digest();
    digest.update(&frame[..CRC_OFFSET]);
    digest.update(&[0x00]);
    digest.update(&frame[FRAME_HEADER_SIZE..]);
    let computed = digest.finalize();

    if computed != header.crc8 {
        tracing::debug!(
            "CRC-8 mismatch: expected {:#04x}, got {:#04x}",
            computed,
            header.crc8
        );
        return Err(ErrorKind::Radio(RadioError::CrcMismatch));
    }

    if !header.is_well_formed() {
        return Err(ErrorKind::MalformedHeader {
            part: header.part,
            parts_total: header.parts_total,
        });
    }

    Ok((header, &frame[FRAME_HEADER_SIZE..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_build_frame_layout() {
        let frame = build_frame(b"hello", 0, 3).unwrap();
        assert_eq!(frame.len(), FRAME_HEADER_SIZE + 5);
        assert_eq!(&frame[..3], &[0, 3, 0]);
        assert_eq!(frame[CRC_OFFSET], 0x08);
        assert_eq!(&frame[FRAME_HEADER_SIZE..], b"hello");
    }

    #[test]
    fn test_crc_covers_zeroed_crc_field() {
        let frame = build_frame(&[9, 8, 7], 1, 2).unwrap();
        let mut zeroed = frame.clone();
        zeroed[CRC_OFFSET] = 0;
        assert_eq!(crc8(&zeroed), frame[CRC_OFFSET]);
    }

    #[test]
    fn test_verify_and_strip_accepts_built_frame() {
        let frame = build_frame(b"payload", 2, 5).unwrap();
        let (header, payload) = verify_and_strip(&frame).unwrap();
        assert_eq!(header.part, 2);
        assert_eq!(header.parts_total, 5);
        assert_eq!(header.reserved, 0);
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn test_verify_rejects_corrupted_payload() {
        let mut frame = build_frame(b"payload", 0, 1).unwrap();
        frame[6] ^= 0x40;
        let err = verify_and_strip(&frame).unwrap_err();
        assert_eq!(err.radio_error(), Some(RadioError::CrcMismatch));
    }

    #[test]
    fn test_verify_rejects_header_only_frame() {
        let frame = build_frame(&[], 0, 1).unwrap();
        assert!(matches!(
            verify_and_strip(&frame),
            Err(ErrorKind::FrameTooShort { min: 5, actual: 4 })
        ));
        assert!(matches!(verify_and_strip(&[1, 2]), Err(ErrorKind::FrameTooShort { .. })));
    }

    #[test]
    fn test_verify_rejects_unplaceable_parts() {
        let frame = build_frame(b"x", 0, 0).unwrap();
        assert!(matches!(
            verify_and_strip(&frame),
            Err(ErrorKind::MalformedHeader { part: 0, parts_total: 0 })
        ));

        let frame = build_frame(b"x", 3, 3).unwrap();
        assert!(matches!(verify_and_strip(&frame), Err(ErrorKind::MalformedHeader { .. })));
    }

    #[test]
    fn test_reserved_byte_is_ignored_on_receive() {
        let mut frame = build_frame(b"abc", 0, 1).unwrap();
        frame[2] = 0x7F;
        frame[CRC_OFFSET] = 0;
        frame[CRC_OFFSET] = crc8(&frame);
        let (header, payload) = verify_and_strip(&frame).unwrap();
        assert_eq!(header.reserved, 0x7F);
        assert_eq!(payload, b"abc");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn single_bit_flip_is_always_detected(
            payload in proptest::collection::vec(any::<u8>(), 1..=57),
            part in 0u8..4,
            bit in any::<proptest::sample::Index>(),
        ) {
            let frame = build_frame(&payload, part, 4).unwrap();
            let bit = bit.index(frame.len() * 8);
            let mut corrupted = frame.clone();
            corrupted[bit / 8] ^= 1 << (bit % 8);

            let err = verify_and_strip(&corrupted).unwrap_err();
            prop_assert_eq!(err.radio_error(), Some(RadioError::CrcMismatch));
        }
    }
}
