//! CRC-8 checksum utilities for frame integrity verification.
//!
//! The checksum is a plain MSB-first CRC-8 with polynomial 0x31, seed 0xFF, no
//! reflection and no final xor (catalogued as CRC-8/NRSC-5). Peers compare it
//! byte for byte, so the parameters are fixed.

use crc::{Algorithm, Crc, Digest};
use radiolink_core::constants::{CRC8_INIT, CRC8_POLY};

/// CRC model protecting radiolink frames.
pub const FRAME_CRC8: Algorithm<u8> = Algorithm {
    width: 8,
    poly: CRC8_POLY,
    init: CRC8_INIT,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xF7,
    residue: 0x00,
};

static CRC8: Crc<u8> = Crc::<u8>::new(&FRAME_CRC8);

/// Computes the CRC-8 of `data`.
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

/// Starts an incremental CRC-8 computation.
pub fn digest() -> Digest<'static, u8> {
    CRC8.digest()
}
