//! Packet error code (PEC)
//!
//! Every command and every 6 byte data group on the bus is followed by a
//! 15 bit CRC, transmitted as 16 bits (the remainder shifted left by one)
//! with the high byte first.

use crc::{Algorithm, Crc, Digest};

/// CRC-15 as used by the LTC681x family
///
/// Polynomial `x^15 + x^14 + x^10 + x^8 + x^7 + x^4 + x^3 + 1`,
/// seeded with `0b000_0000_0001_0000`, MSB first.
const PEC15_ALGORITHM: Algorithm<u16> = Algorithm {
    width: 15,
    poly: 0x4599,
    init: 0x0010,
    refin: false,
    refout: false,
    xorout: 0x0000,
    check: 0x535F,
    residue: 0x0000,
};

static PEC15: Crc<u16> = Crc::<u16>::new(&PEC15_ALGORITHM);

/// Calculates the PEC over `data`
///
/// ## Example
/// The read configuration register group A command `RDCFGA` (`0x0002`)
/// is sent as `00 02 2B 0A`.
pub fn calculate_pec(data: &[u8]) -> u16 {
    PEC15.checksum(data) << 1
}

/// PEC that can be updated multiple times before finalizing
pub struct Pec15 {
    digest: Digest<'static, u16>,
}
impl Pec15 {
    /// Create a new [Pec15] in its seeded state
    pub fn new() -> Self {
        Self {
            digest: PEC15.digest(),
        }
    }
    /// Update the PEC with new data
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }
    /// Finalize the PEC
    pub fn finalize(self) -> u16 {
        self.digest.finalize() << 1
    }
}
impl Default for Pec15 {
    fn default() -> Self {
        Self::new()
    }
}
