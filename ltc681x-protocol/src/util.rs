//! Bit field helpers for register bytes
//!
//! Fields are addressed by the position of their least significant bit
//! (`shift`) and their `width` in bits.

/// Mask covering the lowest `width` bits
pub const fn mask(width: u8) -> u8 {
    debug_assert!(width <= 8);
    if width >= 8 { 0xFF } else { (1 << width) - 1 }
}

/// Extract the `width` bit field at `shift` from `byte`
pub const fn field(byte: u8, shift: u8, width: u8) -> u8 {
    (byte >> shift) & mask(width)
}

/// Replace the `width` bit field at `shift` in `byte` with `value`
///
/// Bits of `value` above `width` are dropped, all other bits of `byte` are kept.
pub fn set_field(byte: &mut u8, shift: u8, width: u8, value: u8) {
    let mask = mask(width) << shift;
    *byte = (*byte & !mask) | ((value << shift) & mask);
}

/// Read a single bit
pub const fn flag(byte: u8, bit: u8) -> bool {
    field(byte, bit, 1) != 0
}

/// Set or clear a single bit
pub fn set_flag(byte: &mut u8, bit: u8, on: bool) {
    set_field(byte, bit, 1, on as u8);
}

/// Split a 12 bit value into its low byte and high nibble
pub const fn split_u12(value: u16) -> (u8, u8) {
    ((value & 0xFF) as u8, ((value >> 8) & 0x0F) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field() {
        assert_eq!(field(0b1011_0100, 2, 3), 0b101);
        assert_eq!(field(0xA5, 0, 8), 0xA5);
        assert_eq!(field(0xA5, 4, 4), 0xA);
    }
    #[test]
    fn test_set_field_keeps_other_bits() {
        let mut byte = 0b1111_1111;
        set_field(&mut byte, 3, 2, 0b00);
        assert_eq!(byte, 0b1110_0111);

        let mut byte = 0;
        set_field(&mut byte, 4, 4, 0xFA);
        assert_eq!(byte, 0xA0, "value bits beyond the field width leaked");
    }
    #[test]
    fn test_flags() {
        let mut byte = 0b0000_0100;
        assert!(flag(byte, 2));
        set_flag(&mut byte, 2, false);
        set_flag(&mut byte, 7, true);
        assert_eq!(byte, 0b1000_0000);
    }
    #[test]
    fn test_split_u12() {
        assert_eq!(split_u12(0x752), (0x52, 0x7));
        assert_eq!(split_u12(0xFFFF), (0xFF, 0xF));
    }
}
