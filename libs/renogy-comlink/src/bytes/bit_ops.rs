//! Bit-level operations for status registers

/// Extract single bit from u8 value
#[inline]
pub fn extract_bit_u8(value: u8, bit_index: u8) -> bool {
    debug_assert!(bit_index < 8, "Bit index out of range: {}", bit_index);
    (value & (1 << bit_index)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bit_u8() {
        assert!(extract_bit_u8(0b1000_0000, 7));
        assert!(!extract_bit_u8(0b0111_1111, 7));
        assert!(extract_bit_u8(0b0000_0001, 0));
    }
}
