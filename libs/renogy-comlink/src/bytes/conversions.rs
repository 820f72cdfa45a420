//! Numeric conversions between register words and frame bytes
//!
//! Registers travel big-endian (high byte first) on the wire, so every
//! multi-byte read here is big-endian.

// ============================================================================
// Registers to Bytes
// ============================================================================

/// Serialize register words to big-endian bytes
pub fn words_to_be_bytes(words: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 2);
    for word in words {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    bytes
}

/// Parse big-endian bytes back into register words (trailing odd byte ignored)
pub fn be_bytes_to_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

// ============================================================================
// Bounds-checked reads
// ============================================================================

/// Read one unsigned byte
#[inline]
pub fn u8_at(bytes: &[u8], offset: usize) -> Option<u8> {
    bytes.get(offset).copied()
}

/// Read one byte as two's complement signed value
#[inline]
pub fn i8_at(bytes: &[u8], offset: usize) -> Option<i8> {
    bytes.get(offset).map(|b| *b as i8)
}

/// Read a big-endian u16
#[inline]
pub fn u16_at(bytes: &[u8], offset: usize) -> Option<u16> {
    let slice = bytes.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes([slice[0], slice[1]]))
}

/// Read a big-endian u32
#[inline]
pub fn u32_at(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Read `len` bytes as ASCII text, trimming NUL padding and whitespace
pub fn ascii_at(bytes: &[u8], offset: usize, len: usize) -> Option<String> {
    let slice = bytes.get(offset..offset.checked_add(len)?)?;
    let text: String = slice
        .iter()
        .filter(|b| b.is_ascii() && **b != 0)
        .map(|b| *b as char)
        .collect();
    Some(text.trim().to_string())
}
