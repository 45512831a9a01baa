//! Conversion between host strings and the guest's in-memory string layout.
//!
//! Guest strings are little-endian UTF-16 code units terminated by a zero
//! unit. Decoding never reads past the slice it is given: an unterminated
//! string simply ends at the end of the buffer.

/// How guest strings are turned back into host text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StringDecoding {
    /// Keep only ASCII code units (`0x01..=0x7F`); everything else is dropped.
    #[default]
    Ascii,
    /// Full UTF-16, surrogate pairs included. Unpaired surrogates become U+FFFD.
    Utf16,
}

/// Decode the guest string starting at `offset`, keeping ASCII only.
///
/// Code units outside the ASCII range are skipped rather than decoded, so
/// `"café"` comes back as `"caf"`.
pub fn decode_string(memory: &[u8], offset: usize) -> String {
    code_units(memory, offset)
        .filter(|unit| (0x01..=0x7F).contains(unit))
        .map(|unit| char::from(unit as u8))
        .collect()
}

/// Decode the guest string starting at `offset` as real UTF-16.
pub fn decode_string_utf16(memory: &[u8], offset: usize) -> String {
    char::decode_utf16(code_units(memory, offset))
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

pub fn decode_with(decoding: StringDecoding, memory: &[u8], offset: usize) -> String {
    match decoding {
        StringDecoding::Ascii => decode_string(memory, offset),
        StringDecoding::Utf16 => decode_string_utf16(memory, offset),
    }
}

/// Encode host text as UTF-16 code units. No terminator is appended.
pub fn encode_string(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Number of bytes `units` occupy in guest memory.
pub fn encoded_byte_len(units: &[u16]) -> usize {
    units.len() * 2
}

/// Serialize `units` little-endian into the front of `dst`.
///
/// `dst` must hold at least `encoded_byte_len(units)` bytes.
pub fn write_units(dst: &mut [u8], units: &[u16]) {
    debug_assert!(dst.len() >= encoded_byte_len(units));
    for (slot, unit) in dst.chunks_exact_mut(2).zip(units) {
        slot.copy_from_slice(&unit.to_le_bytes());
    }
}

/// Code units from `offset` up to (not including) the first zero unit or
/// the last complete pair in the buffer.
fn code_units(memory: &[u8], offset: usize) -> impl Iterator<Item = u16> + '_ {
    memory
        .get(offset..)
        .unwrap_or_default()
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
}
