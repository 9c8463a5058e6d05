//! The VarInt encoding used for packet ids and length prefixes.
//!
//! Seven data bits per byte, least significant group first, high bit set
//! while more bytes follow. Any `i32` fits in at most five bytes.

use crate::Error;

/// Appends `value` to `buf` as a VarInt.
///
/// The encoding works on the two's-complement bit pattern, so negative
/// values (such as the `-1` handshake protocol-version sentinel) occupy the
/// full five bytes.
pub(crate) fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut raw = value as u32;
    loop {
        if raw & !0x7F == 0 {
            buf.push(raw as u8);
            return;
        }
        buf.push((raw as u8 & 0x7F) | 0x80);
        raw >>= 7;
    }
}

/// Reads a VarInt from `buf` starting at `offset`.
///
/// On success returns the value and the offset one past its final byte.
/// `Ok(None)` means the buffer ended before the terminating byte arrived;
/// the caller should retry once more data is available. A value that would
/// need a sixth byte is corrupt, not incomplete.
pub(crate) fn read_varint(buf: &[u8], offset: usize) -> Result<Option<(i32, usize)>, Error> {
    let mut value: u32 = 0;
    for size in 0..5 {
        let Some(&byte) = buf.get(offset + size) else {
            return Ok(None);
        };
        value |= u32::from(byte & 0x7F) << (7 * size);
        if byte & 0x80 == 0 {
            return Ok(Some((value as i32, offset + size + 1)));
        }
    }
    Err(Error::MalformedVarInt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(&mut buf, value);
        buf
    }

    #[test]
    fn round_trip() {
        for shift in 0..31 {
            for value in [(1 << shift) - 1, 1 << shift, (1 << shift) + 1] {
                let bytes = encode(value);
                assert_eq!(
                    read_varint(&bytes, 0).unwrap(),
                    Some((value, bytes.len())),
                    "value {value}"
                );
            }
        }
        let bytes = encode(i32::MAX);
        assert_eq!(read_varint(&bytes, 0).unwrap(), Some((i32::MAX, 5)));
    }

    #[test]
    fn minimal_lengths() {
        assert_eq!(encode(0).len(), 1);
        assert_eq!(encode(127).len(), 1);
        assert_eq!(encode(128).len(), 2);
        assert_eq!(encode(16383).len(), 2);
        assert_eq!(encode(16384).len(), 3);
        assert_eq!(encode(1 << 28).len(), 5);
    }

    #[test]
    fn negative_sentinel_takes_five_bytes() {
        let bytes = encode(-1);
        assert_eq!(bytes, [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(read_varint(&bytes, 0).unwrap(), Some((-1, 5)));
    }

    #[test]
    fn truncated_input_is_not_an_error() {
        let bytes = encode(1 << 28);
        for cut in 0..bytes.len() {
            assert_eq!(read_varint(&bytes[..cut], 0).unwrap(), None);
        }
    }

    #[test]
    fn offset_is_respected() {
        let mut bytes = vec![0xAA, 0xBB];
        write_varint(&mut bytes, 300);
        assert_eq!(read_varint(&bytes, 2).unwrap(), Some((300, 4)));
    }

    #[test]
    fn six_byte_varint_is_rejected() {
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            read_varint(&bytes, 0),
            Err(Error::MalformedVarInt)
        ));
    }
}
