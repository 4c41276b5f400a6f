// Compact variable-length unsigned integers.
//
// The first byte selects the width:
//   0x00..=0xFC  the value itself (1 byte)
//   0xFD         u16 little-endian follows (3 bytes)
//   0xFE         u32 little-endian follows (5 bytes)
//   0xFF         u64 little-endian follows (9 bytes)
//
// Every count, offset, length and checksum in a delta uses this encoding.

/// Largest value stored directly in the prefix byte.
const MAX_INLINE: u64 = 0xFC;

const PREFIX_U16: u8 = 0xFD;
const PREFIX_U32: u8 = 0xFE;
const PREFIX_U64: u8 = 0xFF;

/// Maximum encoded length (prefix + u64).
pub const MAX_VARINT_LEN: usize = 9;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `num` into `buf`, returning the number of bytes written (1, 3, 5 or 9).
#[inline]
pub fn encode_u64(num: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    if num <= MAX_INLINE {
        buf[0] = num as u8;
        1
    } else if num <= u64::from(u16::MAX) {
        buf[0] = PREFIX_U16;
        buf[1..3].copy_from_slice(&(num as u16).to_le_bytes());
        3
    } else if num <= u64::from(u32::MAX) {
        buf[0] = PREFIX_U32;
        buf[1..5].copy_from_slice(&(num as u32).to_le_bytes());
        5
    } else {
        buf[0] = PREFIX_U64;
        buf[1..9].copy_from_slice(&num.to_le_bytes());
        9
    }
}

/// Append the encoding of `num` to `out`.
#[inline]
pub fn write_u64(out: &mut Vec<u8>, num: u64) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u64(num, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

/// Append the encoding of `num` to `out`.
#[inline]
pub fn write_u32(out: &mut Vec<u8>, num: u32) {
    write_u64(out, u64::from(num));
}

/// Encoded byte-length of `num`.
///
/// Monotonic: a smaller value never needs more bytes than a larger one.
#[inline]
pub fn encoded_len(num: u64) -> usize {
    if num <= MAX_INLINE {
        1
    } else if num <= u64::from(u16::MAX) {
        3
    } else if num <= u64::from(u32::MAX) {
        5
    } else {
        9
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a value from the front of `data`.
///
/// Returns `(value, bytes_consumed)`. Over-long encodings (e.g. a small
/// value behind a `0xFE` prefix) are accepted.
pub fn read_u64(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let (&first, rest) = data.split_first().ok_or(VarIntError::Truncated)?;
    match first {
        PREFIX_U16 => {
            let bytes: [u8; 2] = take(rest)?;
            Ok((u64::from(u16::from_le_bytes(bytes)), 3))
        }
        PREFIX_U32 => {
            let bytes: [u8; 4] = take(rest)?;
            Ok((u64::from(u32::from_le_bytes(bytes)), 5))
        }
        PREFIX_U64 => {
            let bytes: [u8; 8] = take(rest)?;
            Ok((u64::from_le_bytes(bytes), 9))
        }
        small => Ok((u64::from(small), 1)),
    }
}

/// Decode a value that must fit in 32 bits.
pub fn read_u32(data: &[u8]) -> Result<(u32, usize), VarIntError> {
    let (val, len) = read_u64(data)?;
    let val = u32::try_from(val).map_err(|_| VarIntError::Overflow)?;
    Ok((val, len))
}

#[inline]
fn take<const N: usize>(data: &[u8]) -> Result<[u8; N], VarIntError> {
    data.get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or(VarIntError::Truncated)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VarIntError {
    /// The buffer ended in the middle of a value.
    #[error("varint truncated")]
    Truncated,
    /// The value does not fit the field it was read for.
    #[error("varint overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
