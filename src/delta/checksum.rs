// 32-bit additive checksum carried by the terminator record.
//
// The buffer is summed as big-endian u32 words (wrapping); a trailing
// partial word is zero-padded on the right. The result does not depend on
// host byte order.

/// Checksum of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    let mut words = data.chunks_exact(4);
    let mut sum = 0u32;
    for w in words.by_ref() {
        sum = sum.wrapping_add(u32::from_be_bytes([w[0], w[1], w[2], w[3]]));
    }

    let tail = words.remainder();
    if !tail.is_empty() {
        let mut padded = [0u8; 4];
        padded[..tail.len()].copy_from_slice(tail);
        sum = sum.wrapping_add(u32::from_be_bytes(padded));
    }
    sum
}
