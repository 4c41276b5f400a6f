// Delta wire format.
//
//   delta          := varint(target_len) record* checksum_record
//   literal_record := varint(n) ':' byte{n}
//   copy_record    := varint(n) '@' varint(offset) ','
//   checksum_record:= varint(checksum) ';'
//
// All integers use the compact varint encoding from `varint`.

use std::collections::TryReserveError;

use super::varint;

/// Tag following the count of a copy record.
pub const TAG_COPY: u8 = b'@';
/// Tag following the count of a literal record.
pub const TAG_LITERAL: u8 = b':';
/// Tag following the checksum of the terminator record.
pub const TAG_CHECKSUM: u8 = b';';
/// Delimiter closing a copy record.
pub const COPY_END: u8 = b',';

/// Delimiter bytes a literal-then-copy pair costs on top of its integers.
pub const COPY_DELIMITERS: usize = 3;

/// Worst-case bytes a delta adds on top of the target length: the header,
/// one literal header and the terminator, each with a 5-byte integer.
pub const MAX_FRAMING: usize = 5 + (5 + 1) + (5 + 1);

// ---------------------------------------------------------------------------
// Instructions (encoder side)
// ---------------------------------------------------------------------------

/// One step of a delta, as produced by the match engine.
///
/// Literal data is not carried; it is the next `len` bytes of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Insert the next `len` target bytes verbatim.
    Literal { len: u32 },
    /// Copy `len` bytes of the source starting at `offset`.
    Copy { len: u32, offset: u32 },
}

impl Instruction {
    /// Number of target bytes this instruction produces.
    pub fn target_len(&self) -> u32 {
        match *self {
            Self::Literal { len } | Self::Copy { len, .. } => len,
        }
    }
}

// ---------------------------------------------------------------------------
// Records (decoder side)
// ---------------------------------------------------------------------------

/// A parsed record borrowed from a delta buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    /// Literal bytes to append to the output.
    Literal(&'a [u8]),
    /// Source range to append to the output.
    Copy { len: u32, offset: u32 },
    /// Terminator carrying the checksum of the whole output.
    Checksum(u32),
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Appends records to a delta buffer, left to right.
pub struct DeltaWriter {
    out: Vec<u8>,
}

impl DeltaWriter {
    /// Start a delta for a target of `target_len` bytes.
    ///
    /// The buffer is reserved up front for the worst case so record emission
    /// never reallocates.
    pub fn new(target_len: u32) -> Result<Self, TryReserveError> {
        let mut out = Vec::new();
        out.try_reserve_exact(target_len as usize + MAX_FRAMING)?;
        varint::write_u32(&mut out, target_len);
        Ok(Self { out })
    }

    /// Emit a literal record.
    pub fn literal(&mut self, bytes: &[u8]) {
        varint::write_u64(&mut self.out, bytes.len() as u64);
        self.out.push(TAG_LITERAL);
        self.out.extend_from_slice(bytes);
    }

    /// Emit a copy record.
    pub fn copy(&mut self, len: u32, offset: u32) {
        varint::write_u32(&mut self.out, len);
        self.out.push(TAG_COPY);
        varint::write_u32(&mut self.out, offset);
        self.out.push(COPY_END);
    }

    /// Emit the terminator and return the finished delta.
    pub fn finish(mut self, checksum: u32) -> Vec<u8> {
        varint::write_u32(&mut self.out, checksum);
        self.out.push(TAG_CHECKSUM);
        self.out
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.out.len()
    }

    /// Whether nothing has been written (never true after `new`).
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }
}
