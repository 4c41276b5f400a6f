// Delta decoder: record parsing and target reconstruction.
//
// Deltas are untrusted input. Every length and offset is checked against
// the remaining delta bytes, the source length and the declared target
// length before any byte is copied, and the output is only handed back
// once the terminator record has been reached and validated.
//
// `Records` is the single parser; `apply`, `analyze` and the CLI record
// listing all walk a delta through it.

use log::debug;

use super::checksum::checksum;
use super::format::{COPY_END, Record, TAG_CHECKSUM, TAG_COPY, TAG_LITERAL};
use super::varint::{self, VarIntError};

/// Output capacity reserved before the first record. Larger targets grow
/// as records arrive, so a forged length prefix cannot force a huge
/// allocation on its own.
const INITIAL_RESERVE: usize = 1 << 24;

// ---------------------------------------------------------------------------
// Decoder error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A varint could not be decoded.
    #[error("malformed integer: {0}")]
    MalformedInteger(#[from] VarIntError),
    /// Unknown record tag or a syntactic violation.
    #[error("malformed delta: {0}")]
    MalformedDelta(String),
    /// The delta ended before a record (or the terminator) was complete.
    #[error("truncated delta")]
    TruncatedDelta,
    /// A copy record reaches past the end of the source.
    #[error("copy of {len} bytes at offset {offset} exceeds source length {source_len}")]
    OutOfBoundsCopy {
        offset: u32,
        len: u32,
        source_len: usize,
    },
    /// Reconstructed length disagrees with the declared target length.
    #[error("size mismatch: declared {expected} bytes, delta produces {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    /// Terminator checksum disagrees with the reconstructed output.
    #[error("checksum mismatch: expected {expected:#010X}, got {actual:#010X}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    /// The output buffer could not be allocated.
    #[error("cannot allocate {requested} bytes for output")]
    AllocationFailure { requested: usize },
    /// The external compressor could not restore the delta bytes.
    #[error("decompression failed: {0}")]
    Decompression(String),
}

// ---------------------------------------------------------------------------
// Record iterator
// ---------------------------------------------------------------------------

/// Lazy parser over the records of a delta.
///
/// Yields each record in order and stops after the terminator. A syntax
/// error is yielded once, after which the iterator is exhausted. Bytes
/// after the terminator are reported as an error instead of the terminator.
pub struct Records<'a> {
    delta: &'a [u8],
    pos: usize,
    target_len: u32,
    done: bool,
}

impl<'a> Records<'a> {
    /// Read the target-length header and position at the first record.
    pub fn new(delta: &'a [u8]) -> Result<Self, DecodeError> {
        let (target_len, pos) = varint::read_u32(delta)?;
        Ok(Self {
            delta,
            pos,
            target_len,
            done: false,
        })
    }

    /// Declared length of the reconstructed target.
    pub fn target_len(&self) -> u32 {
        self.target_len
    }

    /// Offset of the next unread byte in the delta.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let rest = self.delta.get(self.pos..).unwrap_or_default();
        let (val, len) = varint::read_u32(rest)?;
        self.pos += len;
        Ok(val)
    }

    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let Some(&byte) = self.delta.get(self.pos) else {
            return Err(DecodeError::TruncatedDelta);
        };
        self.pos += 1;
        Ok(byte)
    }

    fn next_record(&mut self) -> Result<Record<'a>, DecodeError> {
        if self.pos >= self.delta.len() {
            return Err(DecodeError::TruncatedDelta);
        }
        let start = self.pos;
        let count = self.read_u32()?;

        match self.read_byte()? {
            TAG_COPY => {
                let offset = self.read_u32()?;
                match self.read_byte()? {
                    COPY_END => Ok(Record::Copy { len: count, offset }),
                    other => Err(DecodeError::MalformedDelta(format!(
                        "copy record at byte {start} closed by {other:#04x} instead of ','"
                    ))),
                }
            }
            TAG_LITERAL => {
                let end = self
                    .pos
                    .checked_add(count as usize)
                    .ok_or(DecodeError::TruncatedDelta)?;
                let bytes = self
                    .delta
                    .get(self.pos..end)
                    .ok_or(DecodeError::TruncatedDelta)?;
                self.pos = end;
                Ok(Record::Literal(bytes))
            }
            TAG_CHECKSUM => {
                let trailing = self.delta.len() - self.pos;
                if trailing != 0 {
                    return Err(DecodeError::MalformedDelta(format!(
                        "{trailing} bytes after terminator record"
                    )));
                }
                Ok(Record::Checksum(count))
            }
            other => Err(DecodeError::MalformedDelta(format!(
                "unknown record tag {other:#04x} at byte {}",
                self.pos - 1
            ))),
        }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let record = self.next_record();
        if matches!(record, Ok(Record::Checksum(_)) | Err(_)) {
            self.done = true;
        }
        Some(record)
    }
}

impl std::iter::FusedIterator for Records<'_> {}

// ---------------------------------------------------------------------------
// apply / output_size / analyze
// ---------------------------------------------------------------------------

/// Reconstruct the target from `source` and `delta`.
///
/// Returns exactly the declared number of bytes or an error; never a
/// partial buffer. With `verify_checksum` unset the terminator value is
/// still read but not compared.
pub fn apply(source: &[u8], delta: &[u8], verify_checksum: bool) -> Result<Vec<u8>, DecodeError> {
    let mut records = Records::new(delta)?;
    let limit = records.target_len() as usize;

    let mut output = Vec::new();
    reserve(&mut output, limit.min(INITIAL_RESERVE))?;

    for record in records.by_ref() {
        match record? {
            Record::Copy { len, offset } => {
                ensure_room(output.len(), len as usize, limit)?;
                if len == 0 {
                    debug!("zero-length copy at source offset {offset}, ignored");
                    continue;
                }
                let start = offset as usize;
                let bytes = start
                    .checked_add(len as usize)
                    .and_then(|end| source.get(start..end))
                    .ok_or(DecodeError::OutOfBoundsCopy {
                        offset,
                        len,
                        source_len: source.len(),
                    })?;
                reserve(&mut output, bytes.len())?;
                output.extend_from_slice(bytes);
            }
            Record::Literal(bytes) => {
                ensure_room(output.len(), bytes.len(), limit)?;
                reserve(&mut output, bytes.len())?;
                output.extend_from_slice(bytes);
            }
            Record::Checksum(expected) => {
                if output.len() != limit {
                    return Err(DecodeError::SizeMismatch {
                        expected: limit as u64,
                        actual: output.len() as u64,
                    });
                }
                if verify_checksum {
                    let actual = checksum(&output);
                    if actual != expected {
                        return Err(DecodeError::ChecksumMismatch { expected, actual });
                    }
                }
                return Ok(output);
            }
        }
    }

    Err(DecodeError::TruncatedDelta)
}

/// Declared target length, read from the delta header alone.
pub fn output_size(delta: &[u8]) -> Result<u32, DecodeError> {
    match varint::read_u32(delta) {
        Ok((len, _)) => Ok(len),
        Err(e) => {
            let msg = format!("unreadable target length: {e}");
            Err(DecodeError::MalformedDelta(msg))
        }
    }
}

/// Byte totals of a delta, gathered without a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaStats {
    /// Declared target length.
    pub target_len: u32,
    /// Sum of copy record lengths.
    pub bytes_copied: u64,
    /// Sum of literal record lengths.
    pub bytes_inserted: u64,
    /// Number of copy records.
    pub copy_records: u64,
    /// Number of literal records.
    pub literal_records: u64,
    /// Checksum carried by the terminator.
    pub checksum: u32,
}

/// Walk `delta` and total the copied and inserted bytes.
///
/// Rejects the same syntax errors as [`apply`]; sizes are not checked
/// against the declared target length.
pub fn analyze(delta: &[u8]) -> Result<DeltaStats, DecodeError> {
    let mut records = Records::new(delta)?;
    let mut stats = DeltaStats {
        target_len: records.target_len(),
        ..Default::default()
    };

    for record in records.by_ref() {
        match record? {
            Record::Copy { len, .. } => {
                stats.bytes_copied += u64::from(len);
                stats.copy_records += 1;
            }
            Record::Literal(bytes) => {
                stats.bytes_inserted += bytes.len() as u64;
                stats.literal_records += 1;
            }
            Record::Checksum(sum) => {
                stats.checksum = sum;
                return Ok(stats);
            }
        }
    }

    Err(DecodeError::TruncatedDelta)
}

#[inline]
fn ensure_room(produced: usize, len: usize, limit: usize) -> Result<(), DecodeError> {
    if len > limit - produced {
        return Err(DecodeError::SizeMismatch {
            expected: limit as u64,
            actual: produced as u64 + len as u64,
        });
    }
    Ok(())
}

#[inline]
fn reserve(output: &mut Vec<u8>, additional: usize) -> Result<(), DecodeError> {
    output
        .try_reserve(additional)
        .map_err(|_| DecodeError::AllocationFailure {
            requested: additional,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
