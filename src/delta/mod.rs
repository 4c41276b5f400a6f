// Delta wire format: compact integers, records, checksum and decoder.
//
// - `varint`   - self-describing compact integers
// - `checksum` - big-endian additive checksum over the target
// - `format`   - record tags, encoder instructions, record writer
// - `decoder`  - record parser, apply / output_size / analyze

pub mod checksum;
pub mod decoder;
pub mod format;
pub mod varint;

pub use decoder::{DecodeError, DeltaStats, Records};
pub use format::{Instruction, Record};
