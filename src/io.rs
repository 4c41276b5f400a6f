// File-level helpers for creating and applying deltas.
//
// Deltas are whole-buffer transforms, so inputs are read fully into memory
// and the result is written through a `BufWriter`. With the `file-io`
// feature a SHA-256 digest of the produced target is reported as well.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::delta::DecodeError;
use crate::engine::{self, DeltaOptions, EncodeError};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by [`create_file`] / [`create_stream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStats {
    pub source_size: u64,
    pub target_size: u64,
    /// Delta size as written, after compression if enabled.
    pub delta_size: u64,
    /// SHA-256 of the target (with the `file-io` feature).
    pub target_sha256: Option<[u8; 32]>,
}

/// Statistics returned by [`apply_file`] / [`apply_stream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyStats {
    pub source_size: u64,
    pub delta_size: u64,
    pub output_size: u64,
    /// SHA-256 of the reconstructed output (with the `file-io` feature).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Create a delta from `source` to the bytes read from `target`, writing it
/// to `delta_out`.
pub fn create_stream<R: Read, W: Write>(
    source: &[u8],
    mut target: R,
    delta_out: W,
    options: &DeltaOptions,
) -> Result<CreateStats, IoError> {
    let mut target_buf = Vec::new();
    target.read_to_end(&mut target_buf)?;

    let delta = engine::create(source, &target_buf, options)?;
    write_all_buffered(delta_out, &delta)?;

    Ok(CreateStats {
        source_size: source.len() as u64,
        target_size: target_buf.len() as u64,
        delta_size: delta.len() as u64,
        target_sha256: sha256(&target_buf),
    })
}

/// Create a delta between two files, writing it to `delta_path`.
///
/// The delta file is only created after encoding has succeeded.
pub fn create_file(
    source_path: &Path,
    target_path: &Path,
    delta_path: &Path,
    options: &DeltaOptions,
) -> Result<CreateStats, IoError> {
    let source = std::fs::read(source_path)?;
    let target = std::fs::read(target_path)?;

    let delta = engine::create(&source, &target, options)?;
    write_all_buffered(File::create(delta_path)?, &delta)?;

    Ok(CreateStats {
        source_size: source.len() as u64,
        target_size: target.len() as u64,
        delta_size: delta.len() as u64,
        target_sha256: sha256(&target),
    })
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Apply the delta read from `delta` to `source`, writing the result to `out`.
///
/// Nothing is written unless the whole delta applies cleanly.
pub fn apply_stream<R: Read, W: Write>(
    source: &[u8],
    mut delta: R,
    out: W,
    options: &DeltaOptions,
) -> Result<ApplyStats, IoError> {
    let mut delta_buf = Vec::new();
    delta.read_to_end(&mut delta_buf)?;

    let output = engine::apply(source, &delta_buf, options)?;
    write_all_buffered(out, &output)?;

    Ok(ApplyStats {
        source_size: source.len() as u64,
        delta_size: delta_buf.len() as u64,
        output_size: output.len() as u64,
        output_sha256: sha256(&output),
    })
}

/// Apply a delta file to a source file, writing the result to `output_path`.
///
/// The output file is only created after the delta has applied.
pub fn apply_file(
    source_path: &Path,
    delta_path: &Path,
    output_path: &Path,
    options: &DeltaOptions,
) -> Result<ApplyStats, IoError> {
    let source = std::fs::read(source_path)?;
    let delta = std::fs::read(delta_path)?;

    let output = engine::apply(&source, &delta, options)?;
    write_all_buffered(File::create(output_path)?, &output)?;

    Ok(ApplyStats {
        source_size: source.len() as u64,
        delta_size: delta.len() as u64,
        output_size: output.len() as u64,
        output_sha256: sha256(&output),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_all_buffered<W: Write>(out: W, data: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::with_capacity(BUF_SIZE, out);
    writer.write_all(data)?;
    writer.flush()
}

/// SHA-256 of `data`, or `None` without the `file-io` feature.
#[cfg(feature = "file-io")]
pub fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

/// SHA-256 of `data`, or `None` without the `file-io` feature.
#[cfg(not(feature = "file-io"))]
pub fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
