// Delta engine: the public create / apply / output_size / analyze boundary.
//
// Ties the match engine (hash module) to the record writer and decoder
// (delta module), with optional compression of the finished delta
// (compress module) and batch helpers on top.

use std::borrow::Cow;
use std::io;

use log::debug;

use crate::compress::{self, Compression};
use crate::delta::checksum::checksum;
use crate::delta::decoder::{self, DecodeError, DeltaStats};
use crate::delta::format::{DeltaWriter, Instruction, MAX_FRAMING};
use crate::hash::config::{ConfigError, DEFAULT_SEARCH_LIMIT, DEFAULT_WINDOW_SIZE, MatcherConfig};
use crate::hash::matching::MatchEngine;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration shared by encoding and decoding.
#[derive(Debug, Clone)]
pub struct DeltaOptions {
    /// Hash window and source block width. Power of two. Default: 16.
    pub window_size: usize,
    /// Index candidates examined per target position. Default: 64.
    pub search_depth: usize,
    /// Compressor applied to finished deltas. Default: none.
    pub compression: Compression,
    /// Compare the terminator checksum after applying. Default: true.
    pub verify_checksum: bool,
}

impl Default for DeltaOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            search_depth: DEFAULT_SEARCH_LIMIT,
            compression: Compression::None,
            verify_checksum: true,
        }
    }
}

impl DeltaOptions {
    /// Whether deltas are compressed after creation.
    pub fn compressed(&self) -> bool {
        self.compression.is_enabled()
    }

    /// Validated matcher settings.
    pub fn matcher_config(&self) -> Result<MatcherConfig, ConfigError> {
        MatcherConfig::new(self.window_size, self.search_depth)
    }

    /// Check the options without encoding anything.
    pub fn validate(&self) -> Result<(), EncodeError> {
        self.matcher_config()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("{what} is {len} bytes; at most 4294967295 bytes are supported")]
    InputTooLarge { what: &'static str, len: usize },
    #[error("cannot allocate {requested} bytes")]
    AllocationFailure { requested: usize },
    #[error("compression failed: {0}")]
    Compression(#[from] io::Error),
}

fn check_len(what: &'static str, data: &[u8]) -> Result<u32, EncodeError> {
    u32::try_from(data.len()).map_err(|_| EncodeError::InputTooLarge {
        what,
        len: data.len(),
    })
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Create a delta that turns `source` into `target`.
///
/// Deterministic: equal inputs and options give byte-identical deltas.
pub fn create(
    source: &[u8],
    target: &[u8],
    options: &DeltaOptions,
) -> Result<Vec<u8>, EncodeError> {
    let engine = build_engine(source, options)?;
    let delta = encode_with(&engine, target)?;
    Ok(compress::compress_delta(delta, &options.compression)?)
}

fn build_engine<'s>(
    source: &'s [u8],
    options: &DeltaOptions,
) -> Result<MatchEngine<'s>, EncodeError> {
    let config = options.matcher_config()?;
    check_len("source", source)?;
    let engine = MatchEngine::new(config, source).map_err(|_| EncodeError::AllocationFailure {
        requested: (source.len() / config.window_size) * 2 * size_of::<u32>(),
    })?;
    debug!(
        "indexed {} source bytes (window {}, depth {})",
        source.len(),
        config.window_size,
        config.search_limit
    );
    Ok(engine)
}

/// Encode one target against an already indexed source.
fn encode_with(engine: &MatchEngine<'_>, target: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let target_len = check_len("target", target)?;
    let instructions = engine.find_matches(target);

    let mut writer = DeltaWriter::new(target_len).map_err(|_| EncodeError::AllocationFailure {
        requested: target.len() + MAX_FRAMING,
    })?;

    let mut pos = 0usize;
    let mut copied = 0u64;
    for inst in &instructions {
        match *inst {
            Instruction::Literal { len } => {
                let end = pos + len as usize;
                writer.literal(&target[pos..end]);
                pos = end;
            }
            Instruction::Copy { len, offset } => {
                writer.copy(len, offset);
                pos += len as usize;
                copied += u64::from(len);
            }
        }
    }
    debug_assert_eq!(pos, target.len());

    let delta = writer.finish(checksum(target));
    debug!(
        "created delta: target {} bytes, {} records, {} copied, delta {} bytes",
        target.len(),
        instructions.len(),
        copied,
        delta.len()
    );
    Ok(delta)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Reconstruct the target from `source` and `delta`.
///
/// Fails without partial output on any malformed, truncated or
/// inconsistent delta.
pub fn apply(
    source: &[u8],
    delta: &[u8],
    options: &DeltaOptions,
) -> Result<Vec<u8>, DecodeError> {
    let delta = compress::decompress_delta(delta, &options.compression)?;
    let output = decoder::apply(source, &delta, options.verify_checksum)?;
    debug!(
        "applied delta of {} bytes: {} -> {} bytes",
        delta.len(),
        source.len(),
        output.len()
    );
    Ok(output)
}

/// Declared target length of an uncompressed delta.
pub fn output_size(delta: &[u8]) -> Result<u32, DecodeError> {
    decoder::output_size(delta)
}

/// Copied and inserted byte totals of an uncompressed delta.
pub fn analyze(delta: &[u8]) -> Result<DeltaStats, DecodeError> {
    decoder::analyze(delta)
}

// ---------------------------------------------------------------------------
// Batch helpers
// ---------------------------------------------------------------------------

/// Apply `deltas` in order, each to the previous result.
///
/// Stops at the first failure. An empty batch returns a copy of `source`.
pub fn apply_batch<D: AsRef<[u8]>>(
    source: &[u8],
    deltas: &[D],
    options: &DeltaOptions,
) -> Result<Vec<u8>, DecodeError> {
    let mut current: Cow<'_, [u8]> = Cow::Borrowed(source);
    for (i, delta) in deltas.iter().enumerate() {
        match apply(&current, delta.as_ref(), options) {
            Ok(next) => current = Cow::Owned(next),
            Err(e) => {
                debug!("batch stopped at delta {i} of {}: {e}", deltas.len());
                return Err(e);
            }
        }
    }
    Ok(current.into_owned())
}

/// Create one delta per target against a shared `source`.
///
/// The source is indexed once. With the `parallel` feature, targets are
/// encoded on the rayon pool; results keep the input order either way.
pub fn create_each<T: AsRef<[u8]> + Sync>(
    source: &[u8],
    targets: &[T],
    options: &DeltaOptions,
) -> Result<Vec<Vec<u8>>, EncodeError> {
    let engine = build_engine(source, options)?;
    let encode_one = |target: &T| -> Result<Vec<u8>, EncodeError> {
        let delta = encode_with(&engine, target.as_ref())?;
        Ok(compress::compress_delta(delta, &options.compression)?)
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        targets.par_iter().map(encode_one).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        targets.iter().map(encode_one).collect()
    }
}

/// Apply each delta independently to the same `source`.
///
/// Unlike [`apply_batch`] the deltas are not chained. The first error in
/// input order is returned.
pub fn apply_each<D: AsRef<[u8]> + Sync>(
    source: &[u8],
    deltas: &[D],
    options: &DeltaOptions,
) -> Result<Vec<Vec<u8>>, DecodeError> {
    let apply_one = |delta: &D| apply(source, delta.as_ref(), options);

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        deltas.par_iter().map(apply_one).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        deltas.iter().map(apply_one).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
