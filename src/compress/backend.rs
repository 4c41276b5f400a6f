// Compressor backends for finished deltas.
//
// A delta is a plain byte string; when compression is requested the whole
// stream is passed through one of these after encoding and restored before
// decoding. The codec itself never sees compressed bytes.

use std::io;

use crate::delta::DecodeError;
use crate::delta::format::MAX_FRAMING;

/// A general-purpose compressor applied to whole deltas.
///
/// # Implementing a custom backend
///
/// ```no_run
/// use fossil_delta::compress::CompressBackend;
/// use fossil_delta::delta::DecodeError;
///
/// struct Identity;
///
/// impl CompressBackend for Identity {
///     fn name(&self) -> &str { "identity" }
///     fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
///         Ok(data.to_vec())
///     }
///     fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
///         Ok(data.to_vec())
///     }
/// }
/// ```
pub trait CompressBackend: Send + Sync {
    /// Short name used in logs and CLI output.
    fn name(&self) -> &str;

    /// Compress a complete delta.
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Reverse `compress`. Failures are reported as `DecodeError::Decompression`.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError>;
}

/// Largest decompressed delta the built-in backends accept by default:
/// a target of `u32::MAX` bytes stored as literals, plus record framing.
pub const DEFAULT_DECOMPRESS_LIMIT: u64 = u32::MAX as u64 + MAX_FRAMING as u64;

#[cfg(any(feature = "zlib", feature = "lzma"))]
fn limit_exceeded(codec: &str, limit: u64) -> DecodeError {
    DecodeError::Decompression(format!("{codec}: output exceeds {limit} bytes"))
}

// ---------------------------------------------------------------------------
// Zlib backend
// ---------------------------------------------------------------------------

/// Zlib (deflate with header and Adler-32 trailer).
#[cfg(feature = "zlib")]
#[derive(Debug, Clone, Copy)]
pub struct ZlibBackend {
    level: flate2::Compression,
    limit: u64,
}

#[cfg(feature = "zlib")]
impl ZlibBackend {
    /// Create a backend with the given level (0-9, clamped).
    pub fn new(level: u32) -> Self {
        Self::with_limit(level, DEFAULT_DECOMPRESS_LIMIT)
    }

    /// Like [`ZlibBackend::new`], rejecting decompressed output over `limit`
    /// bytes.
    pub fn with_limit(level: u32, limit: u64) -> Self {
        Self {
            level: flate2::Compression::new(level.min(9)),
            limit,
        }
    }
}

#[cfg(feature = "zlib")]
impl Default for ZlibBackend {
    fn default() -> Self {
        Self::new(6)
    }
}

#[cfg(feature = "zlib")]
impl CompressBackend for ZlibBackend {
    fn name(&self) -> &str {
        "zlib"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        use flate2::write::ZlibEncoder;
        use io::Write;

        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        use flate2::read::ZlibDecoder;
        use io::Read;

        // One byte past the limit is enough to tell an oversized stream.
        let mut output = Vec::new();
        ZlibDecoder::new(data)
            .take(self.limit.saturating_add(1))
            .read_to_end(&mut output)
            .map_err(|e| DecodeError::Decompression(format!("zlib: {e}")))?;
        if output.len() as u64 > self.limit {
            return Err(limit_exceeded("zlib", self.limit));
        }
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// LZMA backend
// ---------------------------------------------------------------------------

/// LZMA ("alone" format) via the pure-Rust `lzma-rs`.
#[cfg(feature = "lzma")]
#[derive(Debug, Clone, Copy)]
pub struct LzmaBackend {
    limit: u64,
}

#[cfg(feature = "lzma")]
impl LzmaBackend {
    /// Create a backend with the default output limit.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_DECOMPRESS_LIMIT)
    }

    /// Create a backend rejecting decompressed output over `limit` bytes.
    pub fn with_limit(limit: u64) -> Self {
        Self { limit }
    }
}

#[cfg(feature = "lzma")]
impl Default for LzmaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "lzma")]
impl CompressBackend for LzmaBackend {
    fn name(&self) -> &str {
        "lzma"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut input = io::Cursor::new(data);
        let mut output = Vec::new();
        lzma_rs::lzma_compress(&mut input, &mut output)?;
        Ok(output)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        // The dictionary buffer fills before anything reaches `output`, so
        // it is capped as well.
        let options = lzma_rs::decompress::Options {
            memlimit: Some(usize::try_from(self.limit).unwrap_or(usize::MAX)),
            ..Default::default()
        };
        let mut input = data;
        let mut output = LimitedWriter::new(self.limit);
        let result = lzma_rs::lzma_decompress_with_options(&mut input, &mut output, &options);
        if output.exceeded {
            return Err(limit_exceeded("lzma", self.limit));
        }
        result.map_err(|e| DecodeError::Decompression(format!("lzma: {e}")))?;
        Ok(output.buf)
    }
}

/// In-memory sink that refuses to grow past `limit` bytes.
#[cfg(feature = "lzma")]
struct LimitedWriter {
    buf: Vec<u8>,
    limit: u64,
    exceeded: bool,
}

#[cfg(feature = "lzma")]
impl LimitedWriter {
    fn new(limit: u64) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            exceeded: false,
        }
    }
}

#[cfg(feature = "lzma")]
impl io::Write for LimitedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if (self.buf.len() + data.len()) as u64 > self.limit {
            self.exceeded = true;
            return Err(io::Error::other("decompressed output over limit"));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        b"2c:copy me please;"
            .iter()
            .copied()
            .cycle()
            .take(2048)
            .collect()
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn zlib_roundtrip() {
        let backend = ZlibBackend::default();
        let data = sample();
        let packed = backend.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(backend.decompress(&packed).unwrap(), data);
        assert_eq!(backend.name(), "zlib");
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn zlib_rejects_garbage() {
        let backend = ZlibBackend::new(9);
        let err = backend.decompress(b"not zlib at all").unwrap_err();
        assert!(matches!(err, DecodeError::Decompression(_)));
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn zlib_output_is_capped() {
        let zeros = vec![0u8; 1 << 20];
        let packed = ZlibBackend::new(9).compress(&zeros).unwrap();
        assert!(packed.len() < 4096);

        let err = ZlibBackend::with_limit(9, 64 * 1024)
            .decompress(&packed)
            .unwrap_err();
        let DecodeError::Decompression(msg) = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(msg.contains("exceeds 65536 bytes"), "{msg}");

        let exact = ZlibBackend::with_limit(9, 1 << 20);
        assert_eq!(exact.decompress(&packed).unwrap().len(), 1 << 20);
    }

    #[cfg(feature = "lzma")]
    #[test]
    fn lzma_roundtrip() {
        let backend = LzmaBackend::default();
        let data = sample();
        let packed = backend.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(backend.decompress(&packed).unwrap(), data);
    }

    #[cfg(feature = "lzma")]
    #[test]
    fn lzma_rejects_garbage() {
        let err = LzmaBackend::new().decompress(&[0xFF; 4]).unwrap_err();
        assert!(matches!(err, DecodeError::Decompression(_)));
    }

    #[cfg(feature = "lzma")]
    #[test]
    fn lzma_output_is_capped() {
        let zeros = vec![0u8; 1 << 20];
        let packed = LzmaBackend::new().compress(&zeros).unwrap();
        assert!(packed.len() < 4096);

        let err = LzmaBackend::with_limit(64 * 1024)
            .decompress(&packed)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Decompression(_)));

        let exact = LzmaBackend::with_limit(1 << 20);
        assert_eq!(exact.decompress(&packed).unwrap().len(), 1 << 20);
    }

    #[test]
    fn default_limit_admits_largest_delta() {
        assert!(DEFAULT_DECOMPRESS_LIMIT > u64::from(u32::MAX));
    }

    #[test]
    fn empty_input_roundtrips() {
        #[cfg(feature = "zlib")]
        {
            let z = ZlibBackend::default();
            assert!(z.decompress(&z.compress(b"").unwrap()).unwrap().is_empty());
        }
        #[cfg(feature = "lzma")]
        {
            let l = LzmaBackend::default();
            assert!(l.decompress(&l.compress(b"").unwrap()).unwrap().is_empty());
        }
    }
}
