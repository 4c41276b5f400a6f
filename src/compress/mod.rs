// Optional compression of finished deltas.
//
// - `backend` - `CompressBackend` trait with zlib and LZMA implementations
//
// `Compression` selects a backend; `compress_delta` / `decompress_delta`
// wrap the encoder's output and the decoder's input respectively.

pub mod backend;

use std::borrow::Cow;
use std::io;
use std::sync::Arc;

use crate::delta::DecodeError;

pub use backend::{CompressBackend, DEFAULT_DECOMPRESS_LIMIT};
#[cfg(feature = "lzma")]
pub use backend::LzmaBackend;
#[cfg(feature = "zlib")]
pub use backend::ZlibBackend;

/// Compressor applied to whole deltas after creation.
#[derive(Clone, Default)]
pub enum Compression {
    /// Deltas are stored as produced.
    #[default]
    None,
    /// Zlib at the given level (0-9).
    #[cfg(feature = "zlib")]
    Zlib {
        /// Compression level. Default: 6.
        level: u32,
    },
    /// LZMA.
    #[cfg(feature = "lzma")]
    Lzma,
    /// A caller-supplied backend.
    Custom(Arc<dyn CompressBackend>),
}

impl std::fmt::Debug for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            #[cfg(feature = "zlib")]
            Self::Zlib { level } => write!(f, "Zlib {{ level: {level} }}"),
            #[cfg(feature = "lzma")]
            Self::Lzma => write!(f, "Lzma"),
            Self::Custom(b) => write!(f, "Custom({})", b.name()),
        }
    }
}

impl Compression {
    /// The backend to use, or `None` when deltas are stored raw.
    pub fn backend(&self) -> Option<Arc<dyn CompressBackend>> {
        match self {
            Self::None => None,
            #[cfg(feature = "zlib")]
            Self::Zlib { level } => Some(Arc::new(ZlibBackend::new(*level))),
            #[cfg(feature = "lzma")]
            Self::Lzma => Some(Arc::new(LzmaBackend::new())),
            Self::Custom(b) => Some(Arc::clone(b)),
        }
    }

    /// Whether deltas pass through a compressor.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Name for display: `none`, `zlib`, `lzma`, or the custom backend's.
    pub fn name(&self) -> String {
        match self.backend() {
            Some(b) => b.name().to_owned(),
            None => "none".to_owned(),
        }
    }
}

/// Compress a freshly created delta; returned unchanged when disabled.
pub fn compress_delta(delta: Vec<u8>, compression: &Compression) -> io::Result<Vec<u8>> {
    let Some(backend) = compression.backend() else {
        return Ok(delta);
    };
    let packed = backend.compress(&delta)?;
    log::debug!(
        "{}: delta {} -> {} bytes",
        backend.name(),
        delta.len(),
        packed.len()
    );
    Ok(packed)
}

/// Restore a delta produced by [`compress_delta`]; borrowed when disabled.
pub fn decompress_delta<'a>(
    delta: &'a [u8],
    compression: &Compression,
) -> Result<Cow<'a, [u8]>, DecodeError> {
    match compression.backend() {
        None => Ok(Cow::Borrowed(delta)),
        Some(backend) => backend.decompress(delta).map(Cow::Owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reverse;

    impl CompressBackend for Reverse {
        fn name(&self) -> &str {
            "reverse"
        }
        fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
            Ok(data.iter().rev().copied().collect())
        }
        fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
            Ok(data.iter().rev().copied().collect())
        }
    }

    #[test]
    fn none_is_passthrough() {
        let c = Compression::None;
        assert!(!c.is_enabled());
        assert!(c.backend().is_none());
        assert_eq!(c.name(), "none");
        assert_eq!(compress_delta(b"abc".to_vec(), &c).unwrap(), b"abc");
        assert!(matches!(
            decompress_delta(b"abc", &c).unwrap(),
            Cow::Borrowed(s) if s == b"abc"
        ));
    }

    #[test]
    fn custom_backend_is_used() {
        let c = Compression::Custom(Arc::new(Reverse));
        assert!(c.is_enabled());
        assert_eq!(c.name(), "reverse");
        assert_eq!(format!("{c:?}"), "Custom(reverse)");
        let packed = compress_delta(b"abc".to_vec(), &c).unwrap();
        assert_eq!(packed, b"cba");
        assert_eq!(&*decompress_delta(&packed, &c).unwrap(), b"abc");
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn zlib_selection() {
        let c = Compression::Zlib { level: 6 };
        assert_eq!(c.name(), "zlib");
        assert_eq!(format!("{c:?}"), "Zlib { level: 6 }");
        let delta = b"3\n3:abc2ZOaG;".repeat(20);
        let packed = compress_delta(delta.clone(), &c).unwrap();
        assert_eq!(&*decompress_delta(&packed, &c).unwrap(), &delta[..]);
    }

    #[cfg(feature = "lzma")]
    #[test]
    fn lzma_selection() {
        let c = Compression::Lzma;
        assert_eq!(c.name(), "lzma");
        let delta = vec![7u8; 500];
        let packed = compress_delta(delta.clone(), &c).unwrap();
        assert_eq!(&*decompress_delta(&packed, &c).unwrap(), &delta[..]);
    }
}
