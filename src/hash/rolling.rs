// Rolling window hash used to key the source index.
//
// Two 16-bit running sums over a window of `w` bytes:
//   a = Σ byte[k]
//   b = Σ byte[k] * (w - k)
// packed as `a | b << 16`. Bytes enter the sums sign-extended
// (`byte as i8 as u16`), as in signed-`char` C builds of the format, so
// deltas built from these fingerprints are bit-identical to theirs.
//
// The fingerprint only narrows the candidate set; matches are always
// verified byte by byte before use.

use super::config::MAX_WINDOW_SIZE;

/// Windows up to this width keep their bytes inline instead of on the heap.
const INLINE_WINDOW: usize = 32;

#[inline(always)]
fn lane(byte: u8) -> u16 {
    byte as i8 as u16
}

/// Fingerprint of a whole window, computed directly.
///
/// Equal to `RollingHash::new(window).fingerprint()`.
#[inline]
pub fn window_hash(window: &[u8]) -> u32 {
    let mut a: u16 = 0;
    let mut b: u16 = 0;
    for &byte in window {
        a = a.wrapping_add(lane(byte));
        b = b.wrapping_add(a);
    }
    u32::from(a) | (u32::from(b) << 16)
}

// ---------------------------------------------------------------------------
// Window storage
// ---------------------------------------------------------------------------

/// Circular window storage: inline for small windows, boxed otherwise.
enum WindowBuf {
    Inline([u8; INLINE_WINDOW]),
    Heap(Box<[u8]>),
}

impl WindowBuf {
    fn from_window(window: &[u8]) -> Self {
        if window.len() <= INLINE_WINDOW {
            let mut buf = [0u8; INLINE_WINDOW];
            buf[..window.len()].copy_from_slice(window);
            Self::Inline(buf)
        } else {
            Self::Heap(window.into())
        }
    }

    #[inline(always)]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Self::Inline(buf) => &mut buf[..],
            Self::Heap(buf) => &mut buf[..],
        }
    }
}

// ---------------------------------------------------------------------------
// Rolling hash
// ---------------------------------------------------------------------------

/// Incrementally updated fingerprint over a sliding window.
pub struct RollingHash {
    a: u16,
    b: u16,
    /// Slot holding the oldest byte (next to be evicted).
    i: u16,
    window: u16,
    buf: WindowBuf,
}

impl RollingHash {
    /// Start hashing at `window`, whose length is the window width.
    ///
    /// The width must be in `1..=MAX_WINDOW_SIZE`.
    pub fn new(window: &[u8]) -> Self {
        debug_assert!((1..=MAX_WINDOW_SIZE).contains(&window.len()));
        let fp = window_hash(window);
        Self {
            a: fp as u16,
            b: (fp >> 16) as u16,
            i: 0,
            window: window.len() as u16,
            buf: WindowBuf::from_window(window),
        }
    }

    /// Slide the window one byte: evict the oldest byte, admit `byte`.
    #[inline]
    pub fn roll(&mut self, byte: u8) {
        let slot = usize::from(self.i);
        let buf = self.buf.as_mut_slice();
        let old = lane(buf[slot]);
        buf[slot] = byte;

        self.i += 1;
        if self.i == self.window {
            self.i = 0;
        }
        self.a = self.a.wrapping_sub(old).wrapping_add(lane(byte));
        self.b = self
            .b
            .wrapping_sub(self.window.wrapping_mul(old))
            .wrapping_add(self.a);
    }

    /// Current 32-bit fingerprint, `a | b << 16`.
    #[inline(always)]
    pub fn fingerprint(&self) -> u32 {
        u32::from(self.a) | (u32::from(self.b) << 16)
    }

    /// Window width in bytes.
    pub fn window(&self) -> usize {
        usize::from(self.window)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
