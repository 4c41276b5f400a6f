// Match extension: length of the common prefix / suffix of two regions.
//
// The scalar path compares eight bytes per step via u64 XOR; on x86_64
// an AVX2 path compares 32 bytes per step when the CPU supports it. Every
// path returns exactly what a byte-by-byte comparison would.

/// Function pointer type for match scanning routines.
pub type MatchFn = fn(&[u8], &[u8]) -> usize;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Number of equal leading bytes of `a` and `b` (up to the shorter length).
#[inline]
pub fn forward_match(a: &[u8], b: &[u8]) -> usize {
    forward_match_fn()(a, b)
}

/// Number of equal trailing bytes of `a` and `b` (up to the shorter length).
#[inline]
pub fn backward_match(a: &[u8], b: &[u8]) -> usize {
    backward_match_fn()(a, b)
}

/// Best forward-match implementation for the current CPU.
#[inline]
pub fn forward_match_fn() -> MatchFn {
    #[cfg(target_arch = "x86_64")]
    {
        x86::forward_dispatch()
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        forward_match_scalar
    }
}

/// Best backward-match implementation for the current CPU.
#[inline]
pub fn backward_match_fn() -> MatchFn {
    #[cfg(target_arch = "x86_64")]
    {
        x86::backward_dispatch()
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        backward_match_scalar
    }
}

// ---------------------------------------------------------------------------
// Scalar (word-at-a-time) implementations
// ---------------------------------------------------------------------------

/// Forward comparison, eight bytes per step.
pub fn forward_match_scalar(a: &[u8], b: &[u8]) -> usize {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);
    let (words_a, _) = a.as_chunks::<8>();
    let (words_b, _) = b.as_chunks::<8>();

    for (k, (x, y)) in words_a.iter().zip(words_b).enumerate() {
        let diff = u64::from_le_bytes(*x) ^ u64::from_le_bytes(*y);
        if diff != 0 {
            return k * 8 + (diff.trailing_zeros() / 8) as usize;
        }
    }

    let done = words_a.len() * 8;
    done + a[done..]
        .iter()
        .zip(&b[done..])
        .take_while(|(x, y)| x == y)
        .count()
}

/// Backward comparison, eight bytes per step from the end.
pub fn backward_match_scalar(a: &[u8], b: &[u8]) -> usize {
    let n = a.len().min(b.len());
    let (a, b) = (&a[a.len() - n..], &b[b.len() - n..]);
    let (head_a, words_a) = a.as_rchunks::<8>();
    let (head_b, words_b) = b.as_rchunks::<8>();

    for (k, (x, y)) in words_a.iter().rev().zip(words_b.iter().rev()).enumerate() {
        let diff = u64::from_le_bytes(*x) ^ u64::from_le_bytes(*y);
        if diff != 0 {
            return k * 8 + (diff.leading_zeros() / 8) as usize;
        }
    }

    words_a.len() * 8
        + head_a
            .iter()
            .rev()
            .zip(head_b.iter().rev())
            .take_while(|(x, y)| x == y)
            .count()
}

// ---------------------------------------------------------------------------
// x86_64 AVX2 (32 bytes at a time)
// ---------------------------------------------------------------------------

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;
    use std::sync::OnceLock;

    use super::{MatchFn, backward_match_scalar, forward_match_scalar};

    pub(super) fn forward_dispatch() -> MatchFn {
        static DISPATCH: OnceLock<MatchFn> = OnceLock::new();
        *DISPATCH.get_or_init(|| {
            if is_x86_feature_detected!("avx2") {
                forward_avx2_call
            } else {
                forward_match_scalar
            }
        })
    }

    pub(super) fn backward_dispatch() -> MatchFn {
        static DISPATCH: OnceLock<MatchFn> = OnceLock::new();
        *DISPATCH.get_or_init(|| {
            if is_x86_feature_detected!("avx2") {
                backward_avx2_call
            } else {
                backward_match_scalar
            }
        })
    }

    fn forward_avx2_call(a: &[u8], b: &[u8]) -> usize {
        // Safety: AVX2 support is checked once in the dispatcher.
        unsafe { forward_avx2(a, b) }
    }

    fn backward_avx2_call(a: &[u8], b: &[u8]) -> usize {
        // Safety: AVX2 support is checked once in the dispatcher.
        unsafe { backward_avx2(a, b) }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn forward_avx2(a: &[u8], b: &[u8]) -> usize {
        let n = a.len().min(b.len());
        let mut i = 0;

        // Safety: the loop guard keeps every 32-byte load inside both slices.
        unsafe {
            while i + 32 <= n {
                let va = _mm256_loadu_si256(a.as_ptr().add(i) as *const __m256i);
                let vb = _mm256_loadu_si256(b.as_ptr().add(i) as *const __m256i);
                let mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(va, vb)) as u32;
                if mask != u32::MAX {
                    return i + (!mask).trailing_zeros() as usize;
                }
                i += 32;
            }
        }

        i + forward_match_scalar(&a[i..n], &b[i..n])
    }

    #[target_feature(enable = "avx2")]
    unsafe fn backward_avx2(a: &[u8], b: &[u8]) -> usize {
        let n = a.len().min(b.len());
        let (a, b) = (&a[a.len() - n..], &b[b.len() - n..]);
        let mut end = n;

        // Safety: the loop guard keeps every 32-byte load inside both slices.
        unsafe {
            while end >= 32 {
                let va = _mm256_loadu_si256(a.as_ptr().add(end - 32) as *const __m256i);
                let vb = _mm256_loadu_si256(b.as_ptr().add(end - 32) as *const __m256i);
                let mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(va, vb)) as u32;
                if mask != u32::MAX {
                    return n - end + mask.leading_ones() as usize;
                }
                end -= 32;
            }
        }

        n - end + backward_match_scalar(&a[..end], &b[..end])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
