// Source index: window fingerprint -> source blocks.
//
// The source is cut into non-overlapping blocks of `window` bytes; each
// block is filed under `fingerprint % size`, where `size` is the number
// of whole blocks in the source. A bucket is a singly linked chain
// threaded through `next`, newest block first.
//
// Stored values are `block + 1` so that 0 means "empty" / "end of chain".

use std::collections::TryReserveError;

use super::rolling::window_hash;

/// Chain terminator / empty bucket.
const EMPTY: u32 = 0;

/// Hash index over fixed-size blocks of a source buffer.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    window: usize,
    /// `head[bucket]` = newest block in the bucket, plus one.
    head: Vec<u32>,
    /// `next[block]` = older block sharing the bucket, plus one.
    next: Vec<u32>,
    /// Blocks actually inserted.
    blocks: usize,
}

impl SourceIndex {
    /// Index `source` with blocks of `window` bytes.
    ///
    /// A block starting at `i` is indexed only while `i + window` is
    /// strictly less than the source length, so the final whole block
    /// is skipped when the source length is an exact multiple of the
    /// window. Sources no longer than one window produce an empty index.
    ///
    /// Fails only when the tables cannot be allocated.
    pub fn build(source: &[u8], window: usize) -> Result<Self, TryReserveError> {
        debug_assert!(window > 0);
        let size = source.len() / window;

        let mut head = Vec::new();
        head.try_reserve_exact(size)?;
        head.resize(size, EMPTY);
        let mut next = Vec::new();
        next.try_reserve_exact(size)?;
        next.resize(size, EMPTY);

        let mut index = Self {
            window,
            head,
            next,
            blocks: 0,
        };
        let mut offset = 0;
        while offset + window < source.len() {
            let fp = window_hash(&source[offset..offset + window]);
            index.insert(fp, offset / window);
            offset += window;
        }
        Ok(index)
    }

    #[inline]
    fn insert(&mut self, fingerprint: u32, block: usize) {
        let bucket = self.bucket(fingerprint);
        self.next[block] = self.head[bucket];
        // Blocks are bounded by len / window, which fits in u32.
        self.head[bucket] = block as u32 + 1;
        self.blocks += 1;
    }

    #[inline(always)]
    fn bucket(&self, fingerprint: u32) -> usize {
        fingerprint as usize % self.head.len()
    }

    /// Source offsets of blocks whose bucket matches `fingerprint`,
    /// newest first.
    ///
    /// Every entry in the bucket is yielded, including blocks that only
    /// collide modulo the table size; callers verify bytes themselves.
    #[inline]
    pub fn candidates(&self, fingerprint: u32) -> Candidates<'_> {
        let cursor = if self.head.is_empty() {
            EMPTY
        } else {
            self.head[self.bucket(fingerprint)]
        };
        Candidates {
            index: self,
            cursor,
        }
    }

    /// Number of buckets (and of block slots).
    pub fn size(&self) -> usize {
        self.head.len()
    }

    /// Number of indexed blocks.
    pub fn len(&self) -> usize {
        self.blocks
    }

    /// Whether no block was indexed.
    pub fn is_empty(&self) -> bool {
        self.blocks == 0
    }
}

/// Iterator over one bucket's chain. See [`SourceIndex::candidates`].
pub struct Candidates<'a> {
    index: &'a SourceIndex,
    cursor: u32,
}

impl Iterator for Candidates<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.cursor == EMPTY {
            return None;
        }
        let block = (self.cursor - 1) as usize;
        self.cursor = self.index.next[block];
        Some(block * self.index.window)
    }
}

impl std::iter::FusedIterator for Candidates<'_> {}
