// Greedy block matching against an indexed source.
//
// The scan keeps an uncommitted literal run starting at `base` and slides
// a rolling hash forward from it. At each position every indexed block in
// the fingerprint's bucket (up to the search limit) is verified, extended
// in both directions and priced; the longest copy that pays for its own
// encoding is committed, and scanning restarts right after it.

use std::collections::TryReserveError;

use super::config::MatcherConfig;
use super::extend::{self, MatchFn};
use super::rolling::RollingHash;
use super::table::SourceIndex;
use crate::delta::format::{COPY_DELIMITERS, Instruction};
use crate::delta::varint::encoded_len;

// ---------------------------------------------------------------------------
// Match candidate
// ---------------------------------------------------------------------------

/// A verified, extended match at one scan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    /// Total match length: backward + window + forward.
    pub length: usize,
    /// First source byte of the match.
    pub source_offset: usize,
    /// Target bytes between `base` and the start of the match.
    pub literal_len: usize,
}

impl MatchCandidate {
    /// Encoded size of the literal header plus the copy record, excluding
    /// the literal bytes themselves.
    #[inline]
    pub fn overhead(&self) -> usize {
        encoded_len(self.literal_len as u64)
            + encoded_len(self.length as u64)
            + encoded_len(self.source_offset as u64)
            + COPY_DELIMITERS
    }

    /// Whether the copy is no larger than the bytes it replaces.
    #[inline]
    pub fn pays_off(&self) -> bool {
        self.length >= self.overhead()
    }
}

// ---------------------------------------------------------------------------
// Match engine
// ---------------------------------------------------------------------------

/// Source-side matching state: the indexed source plus cached comparators.
///
/// Building the index is the expensive part; one engine can encode any
/// number of targets against the same source, from several threads.
pub struct MatchEngine<'s> {
    config: MatcherConfig,
    source: &'s [u8],
    /// `None` when the source is too short to ever yield a copy.
    index: Option<SourceIndex>,
    forward_match_fn: MatchFn,
    backward_match_fn: MatchFn,
}

impl<'s> MatchEngine<'s> {
    /// Index `source` for matching. `config` is assumed validated.
    pub fn new(config: MatcherConfig, source: &'s [u8]) -> Result<Self, TryReserveError> {
        let index = SourceIndex::build(source, config.window_size)?;
        Ok(Self {
            config,
            source,
            index: (!index.is_empty()).then_some(index),
            forward_match_fn: extend::forward_match_fn(),
            backward_match_fn: extend::backward_match_fn(),
        })
    }

    /// Whether no copy can ever be produced (source no longer than a window).
    pub fn is_degenerate(&self) -> bool {
        self.index.is_none()
    }

    /// Cover `target` with literal and copy instructions, in order.
    ///
    /// With a degenerate source the result is a single literal spanning the
    /// whole target, even when the target is empty.
    pub fn find_matches(&self, target: &[u8]) -> Vec<Instruction> {
        let Some(index) = &self.index else {
            return vec![Instruction::Literal {
                len: target.len() as u32,
            }];
        };

        let w = self.config.window_size;
        let mut out = Vec::with_capacity((target.len() / 64).max(4));
        let mut base = 0usize;

        while base + w < target.len() {
            let mut hash = RollingHash::new(&target[base..base + w]);
            let mut i = 0usize;

            loop {
                if let Some(best) = self.best_match(index, target, base, i, hash.fingerprint()) {
                    if best.literal_len > 0 {
                        out.push(Instruction::Literal {
                            len: best.literal_len as u32,
                        });
                    }
                    out.push(Instruction::Copy {
                        len: best.length as u32,
                        offset: best.source_offset as u32,
                    });
                    log::trace!(
                        "copy {} bytes from {} at target {}",
                        best.length,
                        best.source_offset,
                        base + best.literal_len
                    );
                    base += best.literal_len + best.length;
                    break;
                }

                if base + i + w >= target.len() {
                    out.push(Instruction::Literal {
                        len: (target.len() - base) as u32,
                    });
                    base = target.len();
                    break;
                }

                hash.roll(target[base + i + w]);
                i += 1;
            }
        }

        if base < target.len() {
            out.push(Instruction::Literal {
                len: (target.len() - base) as u32,
            });
        }
        out
    }

    /// Best acceptable match for the window at `target[base + i..]`.
    ///
    /// Candidates are tried newest block first; on equal length the first
    /// one tried is kept. Hash collisions count toward the search limit.
    fn best_match(
        &self,
        index: &SourceIndex,
        target: &[u8],
        base: usize,
        i: usize,
        fingerprint: u32,
    ) -> Option<MatchCandidate> {
        let w = self.config.window_size;
        let src = self.source;
        let y = base + i;
        let window = &target[y..y + w];
        let mut best: Option<MatchCandidate> = None;

        for src_off in index.candidates(fingerprint).take(self.config.search_limit) {
            if src[src_off..src_off + w] != *window {
                continue;
            }

            let fwd = (self.forward_match_fn)(&src[src_off + w..], &target[y + w..]);
            let back_limit = src_off.min(i);
            let back = if back_limit > 0 {
                (self.backward_match_fn)(
                    &src[src_off - back_limit..src_off],
                    &target[y - back_limit..y],
                )
            } else {
                0
            };

            let candidate = MatchCandidate {
                length: back + w + fwd,
                source_offset: src_off - back,
                literal_len: i - back,
            };
            if candidate.pays_off() && best.is_none_or(|b| candidate.length > b.length) {
                best = Some(candidate);
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
