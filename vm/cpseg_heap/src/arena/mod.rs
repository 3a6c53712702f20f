//! Loader-lifetime metadata arena.
//!
//! Blocks are zero-initialized, sized in words, and never move. The arena
//! only tracks how many words are outstanding against an optional budget;
//! ownership of each block passes to the metadata object built on it.

use std::sync::atomic::{AtomicUsize, Ordering};

use cpseg_ir::Word;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{AllocFailure, FailPoint, VmThread};

/// What a metadata block is allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    /// A shape's info block (header plus constant descriptors).
    ShapeInfo,
    /// A segment block (template or live instance).
    Segment,
}

/// A zero-initialized, word-sized metadata block.
#[derive(Debug, PartialEq, Eq)]
pub struct MetaBlock {
    kind: MetaKind,
    words: Box<[Word]>,
}

impl MetaBlock {
    pub fn kind(&self) -> MetaKind {
        self.kind
    }

    pub fn size_in_words(&self) -> usize {
        self.words.len()
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [Word] {
        &mut self.words
    }

    /// Copy `src` word-for-word into this block from `start` onward.
    ///
    /// Both blocks must have the same size.
    pub fn copy_body_from(&mut self, src: &MetaBlock, start: usize) {
        assert_eq!(self.words.len(), src.words.len(), "block sizes must match");
        self.words[start..].copy_from_slice(&src.words[start..]);
    }
}

/// Word-budgeted allocator owned by one class-loading unit.
pub struct MetaArena {
    limit: Option<usize>,
    used: AtomicUsize,
    live: AtomicUsize,
    fail_next: Mutex<FxHashMap<MetaKind, FailPoint>>,
}

impl MetaArena {
    /// Create an arena with an optional word budget.
    pub fn new(limit: Option<usize>) -> Self {
        MetaArena {
            limit,
            used: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            fail_next: Mutex::new(FxHashMap::default()),
        }
    }

    /// Allocate a zeroed block of `words` words.
    ///
    /// Fails on a pending termination signal, an injected failure, or when
    /// the budget cannot cover the request.
    pub fn allocate(
        &self,
        thread: &VmThread,
        kind: MetaKind,
        words: usize,
    ) -> Result<MetaBlock, AllocFailure> {
        thread.check_termination()?;

        if let Some(point) = self.fail_next.lock().remove(&kind) {
            tracing::debug!(?kind, ?point, words, "injected metaspace failure");
            return Err(match point {
                FailPoint::Exhausted => AllocFailure::MetaspaceExhausted {
                    requested: words,
                    available: self.available(),
                },
                FailPoint::Terminated => AllocFailure::AsyncTermination,
            });
        }

        self.reserve(words)?;
        self.live.fetch_add(1, Ordering::Relaxed);
        Ok(MetaBlock {
            kind,
            words: vec![0; words].into_boxed_slice(),
        })
    }

    /// Return a block's words to the budget.
    pub fn deallocate(&self, block: MetaBlock) {
        self.used.fetch_sub(block.size_in_words(), Ordering::AcqRel);
        self.live.fetch_sub(1, Ordering::Relaxed);
    }

    /// Make the next allocation of `kind` fail as described by `point`.
    pub fn fail_next(&self, kind: MetaKind, point: FailPoint) {
        self.fail_next.lock().insert(kind, point);
    }

    /// Words currently outstanding.
    pub fn words_used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Blocks currently outstanding.
    pub fn live_blocks(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Words left under the budget (`usize::MAX` when unbounded).
    pub fn available(&self) -> usize {
        match self.limit {
            Some(limit) => limit.saturating_sub(self.words_used()),
            None => usize::MAX,
        }
    }

    fn reserve(&self, words: usize) -> Result<(), AllocFailure> {
        let Some(limit) = self.limit else {
            self.used.fetch_add(words, Ordering::AcqRel);
            return Ok(());
        };

        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(words).filter(|&total| total <= limit)
            })
            .map(|_| ())
            .map_err(|used| {
                tracing::debug!(words, used, limit, "metaspace exhausted");
                AllocFailure::MetaspaceExhausted {
                    requested: words,
                    available: limit.saturating_sub(used),
                }
            })
    }
}

impl Default for MetaArena {
    fn default() -> Self {
        Self::new(None)
    }
}
