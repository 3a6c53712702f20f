//! Resource limits for a class-loading unit.

/// Environment variable bounding a loader's metadata arena, in words.
pub const METASPACE_WORDS_ENV: &str = "CPSEG_METASPACE_WORDS";

/// Environment variable bounding the managed heap, in reference slots.
pub const HEAP_SLOTS_ENV: &str = "CPSEG_HEAP_SLOTS";

/// Limits applied when building a [`LoaderData`](crate::LoaderData) and
/// its heap. `None` means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    pub metaspace_words: Option<usize>,
    pub heap_slots: Option<usize>,
}

impl LoaderConfig {
    /// Unbounded limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read limits from `CPSEG_METASPACE_WORDS` and `CPSEG_HEAP_SLOTS`.
    ///
    /// Unset variables leave the limit unbounded; unparsable ones are
    /// ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        LoaderConfig {
            metaspace_words: parse_limit(METASPACE_WORDS_ENV, lookup(METASPACE_WORDS_ENV)),
            heap_slots: parse_limit(HEAP_SLOTS_ENV, lookup(HEAP_SLOTS_ENV)),
        }
    }

    #[must_use]
    pub fn with_metaspace_words(mut self, words: usize) -> Self {
        self.metaspace_words = Some(words);
        self
    }

    #[must_use]
    pub fn with_heap_slots(mut self, slots: usize) -> Self {
        self.heap_slots = Some(slots);
        self
    }
}

fn parse_limit(key: &str, value: Option<String>) -> Option<usize> {
    let value = value?;
    match value.trim().parse() {
        Ok(limit) => Some(limit),
        Err(e) => {
            tracing::warn!("ignoring {key}={value:?}: {e}");
            None
        }
    }
}
