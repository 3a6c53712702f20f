//! Two-pass shape layout.
//!
//! [`measure`] sorts a shape's constants and walks them once to size the
//! shape's info block and every segment block before anything exists.
//! [`place`] re-runs the identical walk into the allocated descriptor
//! array and fails if the second walk ends anywhere the first did not.
//!
//! # Byte Layout
//!
//! ```text
//! shape info    header (4 words) | descriptor * 12 | field * 4 | method * 8
//! segment       header (4 words) | one word per storage constant
//! refs          fixed slots      | one slot per storage constant
//! ```
//!
//! The parameter always sits at sub-index 0 with meta offset 0 and the
//! argument slot as its reference offset. It adds a descriptor but no
//! per-segment storage.

mod request;

pub use request::ShapeRequest;

use cpseg_ir::{
    bytes_to_words, compare_index_and_tag, ConstantDescriptor, CpIndex, FixedRef, SegmentKind,
    Tag, WORD_SIZE,
};
use smallvec::SmallVec;

use crate::LayoutError;

/// Header words at the start of a shape info block and of a segment block.
pub(crate) const HEADER_WORDS: usize = 4;

#[allow(clippy::cast_possible_truncation, reason = "small compile-time constants")]
mod bytes {
    use super::{ConstantDescriptor, HEADER_WORDS, WORD_SIZE};

    pub(super) const HEADER: u32 = (HEADER_WORDS * WORD_SIZE) as u32;
    pub(super) const DESCRIPTOR: u32 = ConstantDescriptor::SIZE_IN_BYTES as u32;
    pub(super) const WORD: u32 = WORD_SIZE as u32;
    pub(super) const FIELD: u32 = 4;
    pub(super) const METHOD: u32 = WORD_SIZE as u32;
}

/// Running (and final) layout accumulators.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Offsets {
    /// Bytes of the shape's info block.
    pub info_bytes: u32,
    /// Bytes of each segment block.
    pub segment_bytes: u32,
    /// Slots of each segment's reference array.
    pub refs: u32,
}

impl Offsets {
    /// Accumulators before the first constant of a `kind` shape.
    pub const fn start(kind: SegmentKind) -> Self {
        Offsets {
            info_bytes: bytes::HEADER,
            segment_bytes: bytes::HEADER,
            refs: kind.fixed_ref_limit(),
        }
    }
}

/// A measured shape: sorted constants and frozen totals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    kind: SegmentKind,
    entries: SmallVec<[(CpIndex, Tag); 8]>,
    fields: usize,
    methods: usize,
    totals: Offsets,
}

impl Layout {
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// Constants in placement order, parameter first.
    pub fn entries(&self) -> &[(CpIndex, Tag)] {
        &self.entries
    }

    pub fn constant_count(&self) -> usize {
        self.entries.len()
    }

    pub fn totals(&self) -> Offsets {
        self.totals
    }

    pub fn info_size_in_words(&self) -> usize {
        bytes_to_words(self.totals.info_bytes as usize)
    }

    pub fn segment_size_in_words(&self) -> usize {
        bytes_to_words(self.totals.segment_bytes as usize)
    }

    pub fn refs_length(&self) -> u32 {
        self.totals.refs
    }
}

/// Pass 1: sort the requested constants and size everything.
///
/// `tags` is the owning pool's tag table. Pure: the result depends on
/// `tags` and `request` only.
pub fn measure(tags: &[Tag], request: &ShapeRequest) -> Result<Layout, LayoutError> {
    let requested = std::iter::once(request.parameter).chain(request.constants.iter().copied());

    let mut entries: SmallVec<[(CpIndex, Tag); 8]> = SmallVec::new();
    for index in requested {
        match tags.get(index.index()) {
            Some(&tag) if index.index() != 0 => entries.push((index, tag)),
            _ => {
                return Err(LayoutError::IndexOutOfBounds {
                    index,
                    length: tags.len(),
                })
            }
        }
    }
    entries.sort_unstable_by(|&a, &b| compare_index_and_tag(a, b));
    // Equal indices carry equal tags, so duplicates end up adjacent.
    entries.dedup_by_key(|entry| entry.0);

    let (found, tag) = entries[0];
    if found != request.parameter || !tag.is_parameter() {
        return Err(LayoutError::LeadNotParameter {
            expected: request.parameter,
            found,
            tag,
        });
    }

    let mut layout = Layout {
        kind: request.kind,
        entries,
        fields: request.fields.len(),
        methods: request.methods.len(),
        totals: Offsets::default(),
    };
    layout.totals = walk(&layout, |_, _| {})?;

    tracing::debug!(
        segnum = request.segnum.segnum(),
        kind = ?layout.kind,
        constants = layout.constant_count(),
        info_words = layout.info_size_in_words(),
        segment_words = layout.segment_size_in_words(),
        refs = layout.refs_length(),
        "measured segment layout"
    );
    Ok(layout)
}

/// Pass 2: write every descriptor of `layout` into `target`.
///
/// `target` must have exactly one slot per constant. Placing the same
/// layout twice writes the same descriptors.
pub fn place(layout: &Layout, target: &mut [ConstantDescriptor]) -> Result<Offsets, LayoutError> {
    assert_eq!(
        target.len(),
        layout.constant_count(),
        "descriptor array sized for a different layout"
    );

    let placed = walk(layout, |subidx, desc| target[subidx] = desc)?;
    if placed != layout.totals {
        return Err(LayoutError::PassMismatch {
            measured: layout.totals,
            placed,
        });
    }
    Ok(placed)
}

fn walk(
    layout: &Layout,
    mut emit: impl FnMut(usize, ConstantDescriptor),
) -> Result<Offsets, LayoutError> {
    let mut at = Offsets::start(layout.kind);

    for (subidx, &(index, tag)) in layout.entries.iter().enumerate() {
        let desc = if subidx == ConstantDescriptor::PARAMETER_SUBINDEX && tag.is_parameter() {
            ConstantDescriptor::placed(index, tag, 0, FixedRef::ARGUMENT)
        } else if tag.needs_segment_storage() {
            let desc = ConstantDescriptor::placed(index, tag, at.segment_bytes, at.refs);
            at.segment_bytes = grow(at.segment_bytes, bytes::WORD)?;
            at.refs = grow(at.refs, 1)?;
            desc
        } else {
            return Err(LayoutError::UnsupportedTag { index, tag });
        };
        at.info_bytes = grow(at.info_bytes, bytes::DESCRIPTOR)?;
        emit(subidx, desc);
    }

    at.info_bytes = grow(at.info_bytes, scaled(layout.fields, bytes::FIELD)?)?;
    at.info_bytes = grow(at.info_bytes, scaled(layout.methods, bytes::METHOD)?)?;
    Ok(at)
}

#[inline]
fn grow(at: u32, by: u32) -> Result<u32, LayoutError> {
    at.checked_add(by).ok_or(LayoutError::TooLarge)
}

#[inline]
fn scaled(count: usize, size: u32) -> Result<u32, LayoutError> {
    u32::try_from(count)
        .ok()
        .and_then(|count| count.checked_mul(size))
        .ok_or(LayoutError::TooLarge)
}
