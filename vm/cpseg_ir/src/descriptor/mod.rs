//! Per-constant descriptor stored in a shape.
//!
//! # Layout
//!
//! ```text
//! index_and_tag   (index << 8) | tag
//! offset_in_meta  byte offset of the constant's word in a segment block
//! offset_in_refs  slot of the constant's reference in a segment's refs
//! ```
//!
//! The record is 12 bytes; shape sizing charges exactly that much per
//! constant.

use std::cmp::Ordering;
use std::fmt;

use crate::{CpIndex, Tag};

/// Placement of one constant inside every segment of a shape.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
#[repr(C)]
pub struct ConstantDescriptor {
    index_and_tag: u32,
    offset_in_meta: u32,
    offset_in_refs: u32,
}

impl ConstantDescriptor {
    /// Bytes charged per descriptor in a shape's info block.
    pub const SIZE_IN_BYTES: usize = 12;

    /// Sub-index of the lead parameter in every shape.
    pub const PARAMETER_SUBINDEX: usize = 0;

    const INDEX_SHIFT: u32 = 8;
    const TAG_MASK: u32 = (1 << Self::INDEX_SHIFT) - 1;

    /// Create a descriptor for `index`/`tag` with both offsets unset.
    pub const fn new(index: CpIndex, tag: Tag) -> Self {
        ConstantDescriptor {
            index_and_tag: ((index.raw() as u32) << Self::INDEX_SHIFT) | tag.raw() as u32,
            offset_in_meta: 0,
            offset_in_refs: 0,
        }
    }

    /// Create a fully placed descriptor.
    pub const fn placed(index: CpIndex, tag: Tag, offset_in_meta: u32, offset_in_refs: u32) -> Self {
        let mut desc = Self::new(index, tag);
        desc.offset_in_meta = offset_in_meta;
        desc.offset_in_refs = offset_in_refs;
        desc
    }

    /// The record's three words, in field order.
    #[inline]
    pub const fn to_raw(&self) -> [u32; 3] {
        [self.index_and_tag, self.offset_in_meta, self.offset_in_refs]
    }

    /// Rebuild a descriptor from the words [`to_raw`](Self::to_raw) wrote.
    #[inline]
    pub const fn from_raw([index_and_tag, offset_in_meta, offset_in_refs]: [u32; 3]) -> Self {
        ConstantDescriptor {
            index_and_tag,
            offset_in_meta,
            offset_in_refs,
        }
    }

    /// Constant-pool entry this descriptor elaborates.
    #[inline]
    pub const fn index(&self) -> CpIndex {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "packed from a u16 index, shift restores it exactly"
        )]
        let raw = (self.index_and_tag >> Self::INDEX_SHIFT) as u16;
        CpIndex::new(raw)
    }

    /// Packed `(index << 8) | tag` word, as stamped into segment blocks.
    #[inline]
    pub const fn index_and_tag(&self) -> u32 {
        self.index_and_tag
    }

    /// Constant kind. Decodes to `Invalid` only for a default record.
    #[inline]
    pub fn tag(&self) -> Tag {
        #[allow(clippy::cast_possible_truncation, reason = "masked to 8 bits")]
        let raw = (self.index_and_tag & Self::TAG_MASK) as u8;
        Tag::from_u8(raw).unwrap_or(Tag::Invalid)
    }

    /// Byte offset of this constant's word in a segment's metadata block.
    ///
    /// Zero for the parameter, which has no per-segment word.
    #[inline]
    pub const fn offset_in_meta(&self) -> u32 {
        self.offset_in_meta
    }

    /// Slot of this constant's reference in a segment's reference array.
    #[inline]
    pub const fn offset_in_refs(&self) -> u32 {
        self.offset_in_refs
    }
}

impl fmt::Debug for ConstantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantDescriptor")
            .field("index", &self.index())
            .field("tag", &self.tag())
            .field("offset_in_meta", &self.offset_in_meta)
            .field("offset_in_refs", &self.offset_in_refs)
            .finish()
    }
}

/// Total order of `(index, tag)` pairs inside a shape.
///
/// The parameter sorts before everything regardless of index. The rest
/// order by tag class (linkage placeholders collapse to class 0), then by
/// raw tag, then by index.
pub fn compare_index_and_tag(a: (CpIndex, Tag), b: (CpIndex, Tag)) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

#[inline]
fn sort_key((index, tag): (CpIndex, Tag)) -> (u8, u8, u8, CpIndex) {
    let lead = u8::from(!tag.is_parameter());
    (lead, tag.order_class(), tag.raw(), index)
}

#[cfg(test)]
mod tests;
