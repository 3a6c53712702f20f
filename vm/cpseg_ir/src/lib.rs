//! Shared data types for constant-pool segments.
//!
//! A constant pool may carry several runtime-selected variants of a subset
//! of its constants. Each variant is a *segment*; the layout every segment
//! of one kind shares is a *shape*. This crate holds the plain data both
//! sides agree on:
//!
//! - [`Tag`]: constant kinds, with the total order segments sort by
//! - Index newtypes: [`CpIndex`], [`ShapeId`], [`InstanceId`], [`PoolId`],
//!   [`FieldIndex`], [`MethodId`]
//! - [`SegmentKind`], [`ShapeFlags`] and [`Role`]
//! - [`ConstantDescriptor`]: one constant's placement inside a segment
//!
//! # Design Philosophy
//!
//! - **Flatten Everything**: metadata objects reference each other through
//!   `u32` handles, never through raw links
//! - **Closed enums**: tag classification is a total function over a small
//!   enumeration, testable without any allocator

/// Compile-time assertion that a type has a specific size.
///
/// Used to keep metadata records at the byte size the layout arithmetic
/// charges for them.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod descriptor;
mod ids;
mod kind;
mod tag;

pub use descriptor::{compare_index_and_tag, ConstantDescriptor};
pub use ids::{CpIndex, FieldIndex, InstanceId, MethodId, PoolId, ShapeId};
pub use kind::{FixedRef, Role, SegmentKind, ShapeFlags};
pub use tag::Tag;

/// Machine word used for metadata sizing.
pub type Word = u64;

/// Bytes per metadata word.
pub const WORD_SIZE: usize = std::mem::size_of::<Word>();

/// Round a byte count up to whole words.
#[inline]
pub const fn bytes_to_words(bytes: usize) -> usize {
    bytes.div_ceil(WORD_SIZE)
}

#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{ConstantDescriptor, CpIndex, InstanceId, Tag};
    // Three packed u32s: index_and_tag, offset_in_meta, offset_in_refs
    crate::static_assert_size!(ConstantDescriptor, 12);
    crate::static_assert_size!(InstanceId, 4);
    crate::static_assert_size!(CpIndex, 2);
    crate::static_assert_size!(Tag, 1);
}
