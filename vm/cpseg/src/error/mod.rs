//! Layout and segment errors.
//!
//! Allocation failures and malformed shape requests are `Result`s.
//! Misuse of a finished shape (wrong kind, bad enclosing segment) is a
//! caller bug and panics at the call site instead.

use cpseg_heap::AllocFailure;
use cpseg_ir::{CpIndex, ShapeId, Tag};

use crate::Offsets;

/// Why a shape's layout could not be computed.
///
/// Every variant aborts shape construction; none is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("constant pool index {index:?} out of bounds (pool length {length})")]
    IndexOutOfBounds { index: CpIndex, length: usize },

    #[error("constant {index:?} has tag {tag}, which cannot appear in a segment")]
    UnsupportedTag { index: CpIndex, tag: Tag },

    #[error("segment must lead with parameter {expected:?}, found {found:?} ({tag})")]
    LeadNotParameter {
        expected: CpIndex,
        found: CpIndex,
        tag: Tag,
    },

    #[error("layout passes disagree: measured {measured:?}, placed {placed:?}")]
    PassMismatch { measured: Offsets, placed: Offsets },

    #[error("segment layout does not fit 32-bit offsets")]
    TooLarge,
}

/// Why a shape or segment could not be created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    #[error(transparent)]
    Alloc(#[from] AllocFailure),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("segment number {0:?} is not 1-based")]
    InvalidSegnum(ShapeId),

    #[error("shape {0:?} is already allocated in this pool")]
    ShapeSlotOccupied(ShapeId),

    #[error("shape {segnum:?} has an invalid enclosing class shape {enclosing:?}")]
    EnclosingShape {
        segnum: ShapeId,
        enclosing: Option<ShapeId>,
    },
}
