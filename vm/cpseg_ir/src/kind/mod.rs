//! Segment kinds, shape flags, instance roles and fixed reference slots.

use bitflags::bitflags;

use crate::InstanceId;

/// What a segment specializes: a type, a method, or a method nested in a
/// specialized type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SegmentKind {
    /// Type specialization. Instances are class anchors.
    Class,
    /// Method specialization with no class component.
    MethodOnly,
    /// Method specialization inside a specialized type. Instances link to
    /// an instance of the enclosing class shape.
    MethodAndClass,
}

bitflags! {
    /// Entry categories present in a shape.
    ///
    /// Stored on the shape so the kind predicates are single bit tests.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct ShapeFlags: u32 {
        /// Has constants that vary with a class binding.
        const HAS_CLASS_ENTRIES = 1 << 0;
        /// Has constants that vary with a method binding.
        const HAS_METHOD_ENTRIES = 1 << 1;
    }
}

impl SegmentKind {
    /// Flags describing this kind.
    pub const fn flags(self) -> ShapeFlags {
        match self {
            Self::Class => ShapeFlags::HAS_CLASS_ENTRIES,
            Self::MethodOnly => ShapeFlags::HAS_METHOD_ENTRIES,
            Self::MethodAndClass => ShapeFlags::HAS_CLASS_ENTRIES.union(ShapeFlags::HAS_METHOD_ENTRIES),
        }
    }

    /// Recover the kind from stored flags.
    pub fn from_flags(flags: ShapeFlags) -> Option<Self> {
        if flags == ShapeFlags::HAS_CLASS_ENTRIES {
            Some(Self::Class)
        } else if flags == ShapeFlags::HAS_METHOD_ENTRIES {
            Some(Self::MethodOnly)
        } else if flags == ShapeFlags::all() {
            Some(Self::MethodAndClass)
        } else {
            None
        }
    }

    #[inline]
    pub const fn is_class(self) -> bool {
        matches!(self, Self::Class)
    }

    #[inline]
    pub const fn is_method_only(self) -> bool {
        matches!(self, Self::MethodOnly)
    }

    #[inline]
    pub const fn is_method_and_class(self) -> bool {
        matches!(self, Self::MethodAndClass)
    }

    // Plain `is_method` is left out on purpose: it reads as either of the
    // two predicates below.

    /// Class-only or combined.
    #[inline]
    pub const fn has_class(self) -> bool {
        !self.is_method_only()
    }

    /// Method-only or combined.
    #[inline]
    pub const fn has_method(self) -> bool {
        !self.is_class()
    }

    /// Combined: needs an enclosing class segment.
    #[inline]
    pub const fn has_both(self) -> bool {
        self.is_method_and_class()
    }

    /// Number of reference slots every segment of this kind reserves
    /// before its per-constant slots.
    #[inline]
    pub const fn fixed_ref_limit(self) -> u32 {
        if self.has_both() {
            FixedRef::LIMIT_WITH_CLASS
        } else {
            FixedRef::LIMIT
        }
    }
}

/// Fixed slot positions in a segment's reference array.
pub struct FixedRef;

impl FixedRef {
    /// Binding argument of the lead parameter.
    pub const ARGUMENT: u32 = 0;
    /// Reference array of the enclosing class segment (combined only).
    pub const CLASS_REFS: u32 = 1;
    /// Fixed slots for class-only and method-only shapes.
    pub const LIMIT: u32 = 1;
    /// Fixed slots for combined shapes.
    pub const LIMIT_WITH_CLASS: u32 = 2;
}

/// How an instance relates to the class segment of its binding.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Role {
    /// The instance is itself the class segment.
    ClassAnchor,
    /// No class component.
    MethodOnly,
    /// Method segment nested in the given class segment.
    Combined(InstanceId),
}

impl Role {
    /// The kind of segment this role belongs to.
    pub const fn kind(self) -> SegmentKind {
        match self {
            Self::ClassAnchor => SegmentKind::Class,
            Self::MethodOnly => SegmentKind::MethodOnly,
            Self::Combined(_) => SegmentKind::MethodAndClass,
        }
    }

    /// Class segment reachable from an instance with this role, given the
    /// instance's own handle.
    #[inline]
    pub const fn class_segment(self, this: InstanceId) -> Option<InstanceId> {
        match self {
            Self::ClassAnchor => Some(this),
            Self::MethodOnly => None,
            Self::Combined(cseg) => Some(cseg),
        }
    }
}
