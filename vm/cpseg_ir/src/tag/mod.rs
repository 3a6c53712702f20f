//! Constant kind tag.
//!
//! Each constant pool entry has a `Tag` that identifies its kind. Segment
//! layout only admits four of them; everything else is rejected when a
//! shape is measured.
//!
//! # Tag Values
//!
//! Values follow the class-file numbering:
//! - 1-20: standard constant kinds
//! - 21: `Parameter`, the binding slot that leads every segment
//! - 22: `Linkage`, a placeholder resolved per segment

use std::fmt;

/// Constant kind discriminant.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Unused slot (index 0, and the second half of long/double).
    Invalid = 0,
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    /// Method handle constant. Needs per-segment storage.
    MethodHandle = 15,
    MethodType = 16,
    /// Dynamically-computed constant. Needs per-segment storage.
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
    /// Lead binding of a segment. Always sorts first.
    Parameter = 21,
    /// Linkage placeholder. Needs per-segment storage.
    Linkage = 22,
}

impl Tag {
    /// Decode a raw tag byte.
    pub const fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Invalid,
            1 => Self::Utf8,
            3 => Self::Integer,
            4 => Self::Float,
            5 => Self::Long,
            6 => Self::Double,
            7 => Self::Class,
            8 => Self::String,
            9 => Self::FieldRef,
            10 => Self::MethodRef,
            11 => Self::InterfaceMethodRef,
            12 => Self::NameAndType,
            15 => Self::MethodHandle,
            16 => Self::MethodType,
            17 => Self::Dynamic,
            18 => Self::InvokeDynamic,
            19 => Self::Module,
            20 => Self::Package,
            21 => Self::Parameter,
            22 => Self::Linkage,
            _ => return None,
        })
    }

    /// Get the raw tag byte.
    #[inline]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Check if this is the segment's lead parameter.
    #[inline]
    pub const fn is_parameter(self) -> bool {
        matches!(self, Self::Parameter)
    }

    /// Check if each segment needs its own word and reference slot for
    /// a constant of this kind.
    #[inline]
    pub const fn needs_segment_storage(self) -> bool {
        matches!(self, Self::Dynamic | Self::MethodHandle | Self::Linkage)
    }

    /// Check if a constant of this kind may appear in a segment at all.
    #[inline]
    pub const fn is_segment_member(self) -> bool {
        self.is_parameter() || self.needs_segment_storage()
    }

    /// Ordering class used to group tags inside a shape.
    ///
    /// Linkage placeholders collapse to 0 so they cluster right after the
    /// parameter; every other tag orders by its raw value.
    #[inline]
    pub const fn order_class(self) -> u8 {
        match self {
            Self::Linkage => 0,
            _ => self.raw(),
        }
    }

    /// Get the human-readable name of this tag.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::Utf8 => "Utf8",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::Class => "Class",
            Self::String => "String",
            Self::FieldRef => "Fieldref",
            Self::MethodRef => "Methodref",
            Self::InterfaceMethodRef => "InterfaceMethodref",
            Self::NameAndType => "NameAndType",
            Self::MethodHandle => "MethodHandle",
            Self::MethodType => "MethodType",
            Self::Dynamic => "Dynamic",
            Self::InvokeDynamic => "InvokeDynamic",
            Self::Module => "Module",
            Self::Package => "Package",
            Self::Parameter => "Parameter",
            Self::Linkage => "Linkage",
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.raw())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
