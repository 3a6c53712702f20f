//! Index handles for constant-pool entries and metadata objects.
//!
//! Shapes, segment instances and pools never point at each other
//! directly. They hold one of these handles, which an arena resolves:
//! - Memory: 2-4 bytes per link instead of 8
//! - Relocation: a visitor rewrites the handle in place
//! - Equality: O(1) integer compare

use std::fmt;

/// Index into a constant pool (1-based; 0 is never a valid entry).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct CpIndex(u16);

impl CpIndex {
    /// Create a new constant-pool index.
    #[inline]
    pub const fn new(index: u16) -> Self {
        CpIndex(index)
    }

    /// Get the index as a table offset.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Get the raw u16 value.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for CpIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 1-based segment number identifying one shape within its pool.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct ShapeId(u32);

impl ShapeId {
    /// The first valid segment number.
    pub const FIRST: ShapeId = ShapeId(1);

    /// Create a shape id from a 1-based segment number.
    #[inline]
    pub const fn new(segnum: u32) -> Self {
        ShapeId(segnum)
    }

    /// Get the 1-based segment number.
    #[inline]
    pub const fn segnum(self) -> u32 {
        self.0
    }

    /// Check that this is a usable (non-zero) segment number.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Shape id stored at 0-based `slot` of a per-pool shape table.
    ///
    /// # Panics
    ///
    /// If `slot + 1` does not fit in a `u32`.
    #[inline]
    pub fn from_slot(slot: usize) -> Self {
        match u32::try_from(slot).ok().and_then(|slot| slot.checked_add(1)) {
            Some(segnum) => ShapeId(segnum),
            None => panic!("shape slot {slot} out of range"),
        }
    }

    /// Get the 0-based slot in a per-pool shape table.
    ///
    /// Only meaningful when `is_valid()`.
    #[inline]
    pub const fn slot(self) -> usize {
        self.0.saturating_sub(1) as usize
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeId({})", self.0)
    }
}

/// Handle of one segment instance in its pool's registry.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct InstanceId(u32);

impl InstanceId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        InstanceId(index)
    }

    /// Instance id for registry position `index`.
    ///
    /// # Panics
    ///
    /// If `index` does not fit in a `u32`.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(raw) => InstanceId(raw),
            Err(_) => panic!("instance index {index} out of range"),
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

/// Handle of a constant pool within its class-loading unit.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct PoolId(u32);

impl PoolId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        PoolId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolId({})", self.0)
    }
}

/// Index into the class's field table.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct FieldIndex(pub u16);

/// Identity of a method in the class's method table.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct MethodId(pub u32);
