//! Durable, relocation-safe handles into the managed heap.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::HeapRef;

/// Root slot owned by a class-loading unit.
///
/// Deliberately neither `Clone` nor `Copy`: a handle is released exactly
/// once, by value, through [`HandleTable::remove_handle`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct OopHandle(u32);

impl OopHandle {
    /// Get the raw slot number.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Table of heap roots owned by one class-loading unit.
///
/// The heap scans this table as part of its own root set; resolving a
/// handle always yields the referent's current location.
#[derive(Default)]
pub struct HandleTable {
    slots: RwLock<Vec<Option<HeapRef>>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root `value` and return a handle to it.
    pub fn add_handle(&self, value: HeapRef) -> OopHandle {
        let mut slots = self.slots.write();
        #[allow(
            clippy::cast_possible_truncation,
            reason = "a loader roots far fewer than u32::MAX objects"
        )]
        let raw = slots.len() as u32;
        slots.push(Some(value));
        self.acquired.fetch_add(1, Ordering::AcqRel);
        OopHandle(raw)
    }

    /// Drop the root held by `handle`.
    pub fn remove_handle(&self, handle: OopHandle) {
        let mut slots = self.slots.write();
        let slot = &mut slots[handle.0 as usize];
        debug_assert!(slot.is_some(), "handle released twice");
        *slot = None;
        self.released.fetch_add(1, Ordering::AcqRel);
    }

    /// Current referent of `handle`, or `None` once released.
    pub fn resolve(&self, handle: &OopHandle) -> Option<HeapRef> {
        self.slots.read().get(handle.0 as usize).copied().flatten()
    }

    /// Handles ever acquired.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::Acquire)
    }

    /// Handles ever released.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::Acquire)
    }

    /// Handles currently rooting something.
    pub fn live(&self) -> usize {
        self.acquired() - self.released()
    }
}
