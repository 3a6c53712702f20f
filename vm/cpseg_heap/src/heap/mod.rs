//! Managed heap holding reference arrays.
//!
//! Only the one object shape segments need is modeled: arrays of nullable
//! references. Array identity is an [`ArrayRef`]; ordinary objects are
//! opaque [`ObjectRef`] values supplied by the caller.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::{AllocFailure, FailPoint, VmThread};

/// Opaque reference to an ordinary heap object (e.g. a type witness).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ObjectRef(pub u64);

/// Reference to a reference array in the managed heap.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ArrayRef(u32);

impl ArrayRef {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Any value a reference slot can hold.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum HeapRef {
    Object(ObjectRef),
    Array(ArrayRef),
}

impl HeapRef {
    /// Shorthand for an opaque object reference.
    pub const fn object(raw: u64) -> Self {
        HeapRef::Object(ObjectRef(raw))
    }

    /// The array this reference denotes, if it is one.
    pub const fn as_array(self) -> Option<ArrayRef> {
        match self {
            HeapRef::Array(array) => Some(array),
            HeapRef::Object(_) => None,
        }
    }
}

/// Garbage-collected heap shared by class-loading units.
///
/// Budgeted in reference slots. Collection is out of scope: arrays stay
/// allocated, and liveness is tracked by the handle tables that root them.
pub struct ManagedHeap {
    arrays: RwLock<Vec<Box<[Option<HeapRef>]>>>,
    limit: Option<usize>,
    used_slots: AtomicUsize,
    fail_next: Mutex<Option<FailPoint>>,
}

impl ManagedHeap {
    /// Create an unbounded heap.
    pub fn new() -> Self {
        Self::with_limit(None)
    }

    /// Create a heap with an optional slot budget.
    pub fn with_limit(limit: Option<usize>) -> Self {
        ManagedHeap {
            arrays: RwLock::new(Vec::new()),
            limit,
            used_slots: AtomicUsize::new(0),
            fail_next: Mutex::new(None),
        }
    }

    /// Allocate a reference array of `length` null slots.
    pub fn new_obj_array(&self, thread: &VmThread, length: u32) -> Result<ArrayRef, AllocFailure> {
        thread.check_termination()?;

        let requested = length as usize;
        if let Some(point) = self.fail_next.lock().take() {
            tracing::debug!(?point, length, "injected heap failure");
            return Err(match point {
                FailPoint::Exhausted => AllocFailure::HeapExhausted {
                    requested,
                    available: self.available(),
                },
                FailPoint::Terminated => AllocFailure::AsyncTermination,
            });
        }

        if let Some(limit) = self.limit {
            self.used_slots
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                    used.checked_add(requested).filter(|&total| total <= limit)
                })
                .map_err(|used| {
                    tracing::debug!(length, used, limit, "heap exhausted");
                    AllocFailure::HeapExhausted {
                        requested,
                        available: limit.saturating_sub(used),
                    }
                })?;
        } else {
            self.used_slots.fetch_add(requested, Ordering::AcqRel);
        }

        let mut arrays = self.arrays.write();
        let id = u32::try_from(arrays.len()).map_err(|_| AllocFailure::HeapExhausted {
            requested,
            available: 0,
        })?;
        arrays.push(vec![None; requested].into_boxed_slice());
        Ok(ArrayRef(id))
    }

    /// Number of slots in `array`.
    pub fn length(&self, array: ArrayRef) -> u32 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "lengths are created from u32 in new_obj_array"
        )]
        let len = self.arrays.read()[array.index()].len() as u32;
        len
    }

    /// Read slot `index` of `array`.
    pub fn obj_at(&self, array: ArrayRef, index: u32) -> Option<HeapRef> {
        self.arrays.read()[array.index()][index as usize]
    }

    /// Write slot `index` of `array`.
    pub fn obj_at_put(&self, array: ArrayRef, index: u32, value: Option<HeapRef>) {
        self.arrays.write()[array.index()][index as usize] = value;
    }

    /// Make the next array allocation fail as described by `point`.
    pub fn fail_next_allocation(&self, point: FailPoint) {
        *self.fail_next.lock() = Some(point);
    }

    /// Number of arrays ever allocated.
    pub fn arrays_allocated(&self) -> usize {
        self.arrays.read().len()
    }

    fn available(&self) -> usize {
        match self.limit {
            Some(limit) => limit.saturating_sub(self.used_slots.load(Ordering::Acquire)),
            None => usize::MAX,
        }
    }
}

impl Default for ManagedHeap {
    fn default() -> Self {
        Self::new()
    }
}
