//! Visitor interface for walking metadata links.
//!
//! A compaction or snapshot pass asks each metadata object to push every
//! link it holds to another metadata object. The visitor receives the
//! slot itself and may rewrite it; the object sees the new value as soon
//! as `push` returns. Heap references are not pushed here: the heap's own
//! root scan covers them through the handle tables.
//!
//! Objects held in keyed tables (a pool's shapes and segment instances)
//! are moved by their owner: after pushing its links, the owner asks
//! [`MetaspaceClosure::forwardee`] where each object went and re-keys it.

use cpseg_ir::{InstanceId, PoolId, ShapeId};
use rustc_hash::FxHashMap;

/// A mutable link slot inside a metadata object.
#[derive(Debug)]
pub enum MetaRef<'a> {
    Pool(&'a mut PoolId),
    Shape(&'a mut ShapeId),
    Segment(&'a mut InstanceId),
}

impl MetaRef<'_> {
    /// Current value of the slot.
    pub fn addr(&self) -> MetaAddr {
        match self {
            MetaRef::Pool(id) => MetaAddr::Pool(**id),
            MetaRef::Shape(id) => MetaAddr::Shape(**id),
            MetaRef::Segment(id) => MetaAddr::Segment(**id),
        }
    }

    /// Overwrite the slot. `addr` must be of the same kind.
    pub fn set(&mut self, addr: MetaAddr) {
        match (self, addr) {
            (MetaRef::Pool(slot), MetaAddr::Pool(id)) => **slot = id,
            (MetaRef::Shape(slot), MetaAddr::Shape(id)) => **slot = id,
            (MetaRef::Segment(slot), MetaAddr::Segment(id)) => **slot = id,
            (slot, addr) => panic!("cannot store {addr:?} into {:?} slot", slot.addr()),
        }
    }
}

/// Address of a metadata object.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MetaAddr {
    Pool(PoolId),
    Shape(ShapeId),
    Segment(InstanceId),
}

/// Receives every metadata link an object holds.
pub trait MetaspaceClosure {
    fn push(&mut self, slot: MetaRef<'_>);

    /// New address of the object at `addr`, if this pass moved it.
    fn forwardee(&self, _addr: MetaAddr) -> Option<MetaAddr> {
        None
    }
}

/// Records every pushed address, in push order.
///
/// Used by snapshot passes to enumerate what an object references.
#[derive(Debug, Default)]
pub struct PointerCollector {
    visited: Vec<MetaAddr>,
}

impl PointerCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> &[MetaAddr] {
        &self.visited
    }
}

impl MetaspaceClosure for PointerCollector {
    fn push(&mut self, slot: MetaRef<'_>) {
        self.visited.push(slot.addr());
    }
}

/// Rewrites links through a forwarding table.
///
/// Used by compaction passes after objects have been moved.
#[derive(Debug, Default)]
pub struct Relocator {
    forwarding: FxHashMap<MetaAddr, MetaAddr>,
    rewritten: usize,
}

impl Relocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the object at `from` now lives at `to`.
    pub fn forward(&mut self, from: MetaAddr, to: MetaAddr) {
        assert_eq!(
            std::mem::discriminant(&from),
            std::mem::discriminant(&to),
            "objects keep their kind when they move"
        );
        self.forwarding.insert(from, to);
    }

    /// Slots rewritten so far.
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }
}

impl MetaspaceClosure for Relocator {
    fn push(&mut self, mut slot: MetaRef<'_>) {
        if let Some(&to) = self.forwarding.get(&slot.addr()) {
            slot.set(to);
            self.rewritten += 1;
        }
    }

    fn forwardee(&self, addr: MetaAddr) -> Option<MetaAddr> {
        self.forwarding.get(&addr).copied()
    }
}
