//! Per-pool segment registry.
//!
//! All instances of all shapes of one pool live in a single arena indexed
//! by [`InstanceId`]. Each shape's instances form a singly-linked list
//! threaded through `SegmentInstance::next`, newest first. Nodes are never
//! removed, so a list read under one lock acquisition stays valid after
//! the lock is released.
//!
//! Relocation may leave gaps: an instance forwarded to a higher id keeps
//! that id, and new instances are numbered past the highest slot.

use cpseg_heap::{MetaBlock, OopHandle};
use cpseg_ir::{InstanceId, Role, ShapeId};

use crate::SegmentInstance;

#[derive(Debug, Default)]
pub(crate) struct SegmentRegistry {
    instances: Vec<Option<SegmentInstance>>,
    /// List head per shape, indexed by `ShapeId::slot`.
    heads: Vec<Option<InstanceId>>,
}

impl SegmentRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store a new instance of `shape` and make it the shape's list head.
    pub(crate) fn register(
        &mut self,
        shape: ShapeId,
        role: Role,
        refs: OopHandle,
        block: MetaBlock,
    ) -> InstanceId {
        let id = InstanceId::from_index(self.instances.len());

        let head = self.head_mut(shape);
        let next = head.replace(id);
        self.instances
            .push(Some(SegmentInstance::new(id, shape, role, refs, next, block)));
        id
    }

    pub(crate) fn get(&self, id: InstanceId) -> Option<&SegmentInstance> {
        self.instances.get(id.index())?.as_ref()
    }

    pub(crate) fn head(&self, shape: ShapeId) -> Option<InstanceId> {
        self.heads.get(shape.slot()).copied().flatten()
    }

    /// Mutable list head of `shape`, growing the table if needed.
    pub(crate) fn head_mut(&mut self, shape: ShapeId) -> &mut Option<InstanceId> {
        let slot = shape.slot();
        if slot >= self.heads.len() {
            self.heads.resize(slot + 1, None);
        }
        &mut self.heads[slot]
    }

    pub(crate) fn len(&self) -> usize {
        self.instances.iter().flatten().count()
    }

    pub(crate) fn instances_mut(&mut self) -> impl Iterator<Item = &mut SegmentInstance> {
        self.instances.iter_mut().flatten()
    }

    /// Move every list head and instance to the key `shape`/`segment` map
    /// it to. Links inside the instances are left alone.
    ///
    /// # Panics
    ///
    /// If two heads or two instances land on the same key.
    pub(crate) fn rekey(
        &mut self,
        shape: impl Fn(ShapeId) -> ShapeId,
        segment: impl Fn(InstanceId) -> InstanceId,
    ) {
        let mut heads = Vec::with_capacity(self.heads.len());
        for (slot, head) in std::mem::take(&mut self.heads).into_iter().enumerate() {
            if let Some(head) = head {
                let to = shape(ShapeId::from_slot(slot));
                put_slot(&mut heads, to.slot(), head, "list head");
            }
        }
        self.heads = heads;

        let mut instances = Vec::with_capacity(self.instances.len());
        for (index, seg) in std::mem::take(&mut self.instances).into_iter().enumerate() {
            if let Some(mut seg) = seg {
                let to = segment(InstanceId::from_index(index));
                seg.set_id(to);
                put_slot(&mut instances, to.index(), seg, "segment");
            }
        }
        self.instances = instances;
    }
}

/// Store `value` at `slot`, growing `table` as needed.
///
/// # Panics
///
/// If `slot` is already occupied.
pub(crate) fn put_slot<T>(table: &mut Vec<Option<T>>, slot: usize, value: T, what: &str) {
    if slot >= table.len() {
        table.resize_with(slot + 1, || None);
    }
    assert!(table[slot].is_none(), "two {what}s forwarded to slot {slot}");
    table[slot] = Some(value);
}
