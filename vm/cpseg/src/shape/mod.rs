//! Segment shapes.
//!
//! A [`ShapeDescriptor`] is the frozen layout shared by every segment of
//! one kind in one pool: the info block holding the placed constant
//! descriptors and the parametric field and method tables, the sizes they
//! imply, and a blank template segment. [`Shape`] pairs a descriptor with
//! its pool; segment creation and list traversal go through it.
//!
//! # Allocation
//!
//! A shape takes two arena blocks, the info block then the template. If
//! either allocation or the placement pass fails, every block already
//! taken is returned to the arena before the error propagates.

mod create;
mod info;

use std::fmt;
use std::iter::FusedIterator;
use std::ops::Deref;

use cpseg_heap::{LoaderData, MetaArena, MetaBlock, MetaKind, MetaRef, MetaspaceClosure, VmThread};
use cpseg_ir::{
    ConstantDescriptor, CpIndex, FieldIndex, InstanceId, MethodId, PoolId, SegmentKind,
    ShapeFlags, ShapeId, Tag, Word,
};

use self::info::ShapeInfo;

use crate::layout::{measure, place, Offsets, ShapeRequest};
use crate::{ConstantPool, SegmentError, SegmentTemplate};

/// Frozen layout of one segment kind.
#[derive(Debug)]
pub struct ShapeDescriptor {
    pool: PoolId,
    segnum: ShapeId,
    kind: SegmentKind,
    enclosing: Option<ShapeId>,
    totals: Offsets,
    descriptors: Box<[ConstantDescriptor]>,
    info: ShapeInfo,
    template: SegmentTemplate,
}

impl ShapeDescriptor {
    /// Measure, allocate and place a shape for `request`.
    ///
    /// Either returns a complete shape or leaves the loader's arena exactly
    /// as it found it.
    pub(crate) fn allocate(
        loader: &LoaderData,
        thread: &VmThread,
        pool: PoolId,
        tags: &[Tag],
        request: ShapeRequest,
    ) -> Result<Self, SegmentError> {
        let layout = measure(tags, &request)?;
        let arena = loader.arena();

        let info = BlockGuard::new(
            arena,
            arena.allocate(thread, MetaKind::ShapeInfo, layout.info_size_in_words())?,
        );
        let template = BlockGuard::new(
            arena,
            arena.allocate(thread, MetaKind::Segment, layout.segment_size_in_words())?,
        );

        let mut descriptors =
            vec![ConstantDescriptor::default(); layout.constant_count()].into_boxed_slice();
        let totals = place(&layout, &mut descriptors)?;
        let template = SegmentTemplate::new(template.commit(), &descriptors);
        let info = ShapeInfo::encode(
            info.commit(),
            request.kind,
            totals,
            &descriptors,
            &request.fields,
            &request.methods,
        );

        Ok(ShapeDescriptor {
            pool,
            segnum: request.segnum,
            kind: request.kind,
            enclosing: request.enclosing,
            totals,
            descriptors,
            info,
            template,
        })
    }

    /// Owning pool.
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn segnum(&self) -> ShapeId {
        self.segnum
    }

    pub(crate) fn set_segnum(&mut self, segnum: ShapeId) {
        self.segnum = segnum;
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn flags(&self) -> ShapeFlags {
        self.kind.flags()
    }

    pub fn is_class(&self) -> bool {
        self.flags() == ShapeFlags::HAS_CLASS_ENTRIES
    }

    pub fn is_method_only(&self) -> bool {
        self.flags() == ShapeFlags::HAS_METHOD_ENTRIES
    }

    pub fn is_method_and_class(&self) -> bool {
        self.flags() == ShapeFlags::all()
    }

    pub fn has_class(&self) -> bool {
        self.flags().contains(ShapeFlags::HAS_CLASS_ENTRIES)
    }

    pub fn has_method(&self) -> bool {
        self.flags().contains(ShapeFlags::HAS_METHOD_ENTRIES)
    }

    pub fn has_both(&self) -> bool {
        self.is_method_and_class()
    }

    /// Class shape whose instances enclose this shape's instances.
    pub fn enclosing_shape(&self) -> Option<ShapeId> {
        self.enclosing
    }

    pub fn constant_info_count(&self) -> usize {
        self.info.constant_count()
    }

    /// Descriptor at `subidx` in placement order, read from the info block.
    ///
    /// # Panics
    ///
    /// If `subidx` is not below `constant_info_count()`.
    pub fn constant_info_at(&self, subidx: usize) -> ConstantDescriptor {
        self.info.descriptor(subidx)
    }

    pub fn constant_infos(&self) -> &[ConstantDescriptor] {
        &self.descriptors
    }

    /// The lead parameter's descriptor.
    pub fn parameter(&self) -> ConstantDescriptor {
        self.info.descriptor(ConstantDescriptor::PARAMETER_SUBINDEX)
    }

    /// Descriptor of the constant at pool index `index`, if included.
    pub fn find_constant(&self, index: CpIndex) -> Option<ConstantDescriptor> {
        self.descriptors.iter().copied().find(|desc| desc.index() == index)
    }

    /// Parametric field indices, in request order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldIndex> + '_ {
        (0..self.info.field_count()).map(|i| self.info.field(i))
    }

    /// Parametric methods, in request order.
    pub fn methods(&self) -> impl ExactSizeIterator<Item = MethodId> + '_ {
        (0..self.info.method_count()).map(|i| self.info.method(i))
    }

    /// Length of every instance's reference array.
    pub fn refs_length(&self) -> u32 {
        self.totals.refs
    }

    pub fn info_size_in_words(&self) -> usize {
        self.info.size_in_words()
    }

    /// Raw words of the info block.
    pub fn info_words(&self) -> &[Word] {
        self.info.words()
    }

    /// Size of every instance's metadata block.
    pub fn segment_size_in_words(&self) -> usize {
        self.template.size_in_words()
    }

    pub fn template(&self) -> &SegmentTemplate {
        &self.template
    }

    /// Present every metadata link this shape holds to `it`.
    ///
    /// `list_head` is this shape's instance list head, which the pool's
    /// registry stores. Pushes the pool, the head, then the enclosing
    /// class shape.
    pub fn metaspace_pointers_do(
        &mut self,
        list_head: &mut Option<InstanceId>,
        it: &mut dyn MetaspaceClosure,
    ) {
        tracing::trace!(segnum = ?self.segnum, kind = ?self.kind, "iter(ShapeDescriptor)");
        it.push(MetaRef::Pool(&mut self.pool));
        if let Some(head) = list_head {
            it.push(MetaRef::Segment(head));
        }
        if let Some(enclosing) = &mut self.enclosing {
            it.push(MetaRef::Shape(enclosing));
        }
    }
}

/// A shape together with the pool that owns it.
#[derive(Copy, Clone)]
pub struct Shape<'a> {
    pool: &'a ConstantPool,
    desc: &'a ShapeDescriptor,
}

impl<'a> Shape<'a> {
    pub(crate) fn new(pool: &'a ConstantPool, desc: &'a ShapeDescriptor) -> Self {
        Shape { pool, desc }
    }

    pub fn descriptor(&self) -> &'a ShapeDescriptor {
        self.desc
    }

    /// Newest instance of this shape.
    pub fn first(&self) -> Option<InstanceId> {
        self.pool.registry().read().head(self.desc.segnum)
    }

    /// Instance created just before `id`.
    ///
    /// # Panics
    ///
    /// If `id` is not an instance of this shape.
    pub fn next(&self, id: InstanceId) -> Option<InstanceId> {
        let registry = self.pool.registry().read();
        match registry.get(id) {
            Some(seg) if seg.shape() == self.desc.segnum => seg.next(),
            _ => panic!("{id:?} is not a segment of {:?}", self.desc.segnum),
        }
    }

    /// All instances of this shape, newest first.
    pub fn segments(&self) -> Segments<'a> {
        Segments {
            shape: *self,
            cursor: self.first(),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }
}

impl Deref for Shape<'_> {
    type Target = ShapeDescriptor;

    fn deref(&self) -> &ShapeDescriptor {
        self.desc
    }
}

impl fmt::Debug for Shape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("pool", &self.desc.pool)
            .field("segnum", &self.desc.segnum)
            .field("kind", &self.desc.kind)
            .finish_non_exhaustive()
    }
}

/// Iterator over a shape's instance list.
///
/// Each step takes the pool's registry lock on its own; instances
/// registered mid-iteration are not seen.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    shape: Shape<'a>,
    cursor: Option<InstanceId>,
}

impl Iterator for Segments<'_> {
    type Item = InstanceId;

    fn next(&mut self) -> Option<InstanceId> {
        let id = self.cursor?;
        self.cursor = self.shape.next(id);
        Some(id)
    }
}

impl FusedIterator for Segments<'_> {}

/// Arena block returned to its arena unless committed.
struct BlockGuard<'a> {
    arena: &'a MetaArena,
    block: Option<MetaBlock>,
}

impl<'a> BlockGuard<'a> {
    fn new(arena: &'a MetaArena, block: MetaBlock) -> Self {
        BlockGuard {
            arena,
            block: Some(block),
        }
    }

    fn commit(mut self) -> MetaBlock {
        match self.block.take() {
            Some(block) => block,
            None => unreachable!("block guard committed twice"),
        }
    }
}

impl Drop for BlockGuard<'_> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            tracing::debug!(
                kind = ?block.kind(),
                words = block.size_in_words(),
                "returning block after failed shape allocation"
            );
            self.arena.deallocate(block);
        }
    }
}

#[cfg(test)]
mod tests;
