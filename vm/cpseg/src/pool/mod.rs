//! Constant pool owning segment shapes.
//!
//! Only what segments need is modeled: the tag table, the shapes indexed
//! by segment number, and the one lock shared by every shape's instance
//! list. Shapes are allocated during class linking through `&mut self`;
//! segments are created concurrently through `&self`.

use std::sync::Arc;

use cpseg_heap::{ArrayRef, HeapRef, LoaderData, MetaAddr, MetaspaceClosure, VmThread};
use cpseg_ir::{CpIndex, FixedRef, InstanceId, PoolId, ShapeId, Tag};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::registry::{put_slot, SegmentRegistry};
use crate::{SegmentError, SegmentInstance, Shape, ShapeDescriptor, ShapeRequest};

pub struct ConstantPool {
    id: PoolId,
    loader: Arc<LoaderData>,
    tags: Box<[Tag]>,
    shapes: Vec<Option<ShapeDescriptor>>,
    segments: RwLock<SegmentRegistry>,
}

impl ConstantPool {
    /// Create a pool over `tags`, owned by `loader`.
    ///
    /// `tags[0]` is the unused entry; valid indices start at 1.
    pub fn new(loader: Arc<LoaderData>, tags: impl Into<Box<[Tag]>>) -> Self {
        ConstantPool {
            id: loader.next_pool_id(),
            loader,
            tags: tags.into(),
            shapes: Vec::new(),
            segments: RwLock::new(SegmentRegistry::new()),
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn loader(&self) -> &LoaderData {
        &self.loader
    }

    /// Number of entries, including the unused entry 0.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Tag of entry `index`.
    ///
    /// # Panics
    ///
    /// If `index` is not below `len()`.
    pub fn tag_at(&self, index: CpIndex) -> Tag {
        self.tags[index.index()]
    }

    pub fn is_within_bounds(&self, index: CpIndex) -> bool {
        index.index() != 0 && index.index() < self.tags.len()
    }

    /// Build and store the shape described by `request`.
    ///
    /// On error nothing is stored and the loader's arena is unchanged.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(pool = self.id.raw(), segnum = request.segnum.segnum(), kind = ?request.kind)
    )]
    pub fn allocate_shape(
        &mut self,
        thread: &VmThread,
        request: ShapeRequest,
    ) -> Result<ShapeId, SegmentError> {
        let segnum = request.segnum;
        if !segnum.is_valid() {
            return Err(SegmentError::InvalidSegnum(segnum));
        }
        if self.descriptor(segnum).is_some() {
            return Err(SegmentError::ShapeSlotOccupied(segnum));
        }

        let enclosing_ok = match request.enclosing {
            Some(enclosing) => {
                request.kind.has_both()
                    && self
                        .descriptor(enclosing)
                        .is_some_and(ShapeDescriptor::is_class)
            }
            None => !request.kind.has_both(),
        };
        if !enclosing_ok {
            return Err(SegmentError::EnclosingShape {
                segnum,
                enclosing: request.enclosing,
            });
        }

        let desc = ShapeDescriptor::allocate(&self.loader, thread, self.id, &self.tags, request)?;

        let slot = segnum.slot();
        if slot >= self.shapes.len() {
            self.shapes.resize_with(slot + 1, || None);
        }
        self.shapes[slot] = Some(desc);

        tracing::debug!("allocated shape");
        Ok(segnum)
    }

    pub fn shape(&self, segnum: ShapeId) -> Option<Shape<'_>> {
        self.descriptor(segnum).map(|desc| Shape::new(self, desc))
    }

    /// Allocated shapes in segment-number order.
    pub fn shapes(&self) -> impl Iterator<Item = Shape<'_>> {
        self.shapes
            .iter()
            .flatten()
            .map(move |desc| Shape::new(self, desc))
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.iter().flatten().count()
    }

    /// Read access to instance `id`.
    ///
    /// Holds the pool's registry lock for as long as the guard lives; drop
    /// it before creating segments on the same thread.
    pub fn segment(&self, id: InstanceId) -> Option<MappedRwLockReadGuard<'_, SegmentInstance>> {
        RwLockReadGuard::try_map(self.segments.read(), |registry| registry.get(id)).ok()
    }

    /// Instances of all shapes in this pool.
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Whether `id` exists and its reference array is still rooted.
    pub fn is_active(&self, id: InstanceId) -> bool {
        self.segments
            .read()
            .get(id)
            .is_some_and(|seg| seg.is_active(self.loader.handles()))
    }

    /// Current location of instance `id`'s reference array.
    pub fn refs_array(&self, id: InstanceId) -> Option<ArrayRef> {
        let registry = self.segments.read();
        let seg = registry.get(id)?;
        self.loader.handles().resolve(seg.refs())?.as_array()
    }

    /// The argument instance `id` is bound to.
    pub fn argument(&self, id: InstanceId) -> Option<HeapRef> {
        let refs = self.refs_array(id)?;
        self.loader.heap().obj_at(refs, FixedRef::ARGUMENT)
    }

    /// The enclosing class segment's reference array, for combined
    /// instances.
    pub fn class_refs(&self, id: InstanceId) -> Option<ArrayRef> {
        let has_both = self.segment(id)?.param_kind().has_both();
        if !has_both {
            return None;
        }
        let refs = self.refs_array(id)?;
        self.loader.heap().obj_at(refs, FixedRef::CLASS_REFS)?.as_array()
    }

    /// Present every metadata link held by this pool's shapes and
    /// instances to `it`. Shapes go first, in segment-number order.
    ///
    /// Afterwards the pool, its shapes and its instances are re-keyed to
    /// wherever `it` forwarded them, so lookups and list traversal use the
    /// new addresses.
    ///
    /// # Panics
    ///
    /// If two shapes or two instances are forwarded to the same address,
    /// or a shape to segment number 0.
    pub fn metaspace_pointers_do(&mut self, it: &mut dyn MetaspaceClosure) {
        tracing::trace!(pool = ?self.id, "iter(ConstantPool segments)");
        let registry = self.segments.get_mut();
        for desc in self.shapes.iter_mut().flatten() {
            let head = registry.head_mut(desc.segnum());
            desc.metaspace_pointers_do(head, it);
        }
        for seg in registry.instances_mut() {
            seg.metaspace_pointers_do(it);
        }
        self.relocate(it);
    }

    fn relocate(&mut self, it: &dyn MetaspaceClosure) {
        if let Some(MetaAddr::Pool(id)) = it.forwardee(MetaAddr::Pool(self.id)) {
            tracing::debug!(from = ?self.id, to = ?id, "pool moved");
            self.id = id;
        }

        let shape_to = |segnum: ShapeId| match it.forwardee(MetaAddr::Shape(segnum)) {
            Some(MetaAddr::Shape(to)) => to,
            _ => segnum,
        };
        let segment_to = |id: InstanceId| match it.forwardee(MetaAddr::Segment(id)) {
            Some(MetaAddr::Segment(to)) => to,
            _ => id,
        };

        let mut shapes = Vec::with_capacity(self.shapes.len());
        for mut desc in std::mem::take(&mut self.shapes).into_iter().flatten() {
            let from = desc.segnum();
            let to = shape_to(from);
            assert!(to.is_valid(), "{from:?} forwarded to segment number 0");
            desc.set_segnum(to);
            put_slot(&mut shapes, to.slot(), desc, "shape");
        }
        self.shapes = shapes;
        self.segments.get_mut().rekey(shape_to, segment_to);
    }

    pub(crate) fn registry(&self) -> &RwLock<SegmentRegistry> {
        &self.segments
    }

    fn descriptor(&self, segnum: ShapeId) -> Option<&ShapeDescriptor> {
        if !segnum.is_valid() {
            return None;
        }
        self.shapes.get(segnum.slot())?.as_ref()
    }
}

impl std::fmt::Debug for ConstantPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantPool")
            .field("id", &self.id)
            .field("len", &self.tags.len())
            .field("shapes", &self.shape_count())
            .field("segments", &self.segment_count())
            .finish_non_exhaustive()
    }
}
