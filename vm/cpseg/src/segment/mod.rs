//! Segment instances and shape templates.
//!
//! A segment block is a header followed by one word per storage-bearing
//! constant, at the byte offset its descriptor records. A shape keeps one
//! blank [`SegmentTemplate`]; every new instance's block is cloned from it
//! past the header.

use cpseg_heap::{HandleTable, MetaBlock, MetaRef, MetaspaceClosure, OopHandle};
use cpseg_ir::{ConstantDescriptor, InstanceId, Role, SegmentKind, ShapeId, Word, WORD_SIZE};

use crate::layout::HEADER_WORDS;

/// Blank segment block owned by a shape.
///
/// Never bound and never registered. Each storage constant's word holds
/// the constant's packed index and tag until a live instance resolves it.
#[derive(Debug)]
pub struct SegmentTemplate {
    block: MetaBlock,
}

impl SegmentTemplate {
    pub(crate) fn new(mut block: MetaBlock, descriptors: &[ConstantDescriptor]) -> Self {
        let words = block.words_mut();
        for desc in descriptors.iter().filter(|desc| desc.tag().needs_segment_storage()) {
            words[desc.offset_in_meta() as usize / WORD_SIZE] = Word::from(desc.index_and_tag());
        }
        SegmentTemplate { block }
    }

    pub fn size_in_words(&self) -> usize {
        self.block.size_in_words()
    }

    pub fn words(&self) -> &[Word] {
        self.block.words()
    }

    /// Copy the template body into a freshly allocated instance block.
    pub(crate) fn clone_into(&self, block: &mut MetaBlock) {
        block.copy_body_from(&self.block, HEADER_WORDS);
    }
}

/// One bound specialization.
///
/// Active while its reference array handle still resolves. Instances are
/// created only through a shape and live in their pool's registry.
#[derive(Debug)]
pub struct SegmentInstance {
    id: InstanceId,
    shape: ShapeId,
    role: Role,
    refs: OopHandle,
    next: Option<InstanceId>,
    block: MetaBlock,
}

impl SegmentInstance {
    pub(crate) fn new(
        id: InstanceId,
        shape: ShapeId,
        role: Role,
        refs: OopHandle,
        next: Option<InstanceId>,
        block: MetaBlock,
    ) -> Self {
        SegmentInstance {
            id,
            shape,
            role,
            refs,
            next,
            block,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: InstanceId) {
        self.id = id;
    }

    /// Shape this instance was cloned from.
    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn param_kind(&self) -> SegmentKind {
        self.role.kind()
    }

    #[inline]
    pub fn is_class(&self) -> bool {
        matches!(self.role, Role::ClassAnchor)
    }

    #[inline]
    pub fn has_class(&self) -> bool {
        self.param_kind().has_class()
    }

    #[inline]
    pub fn has_method(&self) -> bool {
        self.param_kind().has_method()
    }

    /// Class segment of this binding: itself for a class anchor, the
    /// enclosing instance for a combined one, `None` for method-only.
    pub fn class_segment(&self) -> Option<InstanceId> {
        self.role.class_segment(self.id)
    }

    /// Handle rooting this instance's reference array.
    pub fn refs(&self) -> &OopHandle {
        &self.refs
    }

    /// Next (older) instance of the same shape.
    pub fn next(&self) -> Option<InstanceId> {
        self.next
    }

    pub fn size_in_words(&self) -> usize {
        self.block.size_in_words()
    }

    pub fn words(&self) -> &[Word] {
        self.block.words()
    }

    /// The block word `desc` points at.
    pub fn meta_word(&self, desc: &ConstantDescriptor) -> Word {
        self.block.words()[desc.offset_in_meta() as usize / WORD_SIZE]
    }

    /// Whether the reference array is still rooted in `handles`.
    pub fn is_active(&self, handles: &HandleTable) -> bool {
        handles.resolve(&self.refs).is_some()
    }

    /// Present every metadata link this instance holds to `it`.
    ///
    /// Pushes the shape, then the list successor, then the class segment
    /// link: the enclosing instance for a combined segment, the instance's
    /// own id for a class anchor. The reference array is a heap root and is
    /// not pushed.
    pub fn metaspace_pointers_do(&mut self, it: &mut dyn MetaspaceClosure) {
        tracing::trace!(id = ?self.id, shape = ?self.shape, "iter(SegmentInstance)");
        it.push(MetaRef::Shape(&mut self.shape));
        if let Some(next) = &mut self.next {
            it.push(MetaRef::Segment(next));
        }
        match &mut self.role {
            Role::ClassAnchor => it.push(MetaRef::Segment(&mut self.id)),
            Role::Combined(cseg) => it.push(MetaRef::Segment(cseg)),
            Role::MethodOnly => {}
        }
    }
}
