//! Segment creation.
//!
//! The heap array comes first, rooted through a handle held by a
//! [`RefsGuard`]. The metadata block comes second; if it cannot be had,
//! the guard releases the handle before the failure leaves
//! `create_segment`. Only a fully built instance reaches the registry, and
//! the registry lock is held for the splice alone.

use cpseg_heap::{AllocFailure, HandleTable, HeapRef, MetaKind, OopHandle, VmThread};
use cpseg_ir::{FixedRef, InstanceId, Role};

use super::Shape;

impl Shape<'_> {
    /// Bind a new class segment to `argument`.
    ///
    /// # Panics
    ///
    /// If this is not a class-only shape.
    pub fn new_class_segment(
        &self,
        thread: &VmThread,
        argument: HeapRef,
    ) -> Result<InstanceId, AllocFailure> {
        assert!(
            self.is_class(),
            "new_class_segment on {:?} shape {:?}",
            self.kind(),
            self.segnum()
        );
        self.create_segment(thread, argument, None)
    }

    /// Bind a new method segment to `argument`.
    ///
    /// `enclosing` must name an active instance of this shape's enclosing
    /// class shape when the shape is combined, and must be `None`
    /// otherwise.
    ///
    /// # Panics
    ///
    /// If this shape has no method component, or `enclosing` does not
    /// satisfy the rule above.
    pub fn new_method_segment(
        &self,
        thread: &VmThread,
        argument: HeapRef,
        enclosing: Option<InstanceId>,
    ) -> Result<InstanceId, AllocFailure> {
        assert!(
            self.has_method(),
            "new_method_segment on {:?} shape {:?}",
            self.kind(),
            self.segnum()
        );
        assert_eq!(
            enclosing.is_some(),
            self.has_both(),
            "an enclosing class segment is required exactly for combined shapes"
        );
        self.create_segment(thread, argument, enclosing)
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(segnum = self.segnum().segnum(), kind = ?self.kind())
    )]
    fn create_segment(
        &self,
        thread: &VmThread,
        argument: HeapRef,
        enclosing: Option<InstanceId>,
    ) -> Result<InstanceId, AllocFailure> {
        let loader = self.pool.loader();
        let heap = loader.heap();
        let handles = loader.handles();

        let class_refs = enclosing.map(|cseg| self.enclosing_refs(cseg));
        let role = match enclosing {
            Some(cseg) => Role::Combined(cseg),
            None if self.is_class() => Role::ClassAnchor,
            None => Role::MethodOnly,
        };

        let refs = heap.new_obj_array(thread, self.refs_length())?;
        heap.obj_at_put(refs, FixedRef::ARGUMENT, Some(argument));
        if let Some(class_refs) = class_refs {
            heap.obj_at_put(refs, FixedRef::CLASS_REFS, Some(class_refs));
        }
        let guard = RefsGuard::new(handles, handles.add_handle(HeapRef::Array(refs)));

        let mut block =
            loader
                .arena()
                .allocate(thread, MetaKind::Segment, self.segment_size_in_words())?;
        self.template().clone_into(&mut block);

        let refs = guard.commit();
        let id = self
            .pool
            .registry()
            .write()
            .register(self.segnum(), role, refs, block);

        tracing::debug!(?id, ?role, "created segment");
        Ok(id)
    }

    /// Reference array of enclosing class segment `cseg`.
    fn enclosing_refs(&self, cseg: InstanceId) -> HeapRef {
        let registry = self.pool.registry().read();
        let Some(enclosing) = registry.get(cseg) else {
            panic!("enclosing class segment {cseg:?} does not exist");
        };
        assert_eq!(
            Some(enclosing.shape()),
            self.enclosing_shape(),
            "enclosing class segment {cseg:?} belongs to another shape"
        );
        assert!(
            enclosing.is_class(),
            "enclosing segment {cseg:?} is not a class segment"
        );
        match self.pool.loader().handles().resolve(enclosing.refs()) {
            Some(refs) => refs,
            None => panic!("enclosing class segment {cseg:?} is not active"),
        }
    }
}

/// Handle released on drop unless committed.
struct RefsGuard<'a> {
    handles: &'a HandleTable,
    handle: Option<OopHandle>,
}

impl<'a> RefsGuard<'a> {
    fn new(handles: &'a HandleTable, handle: OopHandle) -> Self {
        RefsGuard {
            handles,
            handle: Some(handle),
        }
    }

    fn commit(mut self) -> OopHandle {
        match self.handle.take() {
            Some(handle) => handle,
            None => unreachable!("refs guard committed twice"),
        }
    }
}

impl Drop for RefsGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!(
                handle = handle.raw(),
                "releasing segment refs after failed metadata allocation"
            );
            self.handles.remove_handle(handle);
        }
    }
}
