//! Inputs to shape construction.

use cpseg_ir::{CpIndex, FieldIndex, MethodId, SegmentKind, ShapeId};

/// Everything needed to build one shape.
///
/// `parameter` is always part of the shape, whether or not `constants`
/// lists it. Duplicate constant indices are collapsed during measurement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeRequest {
    pub segnum: ShapeId,
    pub kind: SegmentKind,
    pub parameter: CpIndex,
    /// Class shape whose instances enclose this one. Combined kinds only.
    pub enclosing: Option<ShapeId>,
    pub fields: Vec<FieldIndex>,
    pub methods: Vec<MethodId>,
    pub constants: Vec<CpIndex>,
}

impl ShapeRequest {
    fn new(segnum: ShapeId, kind: SegmentKind, parameter: CpIndex) -> Self {
        ShapeRequest {
            segnum,
            kind,
            parameter,
            enclosing: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// A type specialization.
    pub fn class(segnum: ShapeId, parameter: CpIndex) -> Self {
        Self::new(segnum, SegmentKind::Class, parameter)
    }

    /// A method specialization with no class component.
    pub fn method_only(segnum: ShapeId, parameter: CpIndex) -> Self {
        Self::new(segnum, SegmentKind::MethodOnly, parameter)
    }

    /// A method specialization nested in instances of `enclosing`.
    pub fn method_and_class(segnum: ShapeId, parameter: CpIndex, enclosing: ShapeId) -> Self {
        let mut request = Self::new(segnum, SegmentKind::MethodAndClass, parameter);
        request.enclosing = Some(enclosing);
        request
    }

    #[must_use]
    pub fn with_constants(mut self, constants: impl IntoIterator<Item = CpIndex>) -> Self {
        self.constants.extend(constants);
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldIndex>) -> Self {
        self.fields.extend(fields);
        self
    }

    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = MethodId>) -> Self {
        self.methods.extend(methods);
        self
    }
}
