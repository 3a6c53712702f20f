use std::sync::Arc;

use super::*;
use cpseg_heap::{HeapRef, PointerCollector, MetaAddr};
use cpseg_ir::{FixedRef, Role, Word};
use pretty_assertions::assert_eq;

const CLASS: ShapeId = ShapeId::new(1);
const METHOD: ShapeId = ShapeId::new(2);
const COMBINED: ShapeId = ShapeId::new(3);

fn idx(i: u16) -> CpIndex {
    CpIndex::new(i)
}

/// Parameters at #5 and #6, storage constants at #2, #3, #9, #10.
fn tags() -> Vec<Tag> {
    let mut tags = vec![Tag::Utf8; 12];
    tags[0] = Tag::Invalid;
    tags[2] = Tag::Linkage;
    tags[3] = Tag::MethodHandle;
    tags[5] = Tag::Parameter;
    tags[6] = Tag::Parameter;
    tags[9] = Tag::Dynamic;
    tags[10] = Tag::Dynamic;
    tags
}

fn pool() -> ConstantPool {
    let thread = VmThread::new();
    let mut pool = ConstantPool::new(Arc::new(LoaderData::default()), tags());
    pool.allocate_shape(
        &thread,
        ShapeRequest::class(CLASS, idx(5)).with_constants([idx(2), idx(9), idx(3)]),
    )
    .unwrap();
    pool.allocate_shape(
        &thread,
        ShapeRequest::method_only(METHOD, idx(6)).with_constants([idx(10)]),
    )
    .unwrap();
    pool.allocate_shape(
        &thread,
        ShapeRequest::method_and_class(COMBINED, idx(6), CLASS).with_constants([idx(10)]),
    )
    .unwrap();
    pool
}

#[test]
fn class_shape_accessors() {
    let pool = pool();
    let shape = pool.shape(CLASS).unwrap();

    assert_eq!(shape.pool(), pool.id());
    assert_eq!(shape.segnum(), CLASS);
    assert_eq!(shape.kind(), SegmentKind::Class);
    assert_eq!(shape.flags(), ShapeFlags::HAS_CLASS_ENTRIES);
    assert!(shape.is_class() && shape.has_class());
    assert!(!shape.has_method() && !shape.has_both() && !shape.is_method_only());
    assert_eq!(shape.enclosing_shape(), None);

    assert_eq!(shape.constant_info_count(), 4);
    assert_eq!(
        shape.parameter(),
        ConstantDescriptor::placed(idx(5), Tag::Parameter, 0, FixedRef::ARGUMENT)
    );
    assert_eq!(
        shape.constant_info_at(2),
        ConstantDescriptor::placed(idx(3), Tag::MethodHandle, 40, 2)
    );
    assert_eq!(shape.find_constant(idx(9)).map(|d| d.offset_in_refs()), Some(3));
    assert_eq!(shape.find_constant(idx(10)), None);

    assert_eq!(shape.refs_length(), 4);
    assert_eq!(shape.segment_size_in_words(), 7);
    assert_eq!(shape.info_size_in_words(), 10);
}

#[test]
fn combined_shape_accessors() {
    let pool = pool();
    let shape = pool.shape(COMBINED).unwrap();

    assert!(shape.is_method_and_class() && shape.has_both());
    assert!(shape.has_class() && shape.has_method());
    assert_eq!(shape.flags(), ShapeFlags::all());
    assert_eq!(shape.enclosing_shape(), Some(CLASS));
    assert_eq!(shape.constant_info_at(1).offset_in_refs(), FixedRef::LIMIT_WITH_CLASS);
    assert_eq!(shape.refs_length(), 3);
}

#[test]
fn template_carries_packed_constants() {
    let pool = pool();
    let shape = pool.shape(CLASS).unwrap();
    let linkage = shape.constant_info_at(1);

    assert_eq!(shape.template().size_in_words(), shape.segment_size_in_words());
    assert_eq!(shape.template().words()[4], Word::from(linkage.index_and_tag()));
}

/// Low and high 32-bit halves of an info word.
fn halves(word: Word) -> (u32, u32) {
    let bytes = word.to_le_bytes();
    (
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
    )
}

#[test]
fn info_block_holds_header_and_descriptors() {
    let pool = pool();
    let shape = pool.shape(CLASS).unwrap();
    let words = shape.info_words();

    assert_eq!(words.len(), shape.info_size_in_words());
    assert_eq!(words[0], Word::from(ShapeFlags::HAS_CLASS_ENTRIES.bits()));
    assert_eq!(words[1], 4);
    assert_eq!(words[2], 4);
    assert_eq!(words[3], 0);

    // Descriptors are 12 bytes from byte 32: P@5, L@2, MH@3, D@9.
    let param = shape.parameter();
    assert_eq!(halves(words[4]), (param.index_and_tag(), 0));
    assert_eq!(halves(words[5]).0, FixedRef::ARGUMENT);

    let linkage = ConstantDescriptor::placed(idx(2), Tag::Linkage, 32, 1);
    assert_eq!(halves(words[5]).1, linkage.index_and_tag());
    assert_eq!(halves(words[6]), (32, 1));

    let dynamic = ConstantDescriptor::placed(idx(9), Tag::Dynamic, 48, 3);
    assert_eq!(halves(words[8]).1, dynamic.index_and_tag());
    assert_eq!(halves(words[9]), (48, 3));

    for subidx in 0..shape.constant_info_count() {
        assert_eq!(shape.constant_info_at(subidx), shape.constant_infos()[subidx]);
    }
}

#[test]
fn info_block_holds_field_and_method_tables() {
    let thread = VmThread::new();
    let mut pool = ConstantPool::new(Arc::new(LoaderData::default()), tags());
    pool.allocate_shape(
        &thread,
        ShapeRequest::class(CLASS, idx(5))
            .with_constants([idx(2)])
            .with_fields([FieldIndex(7), FieldIndex(3)])
            .with_methods([MethodId(0xABCD)]),
    )
    .unwrap();
    let shape = pool.shape(CLASS).unwrap();
    let words = shape.info_words();

    // Header, two descriptors (24 bytes), two fields, one method.
    assert_eq!(shape.info_size_in_words(), 9);
    assert_eq!(words[3], 2 | (1 << 32));
    assert_eq!(halves(words[7]), (7, 3));
    assert_eq!(words[8], 0xABCD);

    assert_eq!(shape.fields().collect::<Vec<_>>(), vec![FieldIndex(7), FieldIndex(3)]);
    assert_eq!(shape.methods().collect::<Vec<_>>(), vec![MethodId(0xABCD)]);
}

#[test]
#[should_panic(expected = "sub-index 4 out of 4 constants")]
fn constant_info_past_the_end_panics() {
    let pool = pool();
    pool.shape(CLASS).unwrap().constant_info_at(4);
}

#[test]
fn class_segment_is_its_own_anchor() {
    let pool = pool();
    let thread = VmThread::new();
    let shape = pool.shape(CLASS).unwrap();

    let id = shape
        .new_class_segment(&thread, HeapRef::object(42))
        .unwrap();
    let seg = pool.segment(id).unwrap();

    assert_eq!(seg.role(), Role::ClassAnchor);
    assert_eq!(seg.class_segment(), Some(id));
    assert_eq!(seg.shape(), CLASS);
    assert_eq!(seg.size_in_words(), shape.segment_size_in_words());
    assert_eq!(seg.words(), shape.template().words());
    drop(seg);

    assert!(pool.is_active(id));
    assert_eq!(pool.argument(id), Some(HeapRef::object(42)));
    let refs = pool.refs_array(id).unwrap();
    assert_eq!(pool.loader().heap().length(refs), 4);
    assert_eq!(pool.class_refs(id), None);
}

#[test]
fn method_only_segment_has_no_class_link() {
    let pool = pool();
    let thread = VmThread::new();
    let shape = pool.shape(METHOD).unwrap();

    let id = shape
        .new_method_segment(&thread, HeapRef::object(7), None)
        .unwrap();
    let seg = pool.segment(id).unwrap();

    assert_eq!(seg.role(), Role::MethodOnly);
    assert_eq!(seg.class_segment(), None);
    assert!(!seg.has_class() && seg.has_method());
}

#[test]
fn combined_segment_links_enclosing_class() {
    let pool = pool();
    let thread = VmThread::new();
    let cseg = pool
        .shape(CLASS)
        .unwrap()
        .new_class_segment(&thread, HeapRef::object(1))
        .unwrap();

    let id = pool
        .shape(COMBINED)
        .unwrap()
        .new_method_segment(&thread, HeapRef::object(2), Some(cseg))
        .unwrap();

    let seg = pool.segment(id).unwrap();
    assert_eq!(seg.role(), Role::Combined(cseg));
    assert_eq!(seg.class_segment(), Some(cseg));
    drop(seg);

    assert_eq!(pool.class_refs(id), pool.refs_array(cseg));
    assert_eq!(pool.argument(id), Some(HeapRef::object(2)));
}

#[test]
fn list_is_newest_first() {
    let pool = pool();
    let thread = VmThread::new();
    let shape = pool.shape(CLASS).unwrap();
    assert_eq!(shape.first(), None);

    let ids: Vec<_> = (0..4)
        .map(|i| shape.new_class_segment(&thread, HeapRef::object(i)).unwrap())
        .collect();
    // Another shape's instances do not show up in this list.
    pool.shape(METHOD)
        .unwrap()
        .new_method_segment(&thread, HeapRef::object(9), None)
        .unwrap();

    assert_eq!(shape.first(), Some(ids[3]));
    assert_eq!(shape.next(ids[3]), Some(ids[2]));
    assert_eq!(shape.next(ids[0]), None);
    assert_eq!(
        shape.segments().collect::<Vec<_>>(),
        ids.iter().rev().copied().collect::<Vec<_>>()
    );
    assert_eq!(shape.segment_count(), 4);
}

#[test]
#[should_panic(expected = "is not a segment of")]
fn next_rejects_foreign_instance() {
    let pool = pool();
    let thread = VmThread::new();
    let id = pool
        .shape(METHOD)
        .unwrap()
        .new_method_segment(&thread, HeapRef::object(0), None)
        .unwrap();
    let _ = pool.shape(CLASS).unwrap().next(id);
}

#[test]
#[should_panic(expected = "new_class_segment on MethodOnly")]
fn class_segment_on_method_shape_panics() {
    let pool = pool();
    let _ = pool
        .shape(METHOD)
        .unwrap()
        .new_class_segment(&VmThread::new(), HeapRef::object(0));
}

#[test]
#[should_panic(expected = "new_method_segment on Class")]
fn method_segment_on_class_shape_panics() {
    let pool = pool();
    let _ = pool
        .shape(CLASS)
        .unwrap()
        .new_method_segment(&VmThread::new(), HeapRef::object(0), None);
}

#[test]
#[should_panic(expected = "required exactly for combined shapes")]
fn combined_without_enclosing_panics() {
    let pool = pool();
    let _ = pool
        .shape(COMBINED)
        .unwrap()
        .new_method_segment(&VmThread::new(), HeapRef::object(0), None);
}

#[test]
#[should_panic(expected = "required exactly for combined shapes")]
fn method_only_with_enclosing_panics() {
    let pool = pool();
    let thread = VmThread::new();
    let cseg = pool
        .shape(CLASS)
        .unwrap()
        .new_class_segment(&thread, HeapRef::object(0))
        .unwrap();
    let _ = pool
        .shape(METHOD)
        .unwrap()
        .new_method_segment(&thread, HeapRef::object(0), Some(cseg));
}

#[test]
#[should_panic(expected = "belongs to another shape")]
fn enclosing_from_wrong_shape_panics() {
    let pool = pool();
    let thread = VmThread::new();
    let other = pool
        .shape(METHOD)
        .unwrap()
        .new_method_segment(&thread, HeapRef::object(0), None)
        .unwrap();
    let _ = pool
        .shape(COMBINED)
        .unwrap()
        .new_method_segment(&thread, HeapRef::object(0), Some(other));
}

#[test]
#[should_panic(expected = "does not exist")]
fn missing_enclosing_panics() {
    let pool = pool();
    let _ = pool.shape(COMBINED).unwrap().new_method_segment(
        &VmThread::new(),
        HeapRef::object(0),
        Some(InstanceId::new(99)),
    );
}

#[test]
fn shape_pointers_do_pushes_pool_head_and_enclosing() {
    let pool = pool();
    let thread = VmThread::new();
    let cseg = pool
        .shape(CLASS)
        .unwrap()
        .new_class_segment(&thread, HeapRef::object(0))
        .unwrap();
    let mseg = pool
        .shape(COMBINED)
        .unwrap()
        .new_method_segment(&thread, HeapRef::object(0), Some(cseg))
        .unwrap();

    let mut pool = pool;
    let mut it = PointerCollector::new();
    pool.metaspace_pointers_do(&mut it);

    let p = MetaAddr::Pool(pool.id());
    assert_eq!(
        it.visited(),
        &[
            // class shape: pool, head
            p,
            MetaAddr::Segment(cseg),
            // method shape: pool only, no instances yet
            p,
            // combined shape: pool, head, enclosing shape
            p,
            MetaAddr::Segment(mseg),
            MetaAddr::Shape(CLASS),
            // class instance: shape, self as class link
            MetaAddr::Shape(CLASS),
            MetaAddr::Segment(cseg),
            // combined instance: shape, class link
            MetaAddr::Shape(COMBINED),
            MetaAddr::Segment(cseg),
        ]
    );
}
