//! Property-based tests for segment layout.
//!
//! Random pools drawn from the supported tag set, random inclusion
//! subsets, all three kinds:
//! 1. Placement reproduces the measured totals
//! 2. The parameter leads and owns the argument slot
//! 3. Storage constants get dense, strictly increasing offsets
//! 4. Every created segment has its shape's size

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::cast_possible_truncation,
    reason = "Proptest ranges keep indices within u16"
)]

use std::sync::Arc;

use cpseg::{measure, place, ConstantPool, ShapeRequest};
use cpseg_heap::{HeapRef, LoaderData, VmThread};
use cpseg_ir::{
    compare_index_and_tag, ConstantDescriptor, CpIndex, FixedRef, SegmentKind, ShapeId, Tag,
    WORD_SIZE,
};
use proptest::prelude::*;

const STORAGE_TAGS: [Tag; 3] = [Tag::Linkage, Tag::MethodHandle, Tag::Dynamic];

/// A pool whose entry 1..=n are storage constants and one entry is the
/// parameter, plus the indices to include.
fn pool_strategy() -> impl Strategy<Value = (Vec<Tag>, CpIndex, Vec<CpIndex>)> {
    prop::collection::vec(prop::sample::select(STORAGE_TAGS.to_vec()), 1..40)
        .prop_flat_map(|body| {
            let len = body.len() + 1;
            (Just(body), 1..len)
        })
        .prop_flat_map(|(body, param)| {
            let len = body.len() + 1;
            let mut tags = Vec::with_capacity(len);
            tags.push(Tag::Invalid);
            tags.extend(body);
            tags[param] = Tag::Parameter;
            let include = prop::collection::vec(1..len, 0..len * 2);
            (Just(tags), Just(CpIndex::new(param as u16)), include)
        })
        .prop_map(|(tags, param, include)| {
            let include = include
                .into_iter()
                .map(|i| CpIndex::new(i as u16))
                .collect();
            (tags, param, include)
        })
}

fn kind_strategy() -> impl Strategy<Value = SegmentKind> {
    prop_oneof![
        Just(SegmentKind::Class),
        Just(SegmentKind::MethodOnly),
        Just(SegmentKind::MethodAndClass),
    ]
}

fn request(kind: SegmentKind, param: CpIndex, include: Vec<CpIndex>) -> ShapeRequest {
    let segnum = ShapeId::new(2);
    match kind {
        SegmentKind::Class => ShapeRequest::class(segnum, param),
        SegmentKind::MethodOnly => ShapeRequest::method_only(segnum, param),
        SegmentKind::MethodAndClass => {
            ShapeRequest::method_and_class(segnum, param, ShapeId::new(1))
        }
    }
    .with_constants(include)
}

proptest! {
    #[test]
    fn placement_reproduces_measurement(
        (tags, param, include) in pool_strategy(),
        kind in kind_strategy(),
    ) {
        let layout = measure(&tags, &request(kind, param, include)).unwrap();
        let mut target = vec![ConstantDescriptor::default(); layout.constant_count()];
        let placed = place(&layout, &mut target).unwrap();

        prop_assert_eq!(placed, layout.totals());
        prop_assert_eq!(measure(&tags, &request(kind, param, Vec::new())).unwrap().constant_count(), 1);
    }

    #[test]
    fn parameter_leads_and_storage_is_dense(
        (tags, param, include) in pool_strategy(),
        kind in kind_strategy(),
    ) {
        let layout = measure(&tags, &request(kind, param, include)).unwrap();
        let mut target = vec![ConstantDescriptor::default(); layout.constant_count()];
        place(&layout, &mut target).unwrap();

        let lead = target[ConstantDescriptor::PARAMETER_SUBINDEX];
        prop_assert_eq!(lead.index(), param);
        prop_assert_eq!(lead.tag(), Tag::Parameter);
        prop_assert_eq!(lead.offset_in_refs(), FixedRef::ARGUMENT);

        let word = WORD_SIZE as u32;
        let mut meta = 4 * word;
        let mut refs = kind.fixed_ref_limit();
        for pair in target.windows(2) {
            prop_assert!(compare_index_and_tag(
                (pair[0].index(), pair[0].tag()),
                (pair[1].index(), pair[1].tag()),
            ).is_lt());
        }
        for desc in &target[1..] {
            prop_assert!(desc.tag().needs_segment_storage());
            prop_assert_eq!(desc.offset_in_meta(), meta);
            prop_assert_eq!(desc.offset_in_refs(), refs);
            meta += word;
            refs += 1;
        }
        prop_assert_eq!(layout.refs_length(), refs);
        prop_assert_eq!(layout.segment_size_in_words(), (meta / word) as usize);
    }

    #[test]
    fn created_segments_match_shape_size(
        (tags, param, include) in pool_strategy(),
        count in 1_usize..6,
    ) {
        let mut pool = ConstantPool::new(Arc::new(LoaderData::default()), tags);
        let thread = VmThread::new();
        let segnum = pool
            .allocate_shape(&thread, request(SegmentKind::Class, param, include))
            .unwrap();
        let shape = pool.shape(segnum).unwrap();

        for i in 0..count {
            let id = shape.new_class_segment(&thread, HeapRef::object(i as u64)).unwrap();
            let refs = pool.refs_array(id).unwrap();
            prop_assert_eq!(pool.loader().heap().length(refs), shape.refs_length());

            let seg = pool.segment(id).unwrap();
            prop_assert_eq!(seg.size_in_words(), shape.segment_size_in_words());
            for desc in shape.constant_infos().iter().skip(1) {
                prop_assert_eq!(seg.meta_word(desc), u64::from(desc.index_and_tag()));
            }
        }
        prop_assert_eq!(shape.segment_count(), count);
    }
}
