use super::*;
use pretty_assertions::assert_eq;

fn pair(index: u16, tag: Tag) -> (CpIndex, Tag) {
    (CpIndex::new(index), tag)
}

#[test]
fn packs_index_and_tag() {
    let desc = ConstantDescriptor::new(CpIndex::new(0x1234), Tag::Dynamic);
    assert_eq!(desc.index(), CpIndex::new(0x1234));
    assert_eq!(desc.tag(), Tag::Dynamic);
    assert_eq!(desc.offset_in_meta(), 0);
    assert_eq!(desc.offset_in_refs(), 0);
}

#[test]
fn max_index_survives_packing() {
    let desc = ConstantDescriptor::new(CpIndex::new(u16::MAX), Tag::Linkage);
    assert_eq!(desc.index(), CpIndex::new(u16::MAX));
    assert_eq!(desc.tag(), Tag::Linkage);
}

#[test]
fn raw_words_follow_field_order() {
    let desc = ConstantDescriptor::placed(CpIndex::new(9), Tag::Dynamic, 48, 3);
    assert_eq!(desc.to_raw(), [(9 << 8) | 17, 48, 3]);
    assert_eq!(ConstantDescriptor::from_raw(desc.to_raw()), desc);
}

#[test]
fn placed_keeps_offsets() {
    let desc = ConstantDescriptor::placed(CpIndex::new(3), Tag::MethodHandle, 40, 2);
    assert_eq!(desc.offset_in_meta(), 40);
    assert_eq!(desc.offset_in_refs(), 2);
}

#[test]
fn default_decodes_as_invalid() {
    assert_eq!(ConstantDescriptor::default().tag(), Tag::Invalid);
}

#[test]
fn parameter_sorts_first_regardless_of_index() {
    assert_eq!(
        compare_index_and_tag(pair(500, Tag::Parameter), pair(1, Tag::Linkage)),
        Ordering::Less
    );
    assert_eq!(
        compare_index_and_tag(pair(1, Tag::Dynamic), pair(500, Tag::Parameter)),
        Ordering::Greater
    );
}

#[test]
fn linkage_sorts_before_other_storage_tags() {
    assert_eq!(
        compare_index_and_tag(pair(90, Tag::Linkage), pair(1, Tag::MethodHandle)),
        Ordering::Less
    );
}

#[test]
fn same_tag_orders_by_index() {
    assert_eq!(
        compare_index_and_tag(pair(4, Tag::Dynamic), pair(9, Tag::Dynamic)),
        Ordering::Less
    );
    assert_eq!(
        compare_index_and_tag(pair(4, Tag::Dynamic), pair(4, Tag::Dynamic)),
        Ordering::Equal
    );
}

#[test]
fn sorts_literal_scenario() {
    let mut pairs = vec![
        pair(5, Tag::Parameter),
        pair(2, Tag::Linkage),
        pair(9, Tag::Dynamic),
        pair(3, Tag::MethodHandle),
    ];
    pairs.reverse();
    pairs.sort_by(|a, b| compare_index_and_tag(*a, *b));
    assert_eq!(
        pairs,
        vec![
            pair(5, Tag::Parameter),
            pair(2, Tag::Linkage),
            pair(3, Tag::MethodHandle),
            pair(9, Tag::Dynamic),
        ]
    );
}
