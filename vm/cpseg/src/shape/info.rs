//! Shape info block encoding.
//!
//! ```text
//! word 0     kind flags
//! word 1     reference array length
//! word 2     constant count
//! word 3     field count (low half) | method count (high half)
//! byte 32    descriptor * 12   index_and_tag, offset_in_meta, offset_in_refs
//!            field index * 4
//!            method id * 8
//! ```
//!
//! Records are 4-byte aligned, not word aligned: a descriptor may straddle
//! two words. Each word holds two `u32` halves, low half first.

use cpseg_heap::MetaBlock;
use cpseg_ir::{ConstantDescriptor, FieldIndex, MethodId, SegmentKind, Word, WORD_SIZE};

use crate::layout::{Offsets, HEADER_WORDS};

const HEADER_BYTES: usize = HEADER_WORDS * WORD_SIZE;
const FIELD_BYTES: usize = 4;
const METHOD_BYTES: usize = WORD_SIZE;

/// A shape's info block, holding the placed descriptors and the
/// parametric field and method tables at their measured offsets.
#[derive(Debug)]
pub(crate) struct ShapeInfo {
    block: MetaBlock,
}

impl ShapeInfo {
    /// Write the header and every table into `block`.
    ///
    /// `block` must be the size pass 1 measured for these tables.
    pub(crate) fn encode(
        mut block: MetaBlock,
        kind: SegmentKind,
        totals: Offsets,
        descriptors: &[ConstantDescriptor],
        fields: &[FieldIndex],
        methods: &[MethodId],
    ) -> Self {
        let end = Self::methods_at(descriptors.len(), fields.len()) + methods.len() * METHOD_BYTES;
        assert!(
            end <= block.size_in_words() * WORD_SIZE,
            "info block of {} words cannot hold {end} bytes",
            block.size_in_words()
        );

        let words = block.words_mut();
        words[0] = Word::from(kind.flags().bits());
        words[1] = Word::from(totals.refs);
        words[2] = descriptors.len() as Word;
        words[3] = (fields.len() as Word) | ((methods.len() as Word) << 32);

        for (subidx, desc) in descriptors.iter().enumerate() {
            let at = Self::descriptor_at_byte(subidx);
            for (i, half) in desc.to_raw().into_iter().enumerate() {
                put(words, at + 4 * i, half);
            }
        }
        let fields_at = Self::fields_at(descriptors.len());
        for (i, field) in fields.iter().enumerate() {
            put(words, fields_at + i * FIELD_BYTES, u32::from(field.0));
        }
        let methods_at = Self::methods_at(descriptors.len(), fields.len());
        for (i, method) in methods.iter().enumerate() {
            put(words, methods_at + i * METHOD_BYTES, method.0);
        }

        ShapeInfo { block }
    }

    pub(crate) fn size_in_words(&self) -> usize {
        self.block.size_in_words()
    }

    pub(crate) fn words(&self) -> &[Word] {
        self.block.words()
    }

    pub(crate) fn constant_count(&self) -> usize {
        low(self.words()[2])
    }

    pub(crate) fn field_count(&self) -> usize {
        low(self.words()[3])
    }

    pub(crate) fn method_count(&self) -> usize {
        low(self.words()[3] >> 32)
    }

    /// Descriptor at `subidx`, decoded from the block.
    ///
    /// # Panics
    ///
    /// If `subidx` is not below `constant_count()`.
    pub(crate) fn descriptor(&self, subidx: usize) -> ConstantDescriptor {
        let count = self.constant_count();
        assert!(subidx < count, "sub-index {subidx} out of {count} constants");
        let at = Self::descriptor_at_byte(subidx);
        let words = self.words();
        ConstantDescriptor::from_raw([get(words, at), get(words, at + 4), get(words, at + 8)])
    }

    pub(crate) fn field(&self, i: usize) -> FieldIndex {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "written from a u16 field index"
        )]
        let raw = get(self.words(), Self::fields_at(self.constant_count()) + i * FIELD_BYTES) as u16;
        FieldIndex(raw)
    }

    pub(crate) fn method(&self, i: usize) -> MethodId {
        let at = Self::methods_at(self.constant_count(), self.field_count());
        MethodId(get(self.words(), at + i * METHOD_BYTES))
    }

    fn descriptor_at_byte(subidx: usize) -> usize {
        HEADER_BYTES + subidx * ConstantDescriptor::SIZE_IN_BYTES
    }

    fn fields_at(constants: usize) -> usize {
        Self::descriptor_at_byte(constants)
    }

    fn methods_at(constants: usize, fields: usize) -> usize {
        Self::fields_at(constants) + fields * FIELD_BYTES
    }
}

/// Word index and bit shift of the 4-byte aligned half at byte `at`.
#[inline]
fn split(at: usize) -> (usize, u32) {
    debug_assert_eq!(at % 4, 0, "unaligned info record at byte {at}");
    let shift = if at % WORD_SIZE == 0 { 0 } else { 32 };
    (at / WORD_SIZE, shift)
}

#[inline]
fn put(words: &mut [Word], at: usize, value: u32) {
    let (word, shift) = split(at);
    let mask = Word::from(u32::MAX) << shift;
    words[word] = (words[word] & !mask) | (Word::from(value) << shift);
}

#[inline]
#[allow(clippy::cast_possible_truncation, reason = "selects one 32-bit half")]
fn get(words: &[Word], at: usize) -> u32 {
    let (word, shift) = split(at);
    (words[word] >> shift) as u32
}

#[inline]
#[allow(clippy::cast_possible_truncation, reason = "counts are stored in 32-bit halves")]
fn low(word: Word) -> usize {
    (word & Word::from(u32::MAX)) as usize
}
