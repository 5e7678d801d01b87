//! Format options: the per-type wire representation choices.
//!
//! Every [`Format`] type carries an associated `Options` value whose shape
//! mirrors the type tree — one options node per type node. Scalars have no
//! choices (`()`); sequences, products, sums, and fieldless enums select
//! among the representations below. The encoder and the decoder must be
//! given identical options for the same logical type; mismatches are not
//! detected.

use crate::format::Format;

/// Wire representation of a sequence.
///
/// Honored only when the element type is `u8`; sequences of any other
/// element type are always encoded as a MessagePack array regardless of this
/// choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqRepr {
    /// MessagePack `bin` family (raw bytes).
    Bin,
    /// MessagePack `str` family.
    #[default]
    Str,
    /// MessagePack `array` family, one element per item.
    Array,
}

/// Wire layout of a product (derived struct).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructLayout {
    /// A map of `field name → field value` entries, order-insensitive on
    /// decode.
    #[default]
    Map,
    /// An array of field values in declaration order, no names.
    Array,
}

/// Wire layout of a sum (derived enum with payload variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumLayout {
    /// A single-entry map of `variant name → payload`.
    #[default]
    Map,
    /// The bare payload with no tag. Decoding tries variants in declaration
    /// order and the first syntactic match wins; declare variants from most
    /// to least specific.
    Untagged,
}

/// Wire representation of a fieldless enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumRepr {
    /// The variant's integer discriminant.
    #[default]
    Int,
    /// The variant's name as a str.
    Str,
}

/// Options node for `[T; N]` and `&[T]`.
#[derive(Debug)]
pub struct SeqOptions<T: Format> {
    /// Representation choice; see [`SeqRepr`].
    pub repr: SeqRepr,
    /// Terminator value appended after the elements. On the wire the
    /// sequence length grows by one and the trailing element must equal the
    /// sentinel on decode.
    pub sentinel: Option<T>,
    /// Options for each element.
    pub elem: T::Options,
}

impl<T: Format> Default for SeqOptions<T> {
    fn default() -> Self {
        Self {
            repr: SeqRepr::default(),
            sentinel: None,
            elem: T::Options::default(),
        }
    }
}
