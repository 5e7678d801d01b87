//! Statically-typed MessagePack codec.
//!
//! The shape of the host type drives both directions of the translation:
//! every [`Format`] type carries a compile-time-shaped options tree selecting
//! its wire representation, an encoder that picks the narrowest legal wire
//! family, and a schema-strict decoder that rejects anything the type does
//! not describe. Scalars, `Option<T>`, arrays, slices, references, and
//! `&str` are built in; structs and enums derive the whole surface with
//! `#[derive(Pack)]`.
//!
//! # Encoding and decoding
//!
//! ```
//! use typepack::Pack;
//!
//! #[derive(Pack, Debug, PartialEq)]
//! struct Point {
//!     x: u8,
//!     y: u16,
//! }
//!
//! let point = Point { x: 3, y: 2 };
//! let mut buf = [0u8; 32];
//! let bytes = typepack::encode(&point, &mut buf, &Default::default()).unwrap();
//! // {"x": 3, "y": 2}
//! assert_eq!(bytes[0], 0x82);
//!
//! let back: Point = typepack::decode(bytes, &Default::default()).unwrap();
//! assert_eq!(back, point);
//! ```
//!
//! # Dynamic data and the arena
//!
//! Types containing slices, references, or strs decode through
//! [`decode_alloc`] into a caller-owned [`Arena`]; dropping the arena
//! releases everything that call produced.
//!
//! ```
//! use typepack::{Arena, Pack};
//!
//! #[derive(Pack, Debug, PartialEq)]
//! struct Message<'a> {
//!     id: u32,
//!     body: &'a str,
//! }
//!
//! let mut buf = [0u8; 64];
//! let bytes = typepack::encode(
//!     &Message { id: 1, body: "hi" },
//!     &mut buf,
//!     &Default::default(),
//! )
//! .unwrap();
//!
//! let arena = Arena::new();
//! let msg: Message<'_> = typepack::decode_alloc(&arena, bytes, &Default::default()).unwrap();
//! assert_eq!(msg, Message { id: 1, body: "hi" });
//! ```
//!
//! # Options
//!
//! `<T as Format>::Options` mirrors the type tree; its `Default` value picks
//! the defaults (maps for structs, str for byte sequences, integer
//! discriminants for fieldless enums). Derived types get a generated
//! `*FormatOptions` struct with one field per struct field or enum variant.

mod arena;
mod decode;
mod encode;
mod error;
mod format;
mod marker;
mod options;

pub use arena::Arena;
pub use decode::{
    read_array_header, read_int, read_map_header, read_marker, read_name, read_nil, Decode,
    DecodeCx,
};
pub use encode::{
    write_array_header, write_bin_header, write_int, write_map_header, write_name, write_nil,
    write_str_header, write_uint, Encode,
};
pub use error::{DecodeError, EncodeError};
pub use format::Format;
pub use marker::Marker;
pub use options::{EnumLayout, EnumRepr, SeqOptions, SeqRepr, StructLayout};
pub use typepack_buffers::{BufferError, Reader, Writer};
pub use typepack_derive::Pack;

/// Encodes `value` into the caller's buffer.
///
/// Returns the written prefix of `out`. Fails with
/// [`EncodeError::NoSpaceLeft`] when the buffer is too small and
/// [`EncodeError::SliceLenTooLarge`] when a sequence exceeds the 32-bit wire
/// limit.
pub fn encode<'buf, T: Encode>(
    value: &T,
    out: &'buf mut [u8],
    options: &T::Options,
) -> Result<&'buf [u8], EncodeError> {
    let mut w = Writer::new(out);
    value.encode(&mut w, options)?;
    Ok(w.into_written())
}

/// Encodes `value` into a buffer sized by the worst-case oracle.
///
/// Admissible only for types without variable-length sequences (rejected at
/// compile time), so the returned vector's capacity bounds the encoding and
/// the call cannot fail.
pub fn encode_bounded<T: Encode>(value: &T, options: &T::Options) -> Vec<u8> {
    const {
        assert!(
            !T::VARIABLE_LENGTH,
            "encode_bounded requires a type without variable-length sequences",
        );
    }
    let mut buf = vec![0u8; T::largest_encoded_size(options)];
    let mut w = Writer::new(&mut buf);
    let written = match value.encode(&mut w, options) {
        Ok(()) => w.written(),
        Err(_) => unreachable!("output buffer sized by largest_encoded_size"),
    };
    buf.truncate(written);
    buf
}

/// Decodes a value of `T` from `bytes` without allocating.
///
/// Admissible only for types that decode without an arena (rejected at
/// compile time). The whole input must be consumed; trailing bytes fail with
/// [`DecodeError::Invalid`].
pub fn decode<T>(bytes: &[u8], options: &T::Options) -> Result<T, DecodeError>
where
    T: Decode<'static>,
{
    const {
        assert!(
            !T::REQUIRES_ARENA,
            "decode requires a type without arena-allocated members; use decode_alloc",
        );
    }
    let mut r = Reader::new(bytes);
    let cx = DecodeCx::unallocated();
    let value = T::decode(&mut r, &cx, options)?;
    if !r.is_empty() {
        return Err(DecodeError::Invalid);
    }
    Ok(value)
}

/// Decodes a value of `T` from `bytes`, allocating dynamic data in `arena`.
///
/// Every slice, reference, and str in the result borrows `arena`; dropping
/// the arena releases them as a unit. The whole input must be consumed;
/// trailing bytes fail with [`DecodeError::Invalid`].
pub fn decode_alloc<'arena, T>(
    arena: &'arena Arena,
    bytes: &[u8],
    options: &T::Options,
) -> Result<T, DecodeError>
where
    T: Decode<'arena>,
{
    let mut r = Reader::new(bytes);
    let cx = DecodeCx::with_arena(arena);
    let value = T::decode(&mut r, &cx, options)?;
    if !r.is_empty() {
        return Err(DecodeError::Invalid);
    }
    Ok(value)
}
