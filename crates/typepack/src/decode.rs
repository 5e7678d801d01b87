//! Type-directed MessagePack decoder.

use typepack_buffers::Reader;

use crate::arena::Arena;
use crate::error::DecodeError;
use crate::format::Format;
use crate::marker::Marker;
use crate::options::SeqRepr;

/// A type decodable from MessagePack.
///
/// `'arena` is the lifetime of the [`Arena`] that owns any slices,
/// references, or strs the decoded value contains. Types that allocate
/// nothing implement `Decode` for every arena lifetime.
pub trait Decode<'arena>: Format + Sized {
    /// Decodes one value of `Self` from the reader's current position.
    fn decode(
        r: &mut Reader<'_>,
        cx: &DecodeCx<'arena>,
        options: &Self::Options,
    ) -> Result<Self, DecodeError>;
}

/// Decoding context: carries the arena, when one is available.
///
/// [`crate::decode`] supplies no arena (and statically admits only types
/// that need none); [`crate::decode_alloc`] supplies the caller's.
pub struct DecodeCx<'arena> {
    arena: Option<&'arena Arena>,
}

impl<'arena> DecodeCx<'arena> {
    pub(crate) fn unallocated() -> Self {
        Self { arena: None }
    }

    pub(crate) fn with_arena(arena: &'arena Arena) -> Self {
        Self { arena: Some(arena) }
    }

    /// The arena backing this decode call.
    pub fn arena(&self) -> Result<&'arena Arena, DecodeError> {
        self.arena.ok_or(DecodeError::Invalid)
    }
}

/// Reads and decodes one tag byte.
pub fn read_marker(r: &mut Reader<'_>) -> Result<Marker, DecodeError> {
    Marker::from_byte(r.u8()?).ok_or(DecodeError::Invalid)
}

/// Reads a `nil` byte.
pub fn read_nil(r: &mut Reader<'_>) -> Result<(), DecodeError> {
    match read_marker(r)? {
        Marker::Nil => Ok(()),
        _ => Err(DecodeError::Invalid),
    }
}

/// Reads an integer of any wire family, fixints included.
pub fn read_int(r: &mut Reader<'_>) -> Result<i128, DecodeError> {
    let value = match read_marker(r)? {
        Marker::PosFixint(v) => v as i128,
        Marker::NegFixint(v) => v as i128,
        Marker::Uint8 => r.u8()? as i128,
        Marker::Uint16 => r.u16()? as i128,
        Marker::Uint32 => r.u32()? as i128,
        Marker::Uint64 => r.u64()? as i128,
        Marker::Int8 => r.i8()? as i128,
        Marker::Int16 => r.i16()? as i128,
        Marker::Int32 => r.i32()? as i128,
        Marker::Int64 => r.i64()? as i128,
        _ => return Err(DecodeError::Invalid),
    };
    Ok(value)
}

/// Reads an array header of any width.
pub fn read_array_header(r: &mut Reader<'_>) -> Result<usize, DecodeError> {
    let len = match read_marker(r)? {
        Marker::FixArray(n) => n as usize,
        Marker::Array16 => r.u16()? as usize,
        Marker::Array32 => r.u32()? as usize,
        _ => return Err(DecodeError::Invalid),
    };
    Ok(len)
}

/// Reads a map header of any width. Returns the entry count.
pub fn read_map_header(r: &mut Reader<'_>) -> Result<usize, DecodeError> {
    let len = match read_marker(r)? {
        Marker::FixMap(n) => n as usize,
        Marker::Map16 => r.u16()? as usize,
        Marker::Map32 => r.u32()? as usize,
        _ => return Err(DecodeError::Invalid),
    };
    Ok(len)
}

pub(crate) fn read_str_len(r: &mut Reader<'_>) -> Result<usize, DecodeError> {
    let len = match read_marker(r)? {
        Marker::FixStr(n) => n as usize,
        Marker::Str8 => r.u8()? as usize,
        Marker::Str16 => r.u16()? as usize,
        Marker::Str32 => r.u32()? as usize,
        _ => return Err(DecodeError::Invalid),
    };
    Ok(len)
}

pub(crate) fn read_bin_len(r: &mut Reader<'_>) -> Result<usize, DecodeError> {
    let len = match read_marker(r)? {
        Marker::Bin8 => r.u8()? as usize,
        Marker::Bin16 => r.u16()? as usize,
        Marker::Bin32 => r.u32()? as usize,
        _ => return Err(DecodeError::Invalid),
    };
    Ok(len)
}

/// Reads a field or variant name, accepting any str or bin family.
///
/// Names longer than `max_len` — the longest name the caller declares — are
/// rejected before the payload is touched.
pub fn read_name<'i>(r: &mut Reader<'i>, max_len: usize) -> Result<&'i [u8], DecodeError> {
    let len = match read_marker(r)? {
        Marker::FixStr(n) => n as usize,
        Marker::Str8 | Marker::Bin8 => r.u8()? as usize,
        Marker::Str16 | Marker::Bin16 => r.u16()? as usize,
        Marker::Str32 | Marker::Bin32 => r.u32()? as usize,
        _ => return Err(DecodeError::Invalid),
    };
    if len > max_len {
        return Err(DecodeError::Invalid);
    }
    Ok(r.buf(len)?)
}

impl<'arena> Decode<'arena> for bool {
    fn decode(r: &mut Reader<'_>, _: &DecodeCx<'arena>, _: &()) -> Result<Self, DecodeError> {
        match read_marker(r)? {
            Marker::True => Ok(true),
            Marker::False => Ok(false),
            _ => Err(DecodeError::Invalid),
        }
    }
}

macro_rules! int_decode {
    ($($ty:ty)*) => {$(
        impl<'arena> Decode<'arena> for $ty {
            fn decode(r: &mut Reader<'_>, _: &DecodeCx<'arena>, _: &()) -> Result<Self, DecodeError> {
                let value = read_int(r)?;
                <$ty>::try_from(value).map_err(|_| DecodeError::Invalid)
            }
        }
    )*};
}

int_decode!(u8 u16 u32 u64 usize i8 i16 i32 i64 isize);

impl<'arena> Decode<'arena> for f32 {
    fn decode(r: &mut Reader<'_>, _: &DecodeCx<'arena>, _: &()) -> Result<Self, DecodeError> {
        match read_marker(r)? {
            Marker::Float32 => Ok(r.f32()?),
            _ => Err(DecodeError::Invalid),
        }
    }
}

impl<'arena> Decode<'arena> for f64 {
    fn decode(r: &mut Reader<'_>, _: &DecodeCx<'arena>, _: &()) -> Result<Self, DecodeError> {
        match read_marker(r)? {
            Marker::Float64 => Ok(r.f64()?),
            _ => Err(DecodeError::Invalid),
        }
    }
}

impl<'arena, T: Decode<'arena>> Decode<'arena> for Option<T> {
    fn decode(
        r: &mut Reader<'_>,
        cx: &DecodeCx<'arena>,
        options: &Self::Options,
    ) -> Result<Self, DecodeError> {
        if r.peek()? == Marker::Nil.to_byte() {
            r.skip(1)?;
            return Ok(None);
        }
        Ok(Some(T::decode(r, cx, options)?))
    }
}

impl<'arena, T: Decode<'arena>> Decode<'arena> for &'arena T {
    fn decode(
        r: &mut Reader<'_>,
        cx: &DecodeCx<'arena>,
        options: &Self::Options,
    ) -> Result<Self, DecodeError> {
        let value = T::decode(r, cx, options)?;
        Ok(cx.arena()?.alloc(value)?)
    }
}

impl<'arena> Decode<'arena> for &'arena str {
    fn decode(r: &mut Reader<'_>, cx: &DecodeCx<'arena>, _: &()) -> Result<Self, DecodeError> {
        let len = read_str_len(r)?;
        let bytes = r.buf(len)?;
        let s = core::str::from_utf8(bytes).map_err(|_| DecodeError::Invalid)?;
        cx.arena()?.alloc_str(s)
    }
}

fn decode_array_elems<'arena, T: Decode<'arena>, const N: usize>(
    r: &mut Reader<'_>,
    cx: &DecodeCx<'arena>,
    elem: &T::Options,
) -> Result<[T; N], DecodeError> {
    let mut err = None;
    let items: [Option<T>; N] = core::array::from_fn(|_| {
        if err.is_some() {
            return None;
        }
        match T::decode(r, cx, elem) {
            Ok(value) => Some(value),
            Err(e) => {
                err = Some(e);
                None
            }
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(items.map(|item| item.expect("every element decoded"))),
    }
}

impl<'arena, T, const N: usize> Decode<'arena> for [T; N]
where
    T: Decode<'arena> + PartialEq,
{
    fn decode(
        r: &mut Reader<'_>,
        cx: &DecodeCx<'arena>,
        options: &Self::Options,
    ) -> Result<Self, DecodeError> {
        let wire_len = N + options.sentinel.is_some() as usize;
        if T::IS_BYTE && options.repr != SeqRepr::Array {
            let len = match options.repr {
                SeqRepr::Bin => read_bin_len(r)?,
                _ => read_str_len(r)?,
            };
            if len != wire_len {
                return Err(DecodeError::Invalid);
            }
            let payload = r.buf(len)?;
            if let Some(sentinel) = &options.sentinel {
                if payload[len - 1] != sentinel.to_byte() {
                    return Err(DecodeError::Invalid);
                }
            }
            Ok(core::array::from_fn(|i| T::from_byte(payload[i])))
        } else {
            let len = read_array_header(r)?;
            if len != wire_len {
                return Err(DecodeError::Invalid);
            }
            let items = decode_array_elems(r, cx, &options.elem)?;
            if let Some(sentinel) = &options.sentinel {
                let last = T::decode(r, cx, &options.elem)?;
                if last != *sentinel {
                    return Err(DecodeError::Invalid);
                }
            }
            Ok(items)
        }
    }
}

impl<'arena, T> Decode<'arena> for &'arena [T]
where
    T: Decode<'arena> + PartialEq,
{
    fn decode(
        r: &mut Reader<'_>,
        cx: &DecodeCx<'arena>,
        options: &Self::Options,
    ) -> Result<Self, DecodeError> {
        let arena = cx.arena()?;
        let sentinel_len = options.sentinel.is_some() as usize;
        if T::IS_BYTE && options.repr != SeqRepr::Array {
            let len = match options.repr {
                SeqRepr::Bin => read_bin_len(r)?,
                _ => read_str_len(r)?,
            };
            if len < sentinel_len {
                return Err(DecodeError::Invalid);
            }
            let payload = r.buf(len)?;
            if let Some(sentinel) = &options.sentinel {
                if payload[len - 1] != sentinel.to_byte() {
                    return Err(DecodeError::Invalid);
                }
            }
            let host = len - sentinel_len;
            let mut items = bumpalo::collections::Vec::with_capacity_in(host, arena.bump());
            for &byte in &payload[..host] {
                items.push(T::from_byte(byte));
            }
            Ok(items.into_bump_slice())
        } else {
            let len = read_array_header(r)?;
            if len < sentinel_len {
                return Err(DecodeError::Invalid);
            }
            let host = len - sentinel_len;
            // Each element occupies at least one input byte, so a count
            // beyond the remaining input can never decode.
            if host > r.size() {
                return Err(DecodeError::Invalid);
            }
            let mut items = bumpalo::collections::Vec::with_capacity_in(host, arena.bump());
            for _ in 0..host {
                items.push(T::decode(r, cx, &options.elem)?);
            }
            if let Some(sentinel) = &options.sentinel {
                let last = T::decode(r, cx, &options.elem)?;
                if last != *sentinel {
                    return Err(DecodeError::Invalid);
                }
            }
            Ok(items.into_bump_slice())
        }
    }
}
