//! Type-directed MessagePack encoder.

use typepack_buffers::Writer;

use crate::error::EncodeError;
use crate::format::Format;
use crate::marker::Marker;
use crate::options::{SeqOptions, SeqRepr};

/// A type encodable to MessagePack.
pub trait Encode: Format {
    /// Appends the MessagePack encoding of `self` to `w`.
    fn encode(&self, w: &mut Writer<'_>, options: &Self::Options) -> Result<(), EncodeError>;
}

/// Writes a `nil` byte.
pub fn write_nil(w: &mut Writer<'_>) -> Result<(), EncodeError> {
    w.u8(Marker::Nil.to_byte())?;
    Ok(())
}

/// Writes the narrowest str header for a payload of `len` bytes.
pub fn write_str_header(w: &mut Writer<'_>, len: u32) -> Result<(), EncodeError> {
    if len <= 0x1f {
        w.u8(Marker::FixStr(len as u8).to_byte())?;
    } else if len <= 0xff {
        w.u8u8(Marker::Str8.to_byte(), len as u8)?;
    } else if len <= 0xffff {
        w.u8u16(Marker::Str16.to_byte(), len as u16)?;
    } else {
        w.u8u32(Marker::Str32.to_byte(), len)?;
    }
    Ok(())
}

/// Writes the narrowest bin header for a payload of `len` bytes.
pub fn write_bin_header(w: &mut Writer<'_>, len: u32) -> Result<(), EncodeError> {
    if len <= 0xff {
        w.u8u8(Marker::Bin8.to_byte(), len as u8)?;
    } else if len <= 0xffff {
        w.u8u16(Marker::Bin16.to_byte(), len as u16)?;
    } else {
        w.u8u32(Marker::Bin32.to_byte(), len)?;
    }
    Ok(())
}

/// Writes the narrowest array header for `len` elements.
pub fn write_array_header(w: &mut Writer<'_>, len: u32) -> Result<(), EncodeError> {
    if len <= 0x0f {
        w.u8(Marker::FixArray(len as u8).to_byte())?;
    } else if len <= 0xffff {
        w.u8u16(Marker::Array16.to_byte(), len as u16)?;
    } else {
        w.u8u32(Marker::Array32.to_byte(), len)?;
    }
    Ok(())
}

/// Writes the narrowest map header for `len` entries.
pub fn write_map_header(w: &mut Writer<'_>, len: u32) -> Result<(), EncodeError> {
    if len <= 0x0f {
        w.u8(Marker::FixMap(len as u8).to_byte())?;
    } else if len <= 0xffff {
        w.u8u16(Marker::Map16.to_byte(), len as u16)?;
    } else {
        w.u8u32(Marker::Map32.to_byte(), len)?;
    }
    Ok(())
}

/// Writes a field or variant name as a str.
pub fn write_name(w: &mut Writer<'_>, name: &str) -> Result<(), EncodeError> {
    let len = u32::try_from(name.len()).map_err(|_| EncodeError::SliceLenTooLarge)?;
    write_str_header(w, len)?;
    w.raw(name.as_bytes())?;
    Ok(())
}

/// Writes an unsigned integer in the narrowest family that holds its value.
pub fn write_uint(w: &mut Writer<'_>, value: u64) -> Result<(), EncodeError> {
    if value <= 0x7f {
        w.u8(Marker::PosFixint(value as u8).to_byte())?;
    } else if value <= 0xff {
        w.u8u8(Marker::Uint8.to_byte(), value as u8)?;
    } else if value <= 0xffff {
        w.u8u16(Marker::Uint16.to_byte(), value as u16)?;
    } else if value <= 0xffff_ffff {
        w.u8u32(Marker::Uint32.to_byte(), value as u32)?;
    } else {
        w.u8u64(Marker::Uint64.to_byte(), value)?;
    }
    Ok(())
}

/// Writes a signed integer in the narrowest family that holds its value.
pub fn write_int(w: &mut Writer<'_>, value: i64) -> Result<(), EncodeError> {
    if value >= 0 {
        return write_uint(w, value as u64);
    }
    if value >= -32 {
        w.u8(Marker::NegFixint(value as i8).to_byte())?;
    } else if value >= i8::MIN as i64 {
        w.u8u8(Marker::Int8.to_byte(), value as i8 as u8)?;
    } else if value >= i16::MIN as i64 {
        w.u8u16(Marker::Int16.to_byte(), value as i16 as u16)?;
    } else if value >= i32::MIN as i64 {
        w.u8u32(Marker::Int32.to_byte(), value as i32 as u32)?;
    } else {
        w.u8u64(Marker::Int64.to_byte(), value as u64)?;
    }
    Ok(())
}

pub(crate) fn encode_seq<T: Encode>(
    items: &[T],
    w: &mut Writer<'_>,
    options: &SeqOptions<T>,
) -> Result<(), EncodeError> {
    let wire_len = items.len() as u64 + options.sentinel.is_some() as u64;
    let wire_len = u32::try_from(wire_len).map_err(|_| EncodeError::SliceLenTooLarge)?;
    if T::IS_BYTE && options.repr != SeqRepr::Array {
        match options.repr {
            SeqRepr::Bin => write_bin_header(w, wire_len)?,
            _ => write_str_header(w, wire_len)?,
        }
        for item in items {
            w.u8(item.to_byte())?;
        }
        if let Some(sentinel) = &options.sentinel {
            w.u8(sentinel.to_byte())?;
        }
    } else {
        write_array_header(w, wire_len)?;
        for item in items {
            item.encode(w, &options.elem)?;
        }
        if let Some(sentinel) = &options.sentinel {
            sentinel.encode(w, &options.elem)?;
        }
    }
    Ok(())
}

impl Encode for bool {
    fn encode(&self, w: &mut Writer<'_>, _: &()) -> Result<(), EncodeError> {
        let marker = if *self { Marker::True } else { Marker::False };
        w.u8(marker.to_byte())?;
        Ok(())
    }
}

macro_rules! uint_encode {
    ($($ty:ty)*) => {$(
        impl Encode for $ty {
            fn encode(&self, w: &mut Writer<'_>, _: &()) -> Result<(), EncodeError> {
                write_uint(w, *self as u64)
            }
        }
    )*};
}

uint_encode!(u8 u16 u32 u64 usize);

macro_rules! int_encode {
    ($($ty:ty)*) => {$(
        impl Encode for $ty {
            fn encode(&self, w: &mut Writer<'_>, _: &()) -> Result<(), EncodeError> {
                write_int(w, *self as i64)
            }
        }
    )*};
}

int_encode!(i8 i16 i32 i64 isize);

impl Encode for f32 {
    fn encode(&self, w: &mut Writer<'_>, _: &()) -> Result<(), EncodeError> {
        w.u8f32(Marker::Float32.to_byte(), *self)?;
        Ok(())
    }
}

impl Encode for f64 {
    fn encode(&self, w: &mut Writer<'_>, _: &()) -> Result<(), EncodeError> {
        w.u8f64(Marker::Float64.to_byte(), *self)?;
        Ok(())
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, w: &mut Writer<'_>, options: &Self::Options) -> Result<(), EncodeError> {
        match self {
            Some(inner) => inner.encode(w, options),
            None => write_nil(w),
        }
    }
}

impl<'a, T: Encode> Encode for &'a T {
    fn encode(&self, w: &mut Writer<'_>, options: &Self::Options) -> Result<(), EncodeError> {
        (**self).encode(w, options)
    }
}

impl<'a> Encode for &'a str {
    fn encode(&self, w: &mut Writer<'_>, _: &()) -> Result<(), EncodeError> {
        let len = u32::try_from(self.len()).map_err(|_| EncodeError::SliceLenTooLarge)?;
        write_str_header(w, len)?;
        w.raw(self.as_bytes())?;
        Ok(())
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, w: &mut Writer<'_>, options: &Self::Options) -> Result<(), EncodeError> {
        encode_seq(&self[..], w, options)
    }
}

impl<'a, T: Encode> Encode for &'a [T] {
    fn encode(&self, w: &mut Writer<'_>, options: &Self::Options) -> Result<(), EncodeError> {
        encode_seq(self, w, options)
    }
}
