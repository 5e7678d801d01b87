//! Arena-allocating decodes: slices, strs, references, and sentinels.

use typepack::{Arena, DecodeError, Pack, SeqOptions, SeqRepr};

fn encode_vec<T: typepack::Encode>(value: &T, options: &T::Options) -> Vec<u8> {
    let mut buf = vec![0u8; 1024];
    let bytes = typepack::encode(value, &mut buf, options).unwrap();
    bytes.to_vec()
}

#[test]
fn byte_slice_roundtrips_in_every_repr() {
    let arena = Arena::new();
    for repr in [SeqRepr::Bin, SeqRepr::Str, SeqRepr::Array] {
        let opts = SeqOptions::<u8> {
            repr,
            ..Default::default()
        };
        let bytes = encode_vec(&&b"hello"[..], &opts);
        let decoded: &[u8] = typepack::decode_alloc(&arena, &bytes, &opts).unwrap();
        assert_eq!(decoded, b"hello");
    }
}

#[test]
fn slice_family_must_match_options() {
    let arena = Arena::new();
    let str_opts = SeqOptions::<u8>::default();
    let bin_opts = SeqOptions::<u8> {
        repr: SeqRepr::Bin,
        ..Default::default()
    };
    let str_bytes = encode_vec(&&b"xy"[..], &str_opts);
    // str-encoded input under bin options is a family mismatch.
    assert_eq!(
        typepack::decode_alloc::<&[u8]>(&arena, &str_bytes, &bin_opts),
        Err(DecodeError::Invalid)
    );
}

#[test]
fn element_slice_roundtrips() {
    let arena = Arena::new();
    let opts = SeqOptions::<u16>::default();
    let values: &[u16] = &[1, 500, 65535];
    let bytes = encode_vec(&values, &opts);
    assert_eq!(bytes[0], 0x93);
    let decoded: &[u16] = typepack::decode_alloc(&arena, &bytes, &opts).unwrap();
    assert_eq!(decoded, values);
}

#[test]
fn empty_slice_roundtrips() {
    let arena = Arena::new();
    let opts = SeqOptions::<u64>::default();
    let empty: &[u64] = &[];
    let bytes = encode_vec(&empty, &opts);
    assert_eq!(bytes, [0x90]);
    let decoded: &[u64] = typepack::decode_alloc(&arena, &bytes, &opts).unwrap();
    assert!(decoded.is_empty());
}

#[test]
fn sentinel_slice_wire_length_is_host_plus_one() {
    let arena = Arena::new();
    let opts = SeqOptions::<u8> {
        sentinel: Some(0),
        ..Default::default()
    };
    let bytes = encode_vec(&&b"hi"[..], &opts);
    // fixstr of length 3: "hi" plus the terminator.
    assert_eq!(bytes, [0xa3, b'h', b'i', 0x00]);
    let decoded: &[u8] = typepack::decode_alloc(&arena, &bytes, &opts).unwrap();
    assert_eq!(decoded, b"hi");

    // The trailing element must equal the sentinel.
    let corrupted = [0xa3, b'h', b'i', 0x01];
    assert_eq!(
        typepack::decode_alloc::<&[u8]>(&arena, &corrupted, &opts),
        Err(DecodeError::Invalid)
    );
    // A sentinel sequence can never have wire length zero.
    assert_eq!(
        typepack::decode_alloc::<&[u8]>(&arena, &[0xa0], &opts),
        Err(DecodeError::Invalid)
    );
}

#[test]
fn sentinel_array_checks_the_trailing_element() {
    let opts = SeqOptions::<u16> {
        sentinel: Some(0xffff),
        ..Default::default()
    };
    let value = [1u16, 2];
    let bytes = encode_vec(&value, &opts);
    assert_eq!(bytes, [0x93, 0x01, 0x02, 0xcd, 0xff, 0xff]);
    assert_eq!(typepack::decode::<[u16; 2]>(&bytes, &opts).unwrap(), value);

    // Wrong terminator.
    let corrupted = [0x93, 0x01, 0x02, 0x03];
    assert_eq!(
        typepack::decode::<[u16; 2]>(&corrupted, &opts),
        Err(DecodeError::Invalid)
    );
    // Wire length must be host length + 1.
    let unterminated = [0x92, 0x01, 0x02];
    assert_eq!(
        typepack::decode::<[u16; 2]>(&unterminated, &opts),
        Err(DecodeError::Invalid)
    );
}

#[test]
fn str_roundtrips_and_validates_utf8() {
    let arena = Arena::new();
    let bytes = encode_vec(&"café", &());
    assert_eq!(bytes[0], 0xa5);
    let decoded: &str = typepack::decode_alloc(&arena, &bytes, &()).unwrap();
    assert_eq!(decoded, "café");

    // 0xff is not valid UTF-8.
    assert_eq!(
        typepack::decode_alloc::<&str>(&arena, &[0xa1, 0xff], &()),
        Err(DecodeError::Invalid)
    );
}

#[test]
fn reference_decodes_through_the_arena() {
    let arena = Arena::new();
    let bytes = encode_vec(&&42u64, &());
    assert_eq!(bytes, [0x2a]);
    let decoded: &u64 = typepack::decode_alloc(&arena, &bytes, &()).unwrap();
    assert_eq!(*decoded, 42);
}

#[derive(Pack, Debug, PartialEq)]
struct Record<'a> {
    name: &'a str,
    payload: &'a [u8],
    readings: &'a [i32],
    note: Option<&'a str>,
}

#[test]
fn borrowed_struct_roundtrips() {
    let arena = Arena::new();
    let record = Record {
        name: "sensor-7",
        payload: b"\x01\x02\x03",
        readings: &[-5, 1000, 0],
        note: None,
    };
    let mut opts = RecordFormatOptions::default();
    opts.payload.repr = SeqRepr::Bin;

    let bytes = encode_vec(&record, &opts);
    let decoded: Record<'_> = typepack::decode_alloc(&arena, &bytes, &opts).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn decoded_values_outlive_the_input_buffer() {
    let arena = Arena::new();
    let opts = SeqOptions::<u8> {
        repr: SeqRepr::Bin,
        ..Default::default()
    };
    let decoded: &[u8] = {
        let bytes = encode_vec(&&b"transient"[..], &opts);
        typepack::decode_alloc(&arena, &bytes, &opts).unwrap()
    };
    // The input vector is gone; the slice lives in the arena.
    assert_eq!(decoded, b"transient");
}

#[test]
fn slice_count_beyond_input_is_rejected_before_allocating() {
    let arena = Arena::new();
    let opts = SeqOptions::<u64>::default();
    // array32 header claiming 2^31 elements, then nothing.
    let bytes = [0xdd, 0x80, 0x00, 0x00, 0x00];
    assert_eq!(
        typepack::decode_alloc::<&[u64]>(&arena, &bytes, &opts),
        Err(DecodeError::Invalid)
    );
}

#[test]
fn trailing_bytes_after_alloc_decode_are_rejected() {
    let arena = Arena::new();
    let opts = SeqOptions::<u8>::default();
    let mut bytes = encode_vec(&&b"ok"[..], &opts);
    bytes.push(0xc0);
    assert_eq!(
        typepack::decode_alloc::<&[u8]>(&arena, &bytes, &opts),
        Err(DecodeError::Invalid)
    );
}
