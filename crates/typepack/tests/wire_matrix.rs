//! Exact wire bytes for the scalar and container encoders.

use typepack::{EnumLayout, EnumRepr, Pack, SeqOptions, SeqRepr, StructLayout};

fn encode_vec<T: typepack::Encode>(value: &T, options: &T::Options) -> Vec<u8> {
    let mut buf = vec![0u8; 1024];
    let bytes = typepack::encode(value, &mut buf, options).unwrap();
    bytes.to_vec()
}

#[derive(Pack, Debug, PartialEq)]
struct Pair {
    foo: u8,
    bar: u16,
}

#[allow(non_camel_case_types)]
#[derive(Pack, Debug, PartialEq)]
enum Tag {
    foo,
    bar,
}

#[derive(Pack, Debug, PartialEq)]
enum Scalar {
    MyU8(u8),
    MyBool(bool),
}

#[test]
fn bool_wire_bytes() {
    assert_eq!(encode_vec(&true, &()), [0xc3]);
    assert_eq!(encode_vec(&false, &()), [0xc2]);
    assert_eq!(typepack::decode::<bool>(&[0xc3], &()).unwrap(), true);
}

#[test]
fn fixint_wire_bytes() {
    assert_eq!(encode_vec(&0u8, &()), [0x00]);
    assert_eq!(encode_vec(&(-32i8), &()), [0xe0]);
    assert_eq!(encode_vec(&(-1i8), &()), [0xff]);
    assert_eq!(typepack::decode::<i8>(&[0xe0], &()).unwrap(), -32);
}

#[test]
fn byte_array_wire_bytes() {
    // Default repr is str.
    let str_opts = SeqOptions::<u8>::default();
    assert_eq!(
        encode_vec(&*b"foo", &str_opts),
        [0xa3, 0x66, 0x6f, 0x6f]
    );
    assert_eq!(
        typepack::decode::<[u8; 3]>(&[0xa3, 0x66, 0x6f, 0x6f], &str_opts).unwrap(),
        *b"foo"
    );

    let bin_opts = SeqOptions::<u8> {
        repr: SeqRepr::Bin,
        ..Default::default()
    };
    assert_eq!(
        encode_vec(&*b"foo", &bin_opts),
        [0xc4, 0x03, 0x66, 0x6f, 0x6f]
    );
}

#[test]
fn enum_str_wire_bytes() {
    let opts = TagFormatOptions {
        repr: EnumRepr::Str,
    };
    assert_eq!(encode_vec(&Tag::foo, &opts), [0xa3, 0x66, 0x6f, 0x6f]);
    assert_eq!(
        typepack::decode::<Tag>(&[0xa3, 0x66, 0x6f, 0x6f], &opts).unwrap(),
        Tag::foo
    );
}

#[test]
fn struct_map_wire_bytes() {
    let pair = Pair { foo: 3, bar: 2 };
    let opts = PairFormatOptions::default();
    let bytes = encode_vec(&pair, &opts);
    assert_eq!(
        bytes,
        [0x82, 0xa3, 0x66, 0x6f, 0x6f, 0x03, 0xa3, 0x62, 0x61, 0x72, 0x02]
    );
    assert_eq!(typepack::decode::<Pair>(&bytes, &opts).unwrap(), pair);
}

#[test]
fn struct_map_entries_may_be_permuted() {
    let opts = PairFormatOptions::default();
    let permuted = [0x82, 0xa3, 0x62, 0x61, 0x72, 0x02, 0xa3, 0x66, 0x6f, 0x6f, 0x03];
    assert_eq!(
        typepack::decode::<Pair>(&permuted, &opts).unwrap(),
        Pair { foo: 3, bar: 2 }
    );
}

#[test]
fn struct_map_rejects_duplicate_key() {
    let opts = PairFormatOptions::default();
    let duplicated = [0x82, 0xa3, 0x66, 0x6f, 0x6f, 0x03, 0xa3, 0x66, 0x6f, 0x6f, 0x03];
    assert_eq!(
        typepack::decode::<Pair>(&duplicated, &opts),
        Err(typepack::DecodeError::Invalid)
    );
}

#[test]
fn struct_map_rejects_unknown_key() {
    let opts = PairFormatOptions::default();
    // "bar" renamed to "baz".
    let renamed = [0x82, 0xa3, 0x66, 0x6f, 0x6f, 0x03, 0xa3, 0x62, 0x61, 0x7a, 0x02];
    assert_eq!(
        typepack::decode::<Pair>(&renamed, &opts),
        Err(typepack::DecodeError::Invalid)
    );
}

#[test]
fn struct_array_wire_bytes() {
    let opts = PairFormatOptions {
        layout: StructLayout::Array,
        ..Default::default()
    };
    let bytes = encode_vec(&Pair { foo: 3, bar: 2 }, &opts);
    assert_eq!(bytes, [0x92, 0x03, 0x02]);
    assert_eq!(
        typepack::decode::<Pair>(&bytes, &opts).unwrap(),
        Pair { foo: 3, bar: 2 }
    );
}

#[test]
fn bool_array_wire_bytes() {
    let opts = SeqOptions::<bool>::default();
    assert_eq!(
        encode_vec(&[true, false, true], &opts),
        [0x93, 0xc3, 0xc2, 0xc3]
    );
}

#[test]
fn option_wire_bytes() {
    assert_eq!(encode_vec(&None::<f64>, &()), [0xc0]);
    let bytes = encode_vec(&Some(12.3f64), &());
    assert_eq!(bytes.len(), 9);
    assert_eq!(&bytes[..3], &[0xcb, 0x40, 0x28]);
    assert_eq!(typepack::decode::<Option<f64>>(&bytes, &()).unwrap(), Some(12.3));
    assert_eq!(typepack::decode::<Option<f64>>(&[0xc0], &()).unwrap(), None);
}

#[test]
fn untagged_union_decodes_first_syntactic_match() {
    let opts = ScalarFormatOptions {
        layout: EnumLayout::Untagged,
        ..Default::default()
    };
    assert_eq!(
        typepack::decode::<Scalar>(&[0xc2], &opts).unwrap(),
        Scalar::MyBool(false)
    );
    assert_eq!(
        typepack::decode::<Scalar>(&[0x00], &opts).unwrap(),
        Scalar::MyU8(0)
    );
    // A bin8 header matches neither variant.
    assert_eq!(
        typepack::decode::<Scalar>(&[0xc4], &opts),
        Err(typepack::DecodeError::Invalid)
    );
}

#[test]
fn wide_integer_wire_bytes() {
    assert_eq!(encode_vec(&0x80u8, &()), [0xcc, 0x80]);
    assert_eq!(encode_vec(&0x1234u16, &()), [0xcd, 0x12, 0x34]);
    assert_eq!(
        encode_vec(&0xdead_beefu32, &()),
        [0xce, 0xde, 0xad, 0xbe, 0xef]
    );
    assert_eq!(encode_vec(&(-33i8), &()), [0xd0, 0xdf]);
    assert_eq!(encode_vec(&(-0x1234i16), &()), [0xd1, 0xed, 0xcc]);
}
