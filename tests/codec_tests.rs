//! Codec Tests
//!
//! Tests for the length-prefixed blob, string, and number primitives.

use bytes::{Bytes, BytesMut};
use neti::wire::{
    decode_bytes, decode_number, decode_string, decode_string_from_slice, encode_bytes,
    encode_number, encode_string, encode_string_to_vec, MAX_FIELD_SIZE,
};
use neti::NetError;

// =============================================================================
// Blob Tests
// =============================================================================

#[test]
fn test_encode_bytes_layout() {
    let mut buf = BytesMut::new();
    encode_bytes(b"ab", &mut buf).unwrap();

    assert_eq!(&buf[..], &[0x00, 0x02, b'a', b'b']);
}

#[test]
fn test_encode_decode_empty_bytes() {
    let mut buf = BytesMut::new();
    encode_bytes(&[], &mut buf).unwrap();
    assert_eq!(&buf[..], &[0x00, 0x00]);

    let mut encoded = buf.freeze();
    let decoded = decode_bytes(&mut encoded).unwrap();
    assert!(decoded.is_empty());
    assert!(encoded.is_empty());
}

#[test]
fn test_bytes_length_fidelity() {
    for len in [0usize, 1, 2, 255, 256, 1000, 65535] {
        let blob: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let mut buf = BytesMut::new();
        encode_bytes(&blob, &mut buf).unwrap();
        // Trailing bytes must not be swallowed
        buf.extend_from_slice(b"tail");

        let mut encoded = buf.freeze();
        let decoded = decode_bytes(&mut encoded).unwrap();
        assert_eq!(decoded.len(), len);
        assert_eq!(&decoded[..], &blob[..]);
        assert_eq!(&encoded[..], b"tail");
    }
}

#[test]
fn test_encode_bytes_too_large() {
    let blob = vec![0u8; MAX_FIELD_SIZE + 1];
    let mut buf = BytesMut::new();

    match encode_bytes(&blob, &mut buf) {
        Err(NetError::TooLarge { len, max }) => {
            assert_eq!(len, MAX_FIELD_SIZE + 1);
            assert_eq!(max, MAX_FIELD_SIZE);
        }
        other => panic!("Expected TooLarge, got {:?}", other),
    }
    assert!(buf.is_empty());
}

#[test]
fn test_decode_bytes_truncated_prefix() {
    let mut encoded = Bytes::from_static(&[0x00]);

    match decode_bytes(&mut encoded) {
        Err(NetError::Truncated {
            expected,
            available,
        }) => {
            assert_eq!(expected, 2);
            assert_eq!(available, 1);
        }
        other => panic!("Expected Truncated, got {:?}", other),
    }
}

#[test]
fn test_decode_bytes_truncated_body() {
    // Declares 5 bytes, carries 3
    let mut encoded = Bytes::from_static(&[0x00, 0x05, 1, 2, 3]);

    match decode_bytes(&mut encoded) {
        Err(NetError::Truncated {
            expected,
            available,
        }) => {
            assert_eq!(expected, 5);
            assert_eq!(available, 3);
        }
        other => panic!("Expected Truncated, got {:?}", other),
    }
}

// =============================================================================
// String Tests
// =============================================================================

#[test]
fn test_encode_decode_strings() {
    let cases = ["", "svcA", "héllo wörld", "日本語のテキスト", "emoji 🦀🚀"];

    let mut buf = BytesMut::new();
    for s in cases {
        encode_string(s, &mut buf).unwrap();
    }

    let mut encoded = buf.freeze();
    for s in cases {
        assert_eq!(decode_string(&mut encoded).unwrap(), s);
    }
    assert!(encoded.is_empty());
}

#[test]
fn test_string_prefix_counts_bytes_not_chars() {
    let encoded = encode_string_to_vec("é").unwrap();

    assert_eq!(encoded, vec![0x00, 0x02, 0xC3, 0xA9]);
    assert_eq!(decode_string_from_slice(&encoded).unwrap(), "é");
}

#[test]
fn test_decode_string_invalid_utf8() {
    let mut encoded = Bytes::from_static(&[0x00, 0x02, 0xFF, 0xFE]);

    assert!(matches!(
        decode_string(&mut encoded),
        Err(NetError::Protocol(_))
    ));
}

// =============================================================================
// Number Tests
// =============================================================================

#[test]
fn test_numbers_are_big_endian_without_prefix() {
    let mut buf = BytesMut::new();
    encode_number(0x0102u16, &mut buf);
    encode_number(0x03040506u32, &mut buf);
    encode_number(0x0708090A0B0C0D0Eu64, &mut buf);

    assert_eq!(
        &buf[..],
        &[
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E
        ]
    );
}

#[test]
fn test_encode_decode_mixed_numbers() {
    let mut buf = BytesMut::new();
    encode_number(u8::MAX, &mut buf);
    encode_number(-5i8, &mut buf);
    encode_number(-1234i16, &mut buf);
    encode_number(i32::MIN, &mut buf);
    encode_number(u64::MAX, &mut buf);
    encode_number(-42i64, &mut buf);
    encode_number(1.5f32, &mut buf);
    encode_number(-2.25f64, &mut buf);

    let mut encoded = buf.freeze();
    assert_eq!(decode_number::<u8>(&mut encoded).unwrap(), u8::MAX);
    assert_eq!(decode_number::<i8>(&mut encoded).unwrap(), -5);
    assert_eq!(decode_number::<i16>(&mut encoded).unwrap(), -1234);
    assert_eq!(decode_number::<i32>(&mut encoded).unwrap(), i32::MIN);
    assert_eq!(decode_number::<u64>(&mut encoded).unwrap(), u64::MAX);
    assert_eq!(decode_number::<i64>(&mut encoded).unwrap(), -42);
    assert_eq!(decode_number::<f32>(&mut encoded).unwrap(), 1.5);
    assert_eq!(decode_number::<f64>(&mut encoded).unwrap(), -2.25);
    assert!(encoded.is_empty());
}

#[test]
fn test_decode_number_truncated() {
    let mut encoded = Bytes::from_static(&[0x00, 0x01, 0x02]);

    assert!(matches!(
        decode_number::<u32>(&mut encoded),
        Err(NetError::Truncated {
            expected: 4,
            available: 3
        })
    ));
}

#[test]
fn test_mixed_fields_decode_in_order() {
    let mut buf = BytesMut::new();
    encode_string("svcA", &mut buf).unwrap();
    encode_number(42u32, &mut buf);
    encode_bytes(&[9, 8, 7], &mut buf).unwrap();

    let mut encoded = buf.freeze();
    assert_eq!(decode_string(&mut encoded).unwrap(), "svcA");
    assert_eq!(decode_number::<u32>(&mut encoded).unwrap(), 42);
    assert_eq!(&decode_bytes(&mut encoded).unwrap()[..], &[9, 8, 7]);
}
