//! Field codec
//!
//! Encoding and decoding of length-prefixed blobs and big-endian numbers.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{NetError, Result};

/// Size of the blob length prefix (u16, big-endian)
pub const LEN_PREFIX_SIZE: usize = 2;

/// Largest blob a length prefix can describe
pub const MAX_FIELD_SIZE: usize = u16::MAX as usize;

// =============================================================================
// Blobs and Strings
// =============================================================================

/// Encode a blob
///
/// Format: len (2) + bytes
pub fn encode_bytes(b: &[u8], buf: &mut BytesMut) -> Result<()> {
    if b.len() > MAX_FIELD_SIZE {
        return Err(NetError::TooLarge {
            len: b.len(),
            max: MAX_FIELD_SIZE,
        });
    }
    buf.reserve(LEN_PREFIX_SIZE + b.len());
    buf.put_u16(b.len() as u16);
    buf.put_slice(b);
    Ok(())
}

/// Decode a blob, consuming the prefix and exactly `len` bytes
pub fn decode_bytes(buf: &mut Bytes) -> Result<Bytes> {
    ensure_remaining(buf, LEN_PREFIX_SIZE)?;
    let len = buf.get_u16() as usize;
    ensure_remaining(buf, len)?;
    Ok(buf.split_to(len))
}

/// Encode a string as its UTF-8 bytes through the blob primitive
pub fn encode_string(s: &str, buf: &mut BytesMut) -> Result<()> {
    encode_bytes(s.as_bytes(), buf)
}

/// Decode a string written by [`encode_string`]
pub fn decode_string(buf: &mut Bytes) -> Result<String> {
    let raw = decode_bytes(buf)?;
    String::from_utf8(raw.to_vec())
        .map_err(|e| NetError::Protocol(format!("invalid UTF-8 in string field: {}", e)))
}

/// Encode a single string into a fresh buffer
pub fn encode_string_to_vec(s: &str) -> Result<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(LEN_PREFIX_SIZE + s.len());
    encode_string(s, &mut buf)?;
    Ok(buf.to_vec())
}

/// Decode a single string from the front of a slice
pub fn decode_string_from_slice(bytes: &[u8]) -> Result<String> {
    let mut buf = Bytes::copy_from_slice(bytes);
    decode_string(&mut buf)
}

// =============================================================================
// Numbers
// =============================================================================

/// A fixed-width number with a big-endian wire representation
pub trait WireNumber: Sized + Copy {
    /// Encoded width in bytes
    const SIZE: usize;

    fn put(self, buf: &mut BytesMut);

    /// Caller guarantees `SIZE` bytes remain
    fn get(buf: &mut Bytes) -> Self;
}

macro_rules! wire_number {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl WireNumber for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn put(self, buf: &mut BytesMut) {
                    buf.$put(self);
                }

                fn get(buf: &mut Bytes) -> Self {
                    buf.$get()
                }
            }
        )*
    };
}

wire_number! {
    u8 => put_u8, get_u8;
    i8 => put_i8, get_i8;
    u16 => put_u16, get_u16;
    i16 => put_i16, get_i16;
    u32 => put_u32, get_u32;
    i32 => put_i32, get_i32;
    u64 => put_u64, get_u64;
    i64 => put_i64, get_i64;
    f32 => put_f32, get_f32;
    f64 => put_f64, get_f64;
}

/// Encode a number in big-endian order
pub fn encode_number<N: WireNumber>(n: N, buf: &mut BytesMut) {
    n.put(buf);
}

/// Decode a big-endian number
pub fn decode_number<N: WireNumber>(buf: &mut Bytes) -> Result<N> {
    ensure_remaining(buf, N::SIZE)?;
    Ok(N::get(buf))
}

fn ensure_remaining(buf: &Bytes, expected: usize) -> Result<()> {
    if buf.remaining() < expected {
        return Err(NetError::Truncated {
            expected,
            available: buf.remaining(),
        });
    }
    Ok(())
}
