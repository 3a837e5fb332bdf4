//! Wire Module
//!
//! Primitive encoders and decoders every higher-level field is built from.
//!
//! ## Wire Format
//!
//! ### Length-prefixed blob (bytes, strings, service ids)
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (2)  │         Bytes (Len)         │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ### Fixed-width numbers
//! Written as-is in big-endian order, no prefix.

mod codec;

pub use codec::{
    decode_bytes, decode_number, decode_string, decode_string_from_slice, encode_bytes,
    encode_number, encode_string, encode_string_to_vec, WireNumber, LEN_PREFIX_SIZE,
    MAX_FIELD_SIZE,
};
