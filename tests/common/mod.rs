//! Message kinds shared by the integration tests

#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use neti::wire::{decode_bytes, decode_number, decode_string, encode_bytes, encode_number, encode_string};
use neti::{Message, MessageKind};

/// Upper bound for any blocking wait in a test
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait before concluding nothing was delivered
pub const QUIET: Duration = Duration::from_millis(300);

/// Retry `attempt` until it succeeds or TIMEOUT passes
pub fn eventually<T, E>(mut attempt: impl FnMut() -> Result<T, E>) -> Result<T, E> {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) if Instant::now() >= deadline => return Err(e),
            Err(_) => thread::sleep(Duration::from_millis(20)),
        }
    }
}

// =============================================================================
// Point: code 7, one number
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: u32,
}

impl Message for Point {
    fn code(&self) -> u16 {
        Self::CODE
    }

    fn name(&self) -> &str {
        "Point"
    }

    fn serialize(&self, buf: &mut BytesMut) -> neti::Result<()> {
        encode_number(self.x, buf);
        Ok(())
    }
}

impl MessageKind for Point {
    const CODE: u16 = 7;

    fn deserialize(buf: &mut Bytes) -> neti::Result<Self> {
        Ok(Point {
            x: decode_number(buf)?,
        })
    }
}

// =============================================================================
// Note: code 1, strings, blob and a number
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub author: String,
    pub text: String,
    pub blob: Vec<u8>,
    pub seq: u64,
}

impl Note {
    pub fn new(author: &str, text: &str, seq: u64) -> Self {
        Self {
            author: author.to_string(),
            text: text.to_string(),
            blob: text.as_bytes().to_vec(),
            seq,
        }
    }
}

impl Message for Note {
    fn code(&self) -> u16 {
        Self::CODE
    }

    fn name(&self) -> &str {
        "Note"
    }

    fn serialize(&self, buf: &mut BytesMut) -> neti::Result<()> {
        encode_string(&self.author, buf)?;
        encode_string(&self.text, buf)?;
        encode_bytes(&self.blob, buf)?;
        encode_number(self.seq, buf);
        Ok(())
    }
}

impl MessageKind for Note {
    const CODE: u16 = 1;

    fn deserialize(buf: &mut Bytes) -> neti::Result<Self> {
        Ok(Note {
            author: decode_string(buf)?,
            text: decode_string(buf)?,
            blob: decode_bytes(buf)?.to_vec(),
            seq: decode_number(buf)?,
        })
    }
}

// =============================================================================
// Clash: shares code 7 with Point
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Clash;

impl Message for Clash {
    fn code(&self) -> u16 {
        Self::CODE
    }

    fn name(&self) -> &str {
        "Clash"
    }

    fn serialize(&self, _buf: &mut BytesMut) -> neti::Result<()> {
        Ok(())
    }
}

impl MessageKind for Clash {
    const CODE: u16 = 7;

    fn deserialize(_buf: &mut Bytes) -> neti::Result<Self> {
        Ok(Clash)
    }
}
