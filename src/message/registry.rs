//! Message registry
//!
//! Maps wire codes to decoders and frames messages in the application envelope.

use std::collections::HashMap;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Message, MessageDecoder, MessageKind};
use crate::error::{NetError, Result};

/// Size of the message code that prefixes every application envelope
pub const CODE_SIZE: usize = 2;

/// Dispatch table from message code to decoder
#[derive(Default, Clone)]
pub struct Registry {
    decoders: HashMap<u16, MessageDecoder>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message kind under its static code
    ///
    /// # Panics
    /// If the code is already registered. Duplicate codes are a setup bug,
    /// never a traffic condition.
    pub fn register<M: MessageKind>(&mut self) {
        self.register_decoder(M::CODE, M::decoder());
    }

    /// Register a decoder under an explicit code
    ///
    /// # Panics
    /// If the code is already registered.
    pub fn register_decoder(&mut self, code: u16, decoder: MessageDecoder) {
        if let Err(e) = self.try_register_decoder(code, decoder) {
            panic!("{}", e);
        }
    }

    /// Register a message kind, reporting a duplicate code as an error
    pub fn try_register<M: MessageKind>(&mut self) -> Result<()> {
        self.try_register_decoder(M::CODE, M::decoder())
    }

    /// Register a decoder, reporting a duplicate code as an error
    pub fn try_register_decoder(&mut self, code: u16, decoder: MessageDecoder) -> Result<()> {
        if self.decoders.contains_key(&code) {
            return Err(NetError::DuplicateCode(code));
        }
        self.decoders.insert(code, decoder);
        Ok(())
    }

    pub fn contains(&self, code: u16) -> bool {
        self.decoders.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode a full application envelope: code (2) + body
    pub fn decode(&self, mut buf: Bytes) -> Result<Box<dyn Message>> {
        if buf.remaining() < CODE_SIZE {
            return Err(NetError::Truncated {
                expected: CODE_SIZE,
                available: buf.remaining(),
            });
        }
        let code = buf.get_u16();
        self.decode_payload(code, buf)
    }

    /// Decode a body whose code was read separately
    pub fn decode_payload(&self, code: u16, mut body: Bytes) -> Result<Box<dyn Message>> {
        let decoder = self.decoders.get(&code).ok_or(NetError::UnknownCode(code))?;
        decoder(&mut body)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.decoders.keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("Registry").field("codes", &codes).finish()
    }
}

/// Encode a message as an application envelope
///
/// Format: code (2) + serialized body
pub fn encode_envelope(message: &dyn Message) -> Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u16(message.code());
    message.serialize(&mut buf)?;
    Ok(buf)
}
