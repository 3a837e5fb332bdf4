//! State shared by the TCP and UDP clients
//!
//! Identity, private registry, delivery queue, and service envelope helpers.

use bytes::{Bytes, BytesMut};
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;

use super::ServiceHostConn;
use crate::error::{NetError, Result};
use crate::message::{encode_envelope, Message, MessageDecoder, Registry};
use crate::wire::{decode_string, encode_string};

pub(crate) struct Endpoint {
    id: String,
    self_addr: String,
    registry: RwLock<Registry>,
    inbox_tx: Sender<ServiceHostConn>,
    inbox_rx: Receiver<ServiceHostConn>,
}

impl Endpoint {
    pub(crate) fn new(id: &str, self_addr: &str, capacity: usize) -> Self {
        let (inbox_tx, inbox_rx) = bounded(capacity);
        Self {
            id: id.to_string(),
            self_addr: self_addr.to_string(),
            registry: RwLock::new(Registry::new()),
            inbox_tx,
            inbox_rx,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub(crate) fn inbox(&self) -> &Receiver<ServiceHostConn> {
        &self.inbox_rx
    }

    pub(crate) fn register_decoder(&self, code: u16, decoder: MessageDecoder) {
        self.registry.write().register_decoder(code, decoder);
    }

    /// Hand `conn` to this client's consumer, blocking until it is taken or
    /// the owning service closes (`stop` disconnects)
    pub(crate) fn deliver(&self, conn: ServiceHostConn, stop: &Receiver<()>) {
        tracing::trace!("{}: delivering {}", self.id, conn);
        // The endpoint owns a receiver, so the inbox never disconnects
        crossbeam::select! {
            send(self.inbox_tx, conn) -> _ => {}
            recv(stop) -> _ => {
                tracing::debug!("{}: service closed, delivery dropped", self.id);
            }
        }
    }

    /// Decode an application envelope with this client's registry
    pub(crate) fn decode(&self, envelope: Bytes) -> Result<Box<dyn Message>> {
        let decoded = self.registry.read().decode(envelope);
        if let Err(NetError::UnknownCode(code)) = &decoded {
            tracing::warn!(
                "Unable to deserialize message with code {} for service {}: unknown decoder",
                code,
                self.id
            );
        }
        decoded
    }

    /// Service envelope: lp(own id) + code (2) + body
    pub(crate) fn wrap(&self, buf: &mut BytesMut, message: &dyn Message) -> Result<()> {
        encode_string(&self.id, buf)?;
        buf.extend_from_slice(&encode_envelope(message)?);
        Ok(())
    }
}

/// Split a service envelope into sender id and application envelope
pub(crate) fn unwrap(mut buf: Bytes) -> Result<(String, Bytes)> {
    let sender = decode_string(&mut buf)?;
    if sender.is_empty() {
        return Err(NetError::Protocol("empty sender service id".to_string()));
    }
    Ok((sender, buf))
}
