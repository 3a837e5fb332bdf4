//! TCP service
//!
//! One listener, one handshake thread per accepted connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use bytes::BytesMut;
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use super::endpoint::{unwrap, Endpoint};
use super::{NetClient, NetService, ServiceHostConn, TransportType};
use crate::config::Config;
use crate::error::{NetError, Result};
use crate::message::{Message, MessageDecoder};
use crate::transport::{Conn, Net, TcpNet};
use crate::wire::{decode_string, encode_string};

type Listeners = Arc<RwLock<HashMap<String, Arc<TcpClient>>>>;

// =============================================================================
// Client
// =============================================================================

/// Logical TCP endpoint
pub struct TcpClient {
    endpoint: Endpoint,
    net: TcpNet,
}

impl NetClient for TcpClient {
    fn register_decoder(&self, code: u16, decoder: MessageDecoder) {
        self.endpoint.register_decoder(code, decoder);
    }

    fn recv_from(&self, conn: &mut ServiceHostConn) -> Result<Box<dyn Message>> {
        if let Some(msg) = conn.take_message() {
            return Ok(msg);
        }
        let (sender, envelope) = unwrap(conn.receive()?)?;
        if sender != conn.service_id() {
            tracing::warn!(
                "{}: frame from {} on connection bound to {}",
                self.id(),
                sender,
                conn.service_id()
            );
        }
        self.endpoint.decode(envelope)
    }

    fn send_to(&self, conn: &ServiceHostConn, message: &dyn Message) -> Result<()> {
        let mut buf = BytesMut::new();
        self.endpoint.wrap(&mut buf, message)?;
        tracing::debug!(msg = ?message, to = %conn, "Sending");
        conn.send(&buf)
    }

    fn open_to(&self, addr: &str, id: &str) -> Result<ServiceHostConn> {
        let conn = self.net.open(addr)?;

        let mut hello = BytesMut::new();
        encode_string(id, &mut hello)?;
        encode_string(self.id(), &mut hello)?;

        let acked = conn.send(&hello).and_then(|_| conn.receive());
        let checked = acked.and_then(|ack| {
            if ack.is_empty() {
                Ok(())
            } else {
                Err(NetError::Protocol(format!(
                    "handshake ack from {} carries {} bytes",
                    conn,
                    ack.len()
                )))
            }
        });
        if let Err(e) = checked {
            let _ = conn.close();
            return Err(e);
        }
        Ok(ServiceHostConn::new(conn, id))
    }

    fn accept(&self) -> &Receiver<ServiceHostConn> {
        self.endpoint.inbox()
    }

    fn self_addr(&self) -> &str {
        self.endpoint.self_addr()
    }

    fn transport(&self) -> TransportType {
        TransportType::Tcp
    }

    fn id(&self) -> &str {
        self.endpoint.id()
    }
}

// =============================================================================
// Service
// =============================================================================

/// TCP listener shared by many logical clients
pub struct TcpService {
    config: Config,
    net: TcpNet,
    self_addr: String,
    listeners: Listeners,
    stop: Mutex<Option<Sender<()>>>,
}

impl TcpService {
    /// Bind the configured address and start the accept loop
    pub fn bind(config: Config) -> Result<Self> {
        let net = TcpNet::new();
        let incoming = net.listen(&config.listen_addr)?;
        let self_addr = net
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| config.listen_addr.clone());

        let listeners: Listeners = Arc::new(RwLock::new(HashMap::new()));
        let table = Arc::clone(&listeners);
        let (stop_tx, stop_rx) = bounded(0);
        thread::Builder::new()
            .name(format!("tcp-service-{}", self_addr))
            .spawn(move || {
                for conn in incoming.iter() {
                    let table = Arc::clone(&table);
                    let stop = stop_rx.clone();
                    let spawned = thread::Builder::new()
                        .name("tcp-handshake".to_string())
                        .spawn(move || accept(conn, &table, &stop));
                    if let Err(e) = spawned {
                        tracing::error!("Unable to spawn handshake thread: {}", e);
                    }
                }
                tracing::debug!("TCP service loop terminated");
            })?;

        Ok(Self {
            config,
            net,
            self_addr,
            listeners,
            stop: Mutex::new(Some(stop_tx)),
        })
    }
}

impl NetService for TcpService {
    fn register_listener(&self, id: &str) -> Arc<dyn NetClient> {
        let client = Arc::new(TcpClient {
            endpoint: Endpoint::new(id, &self.self_addr, self.config.delivery_capacity),
            net: self.net.clone(),
        });
        if self
            .listeners
            .write()
            .insert(id.to_string(), Arc::clone(&client))
            .is_some()
        {
            tracing::warn!("Replacing listener for service id {}", id);
        }
        client
    }

    fn configuration(&self) -> &Config {
        &self.config
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.net.local_addr()
    }

    fn close(&self) -> Result<()> {
        // Release handshakes still waiting on a consumer
        self.stop.lock().take();
        self.net.close_listener()
    }
}

impl Drop for TcpService {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Run the handshake on a freshly accepted connection
///
/// Unknown destinations get the socket closed; the initiator is expected to
/// know a listener exists, so there is no retry.
fn accept(
    conn: Conn,
    listeners: &RwLock<HashMap<String, Arc<TcpClient>>>,
    stop: &Receiver<()>,
) {
    tracing::debug!("Accepting: {}", conn);
    if let Err(e) = handshake(&conn, listeners, stop) {
        tracing::error!("Handshake with {} failed: {}", conn, e);
        let _ = conn.close();
    }
}

fn handshake(
    conn: &Conn,
    listeners: &RwLock<HashMap<String, Arc<TcpClient>>>,
    stop: &Receiver<()>,
) -> Result<()> {
    let mut hello = conn.receive()?;
    let destination = decode_string(&mut hello)?;

    let client = listeners
        .read()
        .get(&destination)
        .cloned()
        .ok_or(NetError::UnknownService(destination))?;

    let peer_id = decode_string(&mut hello)?;
    conn.send(&[])?;

    client
        .endpoint
        .deliver(ServiceHostConn::new(Arc::clone(conn), peer_id), stop);
    Ok(())
}
