//! UDP service
//!
//! One socket, one receive loop, strictly sequential delivery.

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
use crate::transport::{Conn, Net, UdpNet};
use crate::wire::{decode_string, encode_string};

type Listeners = Arc<RwLock<HashMap<String, Arc<UdpClient>>>>;

// =============================================================================
// Client
// =============================================================================

/// Logical UDP endpoint
pub struct UdpClient {
    endpoint: Endpoint,
    net: UdpNet,
}

impl NetClient for UdpClient {
    fn register_decoder(&self, code: u16, decoder: MessageDecoder) {
        self.endpoint.register_decoder(code, decoder);
    }

    /// Returns the message attached at delivery, exactly once
    fn recv_from(&self, conn: &mut ServiceHostConn) -> Result<Box<dyn Message>> {
        conn.take_message().ok_or(NetError::NothingToReceive)
    }

    fn send_to(&self, conn: &ServiceHostConn, message: &dyn Message) -> Result<()> {
        let mut datagram = BytesMut::new();
        encode_string(conn.service_id(), &mut datagram)?;
        self.endpoint.wrap(&mut datagram, message)?;
        tracing::debug!(msg = ?message, to = %conn, size = datagram.len(), "Sending");
        conn.send(&datagram)
    }

    fn open_to(&self, addr: &str, id: &str) -> Result<ServiceHostConn> {
        let conn = self.net.open(addr)?;
        Ok(ServiceHostConn::new(conn, id))
    }

    fn accept(&self) -> &Receiver<ServiceHostConn> {
        self.endpoint.inbox()
    }

    fn self_addr(&self) -> &str {
        self.endpoint.self_addr()
    }

    fn transport(&self) -> TransportType {
        TransportType::Udp
    }

    fn id(&self) -> &str {
        self.endpoint.id()
    }
}

// =============================================================================
// Service
// =============================================================================

/// UDP socket shared by many logical clients
pub struct UdpService {
    config: Config,
    net: UdpNet,
    self_addr: String,
    listeners: Listeners,
    stop: Mutex<Option<Sender<()>>>,
}

impl UdpService {
    /// Bind the configured address and start the receive loop
    pub fn bind(config: Config) -> Result<Self> {
        let net = UdpNet::new(config.udp_buffer_size);
        let incoming = net.listen(&config.listen_addr)?;
        let self_addr = net
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| config.listen_addr.clone());

        let listeners: Listeners = Arc::new(RwLock::new(HashMap::new()));
        let table = Arc::clone(&listeners);
        let (stop_tx, stop_rx) = bounded(0);
        thread::Builder::new()
            .name(format!("udp-service-{}", self_addr))
            .spawn(move || {
                for conn in incoming.iter() {
                    if let Err(e) = deliver(&conn, &table, &stop_rx) {
                        tracing::error!("Dropping datagram from {}: {}", conn, e);
                    }
                }
                tracing::debug!("UDP service loop terminated");
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

impl NetService for UdpService {
    fn register_listener(&self, id: &str) -> Arc<dyn NetClient> {
        let client = Arc::new(UdpClient {
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
        // Unblock a delivery stalled on a slow consumer
        self.stop.lock().take();
        self.net.close_listener()
    }
}

impl Drop for UdpService {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Route one datagram: lp(destination) + lp(sender) + code + body
fn deliver(
    conn: &Conn,
    listeners: &RwLock<HashMap<String, Arc<UdpClient>>>,
    stop: &Receiver<()>,
) -> Result<()> {
    let mut datagram = conn.receive()?;
    let destination = decode_string(&mut datagram)?;

    let client = listeners
        .read()
        .get(&destination)
        .cloned()
        .ok_or(NetError::UnknownService(destination))?;

    let (sender, envelope) = unwrap(datagram)?;
    let msg = client.endpoint.decode(envelope)?;
    client
        .endpoint
        .deliver(ServiceHostConn::with_message(Arc::clone(conn), sender, msg), stop);
    Ok(())
}
