//! UDP transport
//!
//! One socket carries all traffic. Each datagram is one unit; there is no
//! framing beyond the datagram boundary.

use std::fmt;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Weak};
use std::thread;

use bytes::Bytes;
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use super::{hand_off, stopped, wake_addr, Conn, HostConn, ListenState, Net};
use crate::error::{NetError, Result};
use crate::message::Registry;

/// Default receive buffer for one datagram
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

// =============================================================================
// Host Connection
// =============================================================================

/// A (shared socket, remote address) binding
///
/// Inbound values carry the datagram captured by the receive loop; `receive`
/// hands those bytes back without touching the socket.
///
/// The socket is borrowed weakly: closing the listener releases the port even
/// while conns are still around, and sending on them then fails with `Closed`.
pub struct UdpHostConn {
    socket: Weak<UdpSocket>,
    addr: SocketAddr,
    payload: Option<Bytes>,
}

impl UdpHostConn {
    fn outbound(socket: Weak<UdpSocket>, addr: SocketAddr) -> Self {
        Self {
            socket,
            addr,
            payload: None,
        }
    }

    fn inbound(socket: Weak<UdpSocket>, addr: SocketAddr, payload: Bytes) -> Self {
        Self {
            socket,
            addr,
            payload: Some(payload),
        }
    }
}

impl HostConn for UdpHostConn {
    fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn send(&self, bytes: &[u8]) -> Result<()> {
        let socket = self.socket.upgrade().ok_or(NetError::Closed)?;
        let sent = socket.send_to(bytes, self.addr)?;
        if sent != bytes.len() {
            return Err(NetError::Protocol(format!(
                "Expected to send {} bytes, sent {}",
                bytes.len(),
                sent
            )));
        }
        Ok(())
    }

    fn receive(&self) -> Result<Bytes> {
        self.payload.clone().ok_or(NetError::NothingToReceive)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl fmt::Display for UdpHostConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

// =============================================================================
// Network
// =============================================================================

/// UDP network
///
/// Cheap to clone; clones share the socket and registry.
#[derive(Clone)]
pub struct UdpNet {
    inner: Arc<UdpNetInner>,
}

struct UdpNetInner {
    registry: RwLock<Registry>,
    state: Mutex<ListenState<Arc<UdpSocket>>>,
    buffer_size: usize,
}

impl UdpNet {
    /// Create a network reading datagrams of up to `buffer_size` bytes
    pub fn new(buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(UdpNetInner {
                registry: RwLock::new(Registry::new()),
                state: Mutex::new(ListenState::Unbound),
                buffer_size,
            }),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }
}

impl Default for UdpNet {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl Net for UdpNet {
    fn registry(&self) -> &RwLock<Registry> {
        &self.inner.registry
    }

    fn listen(&self, addr: &str) -> Result<Receiver<Conn>> {
        let mut state = self.inner.state.lock();
        match *state {
            ListenState::Unbound => {}
            ListenState::Listening { .. } => return Err(NetError::AlreadyListening),
            ListenState::Closed => return Err(NetError::Closed),
        }

        let socket = Arc::new(UdpSocket::bind(addr)?);
        let local = socket.local_addr()?;
        let (tx, rx) = bounded(0);
        let (stop_tx, stop_rx) = bounded(0);

        let buffer_size = self.inner.buffer_size;
        let loop_socket = Arc::clone(&socket);
        thread::Builder::new()
            .name(format!("udp-recv-{}", local))
            .spawn(move || receive_loop(loop_socket, buffer_size, tx, stop_rx))?;

        tracing::info!("UDP listening on {}", local);
        *state = ListenState::Listening {
            socket,
            stop: stop_tx,
        };
        Ok(rx)
    }

    fn close_listener(&self) -> Result<()> {
        let socket = {
            let mut state = self.inner.state.lock();
            match std::mem::replace(&mut *state, ListenState::Closed) {
                // Dropping `stop` here signals the receive loop
                ListenState::Listening { socket, .. } => socket,
                ListenState::Unbound => {
                    *state = ListenState::Unbound;
                    return Err(NetError::NotListening);
                }
                ListenState::Closed => return Ok(()),
            }
        };

        let local = socket.local_addr()?;
        // Unblock the pending recv_from
        let _ = socket.send_to(&[], wake_addr(local));
        tracing::info!("UDP listener on {} closed", local);
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.inner.state.lock() {
            ListenState::Listening { socket, .. } => socket.local_addr().ok(),
            _ => None,
        }
    }

    fn open(&self, addr: &str) -> Result<Conn> {
        let socket = match &*self.inner.state.lock() {
            ListenState::Listening { socket, .. } => Arc::downgrade(socket),
            _ => return Err(NetError::NotListening),
        };
        let remote = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| NetError::Config(format!("cannot resolve {}", addr)))?;
        Ok(Arc::new(UdpHostConn::outbound(socket, remote)))
    }
}

fn receive_loop(
    socket: Arc<UdpSocket>,
    buffer_size: usize,
    tx: Sender<Conn>,
    stop: Receiver<()>,
) {
    loop {
        let mut buf = vec![0u8; buffer_size];
        let (n, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            // ICMP errors from an earlier send surface here on some platforms
            Err(e)
                if e.kind() == ErrorKind::ConnectionReset
                    || e.kind() == ErrorKind::ConnectionRefused =>
            {
                continue
            }
            Err(e) => {
                tracing::error!("Error on receive: {}", e);
                break;
            }
        };
        if stopped(&stop) {
            break;
        }
        if n == buffer_size {
            tracing::warn!(
                "Datagram from {} filled the {} byte buffer and may be truncated",
                from,
                buffer_size
            );
        }
        buf.truncate(n);
        let conn = UdpHostConn::inbound(Arc::downgrade(&socket), from, Bytes::from(buf));
        if !hand_off(&tx, &stop, Arc::new(conn)) {
            tracing::debug!("Listener closed or receive channel dropped, stopping");
            break;
        }
    }
    tracing::debug!("Receive loop terminated");
}
