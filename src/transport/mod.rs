//! Transport Module
//!
//! Physical sockets, framing, and message dispatch by code.
//!
//! ## Architecture
//! - One [`Net`] owns at most one listening socket and one background
//!   accept/receive thread
//! - Inbound peers are handed out as [`Conn`] values on a rendezvous channel
//! - `recv_from`/`send_to` add the application envelope (code + body) on top
//!   of the raw `HostConn` byte transfer
//!
//! ## State Machine
//! ```text
//! Unbound ──listen──▶ Listening ──close_listener──▶ Closed
//! ```
//! `open` is independent of the state for TCP. UDP reuses the listening socket
//! for all traffic, so `open` requires `Listening`.

mod tcp;
mod udp;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{Receiver, Sender, TryRecvError};
use parking_lot::RwLock;

use crate::error::Result;
use crate::message::{encode_envelope, Message, MessageDecoder, MessageKind, Registry};

pub use tcp::{TcpHostConn, TcpNet, FRAME_HEADER_SIZE, MAX_FRAME_SIZE};
pub use udp::{UdpHostConn, UdpNet, DEFAULT_BUFFER_SIZE};

/// Shared handle to a physical peer binding
pub type Conn = Arc<dyn HostConn>;

/// One physical peer binding
///
/// A persistent stream for TCP, or a (shared socket, remote address) pair for
/// UDP.
pub trait HostConn: fmt::Display + Send + Sync {
    /// Remote address
    fn addr(&self) -> SocketAddr;

    /// Send one unit of bytes to the peer
    fn send(&self, bytes: &[u8]) -> Result<()>;

    /// Receive one unit of bytes from the peer
    fn receive(&self) -> Result<bytes::Bytes>;

    fn close(&self) -> Result<()>;
}

/// Outcome of [`Net::open_async`]
pub struct ReceivedConnection {
    pub addr: String,
    pub conn: Result<Conn>,
}

/// Outcome of [`Net::recv_from_async`]
pub struct ReceivedMessage {
    pub conn: Conn,
    pub msg: Result<Box<dyn Message>>,
}

/// Outcome of [`Net::send_to_async`]
pub struct SentMessage {
    pub conn: Conn,
    pub msg: Box<dyn Message>,
    pub result: Result<()>,
}

/// A physical network: TCP or UDP
pub trait Net: Send + Sync {
    /// Decoders for messages arriving on this network
    fn registry(&self) -> &RwLock<Registry>;

    /// Bind `addr` and start the accept/receive loop
    ///
    /// The returned channel yields one `Conn` per accepted stream (TCP) or per
    /// received datagram (UDP). It disconnects when the listener closes.
    fn listen(&self, addr: &str) -> Result<Receiver<Conn>>;

    /// Close the listening socket, terminating the loop
    fn close_listener(&self) -> Result<()>;

    /// Bound address while listening
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Bind to a remote peer
    fn open(&self, addr: &str) -> Result<Conn>;

    /// Register a decoder under `code`
    ///
    /// # Panics
    /// If the code is already registered on this network.
    fn register_decoder(&self, code: u16, decoder: MessageDecoder) {
        self.registry().write().register_decoder(code, decoder);
    }

    /// Register a message kind under its static code
    ///
    /// # Panics
    /// If the code is already registered on this network.
    fn register<M: MessageKind>(&self)
    where
        Self: Sized,
    {
        self.registry().write().register::<M>();
    }

    /// Receive and decode one message
    fn recv_from(&self, conn: &Conn) -> Result<Box<dyn Message>> {
        let bytes = conn.receive()?;
        self.registry().read().decode(bytes)
    }

    /// Encode and send one message
    fn send_to(&self, conn: &Conn, message: &dyn Message) -> Result<()> {
        let envelope = encode_envelope(message)?;
        tracing::debug!(
            msg = ?message,
            to = %conn.addr(),
            size = envelope.len(),
            "Sending"
        );
        conn.send(&envelope)
    }

    /// `open` on a separate thread, reporting on `tx`
    fn open_async(&self, addr: &str, tx: Sender<ReceivedConnection>)
    where
        Self: Clone + 'static,
    {
        let net = self.clone();
        let addr = addr.to_string();
        thread::spawn(move || {
            let conn = net.open(&addr);
            let _ = tx.send(ReceivedConnection { addr, conn });
        });
    }

    /// `recv_from` on a separate thread, reporting on `tx`
    fn recv_from_async(&self, conn: Conn, tx: Sender<ReceivedMessage>)
    where
        Self: Clone + 'static,
    {
        let net = self.clone();
        thread::spawn(move || {
            let msg = net.recv_from(&conn);
            let _ = tx.send(ReceivedMessage { conn, msg });
        });
    }

    /// `send_to` on a separate thread, reporting on `tx`
    fn send_to_async(&self, conn: Conn, msg: Box<dyn Message>, tx: Sender<SentMessage>)
    where
        Self: Clone + 'static,
    {
        let net = self.clone();
        thread::spawn(move || {
            let result = net.send_to(&conn, &*msg);
            let _ = tx.send(SentMessage { conn, msg, result });
        });
    }
}

/// Listener lifecycle shared by both transports
///
/// Dropping `stop` disconnects the loop's stop receiver, which ends the loop
/// even while it waits on a hand-off nobody takes.
#[derive(Debug)]
enum ListenState<S> {
    Unbound,
    Listening { socket: S, stop: Sender<()> },
    Closed,
}

/// True once the owning `Net` closed its listener
fn stopped(stop: &Receiver<()>) -> bool {
    matches!(stop.try_recv(), Err(TryRecvError::Disconnected))
}

/// Hand `conn` to the listener's consumer unless the listener closes first
///
/// Returns false when the loop should end.
fn hand_off(tx: &Sender<Conn>, stop: &Receiver<()>, conn: Conn) -> bool {
    crossbeam::select! {
        send(tx, conn) -> sent => sent.is_ok(),
        recv(stop) -> _ => false,
    }
}

/// Address to poke a listener bound to `local` so a blocked accept/recv wakes up
fn wake_addr(local: SocketAddr) -> SocketAddr {
    let mut addr = local;
    if addr.ip().is_unspecified() {
        match addr {
            SocketAddr::V4(_) => addr.set_ip(std::net::Ipv4Addr::LOCALHOST.into()),
            SocketAddr::V6(_) => addr.set_ip(std::net::Ipv6Addr::LOCALHOST.into()),
        }
    }
    addr
}
