//! Service Module
//!
//! Many logical endpoints, each named by a string id, sharing one physical
//! listening socket.
//!
//! ## Architecture
//! - A [`NetService`] owns one [`Net`](crate::transport::Net) and an
//!   id → client table
//! - The service's single loop decodes the routing envelope and hands the
//!   work to the addressed [`NetClient`]'s delivery queue
//! - TCP: one handshake per connection names the destination; a thread per
//!   accepted connection performs it
//! - UDP: every datagram names its destination; one loop delivers them in
//!   arrival order
//!
//! ## Wire Format
//! ```text
//! TCP handshake frame:  │ lp(destination id) │ lp(own id) │
//! TCP handshake ack:    │ empty frame │
//! TCP data frame:       │ lp(sender id) │ code (2) │ body │
//! UDP datagram:         │ lp(destination id) │ lp(sender id) │ code (2) │ body │
//! ```
//! `lp` is the 2 byte length-prefixed blob from [`crate::wire`].
//!
//! ## Backpressure
//! Delivery blocks until the client's consumer takes the connection (or until
//! there is room when `delivery_capacity` > 0). On UDP one stalled consumer
//! therefore stalls delivery to every id on that socket.

mod conn;
mod endpoint;
mod tcp;
mod udp;

use std::net::SocketAddr;
use std::sync::Arc;

use crossbeam::channel::Receiver;

use crate::config::Config;
use crate::error::Result;
use crate::message::{Message, MessageDecoder, MessageKind};

pub use conn::ServiceHostConn;
pub use tcp::{TcpClient, TcpService};
pub use udp::{UdpClient, UdpService};

/// Physical transport under a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransportType {
    Udp = 1,
    Tcp = 2,
}

/// One logical endpoint of a [`NetService`]
pub trait NetClient: Send + Sync {
    /// Register a decoder for messages this client receives
    ///
    /// # Panics
    /// If the code is already registered on this client.
    fn register_decoder(&self, code: u16, decoder: MessageDecoder);

    /// Receive one message on `conn`
    fn recv_from(&self, conn: &mut ServiceHostConn) -> Result<Box<dyn Message>>;

    /// Send one message on `conn`, tagged with this client's id
    fn send_to(&self, conn: &ServiceHostConn, message: &dyn Message) -> Result<()>;

    /// Bind to the client named `id` on the service listening at `addr`
    fn open_to(&self, addr: &str, id: &str) -> Result<ServiceHostConn>;

    /// Inbound connections (TCP) or messages (UDP) addressed to this client
    fn accept(&self) -> &Receiver<ServiceHostConn>;

    /// Listen address of the owning service
    fn self_addr(&self) -> &str;

    fn transport(&self) -> TransportType;

    fn id(&self) -> &str;
}

impl dyn NetClient {
    /// Register a message kind under its static code
    ///
    /// # Panics
    /// If the code is already registered on this client.
    pub fn register<M: MessageKind>(&self) {
        self.register_decoder(M::CODE, M::decoder());
    }
}

/// A listening address shared by many logical clients
pub trait NetService: Send + Sync {
    /// Create the client for `id`
    ///
    /// Registering an id twice replaces the earlier client. Register every id
    /// before traffic for it is expected.
    fn register_listener(&self, id: &str) -> Arc<dyn NetClient>;

    fn configuration(&self) -> &Config;

    /// Bound address while the listener is open
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Close the physical listener, ending the service loop
    fn close(&self) -> Result<()>;
}
