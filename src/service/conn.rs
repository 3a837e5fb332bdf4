//! Service host connection
//!
//! A physical connection tagged with the logical id of the remote client.

use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::error::Result;
use crate::message::Message;
use crate::transport::Conn;

/// A [`HostConn`](crate::transport::HostConn) plus the remote service id
///
/// For TCP the id is fixed by the handshake and lasts as long as the stream.
/// For UDP every inbound datagram produces a fresh value carrying the sender's
/// id and the already-decoded message, which `recv_from` consumes once.
pub struct ServiceHostConn {
    conn: Conn,
    service_id: String,
    msg: Option<Box<dyn Message>>,
}

impl ServiceHostConn {
    pub fn new(conn: Conn, service_id: impl Into<String>) -> Self {
        Self {
            conn,
            service_id: service_id.into(),
            msg: None,
        }
    }

    pub(crate) fn with_message(conn: Conn, service_id: String, msg: Box<dyn Message>) -> Self {
        Self {
            conn,
            service_id,
            msg: Some(msg),
        }
    }

    /// Id of the client on the other end
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Underlying physical connection
    pub fn conn(&self) -> &Conn {
        &self.conn
    }

    /// The attached message, if not consumed yet
    pub fn message(&self) -> Option<&(dyn Message + 'static)> {
        self.msg.as_deref()
    }

    /// Take the attached message, leaving none behind
    pub fn take_message(&mut self) -> Option<Box<dyn Message>> {
        self.msg.take()
    }

    pub fn addr(&self) -> SocketAddr {
        self.conn.addr()
    }

    /// Raw send on the physical connection
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        self.conn.send(bytes)
    }

    /// Raw receive on the physical connection
    pub fn receive(&self) -> Result<Bytes> {
        self.conn.receive()
    }

    pub fn close(&self) -> Result<()> {
        self.conn.close()
    }
}

impl fmt::Display for ServiceHostConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.service_id, self.conn)
    }
}

impl fmt::Debug for ServiceHostConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHostConn")
            .field("service_id", &self.service_id)
            .field("addr", &self.conn.addr())
            .field("msg", &self.msg)
            .finish()
    }
}
