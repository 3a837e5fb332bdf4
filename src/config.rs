//! Configuration for neti
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{NetError, Result};

/// Configuration for one listening service
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Listen address (host:port)
    pub listen_addr: String,

    /// Receive buffer for a single UDP datagram (in bytes).
    /// Longer datagrams are truncated by the socket.
    pub udp_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Delivery Configuration
    // -------------------------------------------------------------------------
    /// Capacity of each logical client's inbound queue.
    /// 0 means an unbuffered hand-off: the delivering loop blocks until the
    /// client's consumer takes the connection.
    pub delivery_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:10000".to_string(),
            udp_buffer_size: 1024,
            delivery_capacity: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The listen address as given
    pub fn address(&self) -> &str {
        &self.listen_addr
    }

    /// Host part of the listen address
    pub fn ip(&self) -> &str {
        match self.listen_addr.rsplit_once(':') {
            Some((host, _)) => host,
            None => &self.listen_addr,
        }
    }

    /// Port part of the listen address
    pub fn port(&self) -> Result<u16> {
        let (_, port) = self
            .listen_addr
            .rsplit_once(':')
            .ok_or_else(|| NetError::Config(format!("missing port in {}", self.listen_addr)))?;
        port.parse()
            .map_err(|_| NetError::Config(format!("invalid port in {}", self.listen_addr)))
    }

    /// Same host, different port
    pub fn with_port(&self, port: u16) -> String {
        format!("{}:{}", self.ip(), port)
    }

    /// Resolve the listen address to a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| NetError::Config(format!("cannot resolve {}", self.listen_addr)))
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ip: {}, port: {}, buffsize: {}}}",
            self.ip(),
            self.port().map(|p| p.to_string()).unwrap_or_default(),
            self.udp_buffer_size
        )
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the UDP receive buffer size (in bytes)
    pub fn udp_buffer_size(mut self, size: usize) -> Self {
        self.config.udp_buffer_size = size;
        self
    }

    /// Set the capacity of each client's delivery queue
    pub fn delivery_capacity(mut self, capacity: usize) -> Self {
        self.config.delivery_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
