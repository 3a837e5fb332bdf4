//! # neti
//!
//! A small message-oriented networking layer:
//! - Typed, self-describing messages dispatched by a numeric code
//! - TCP (length-framed streams) and UDP (one message per datagram) transports
//! - Many logical services multiplexed over one physical socket
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            NetClient  "svcA"   "svcB"   "svcC" ...           │
//! │              (private registry + delivery queue)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ route by service id
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      NetService                              │
//! │        (TCP: handshake per conn / UDP: tag per datagram)     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   TcpNet    │          │   UdpNet    │
//!   │ (u32 frames)│          │ (datagrams) │
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬────────────┘
//!                       ▼
//!                ┌─────────────┐
//!                │    wire     │
//!                │ (lp blobs)  │
//!                └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wire;
pub mod message;
pub mod transport;
pub mod service;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{NetError, Result};
pub use config::Config;
pub use message::{Message, MessageDecoder, MessageKind, Registry};
pub use transport::{Conn, HostConn, Net, TcpNet, UdpNet};
pub use service::{
    NetClient, NetService, ServiceHostConn, TcpService, TransportType, UdpService,
};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of neti
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
