//! TCP transport
//!
//! Every unit sent on a stream is one frame:
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │         Bytes (Len)         │
//! └──────────┴─────────────────────────────┘
//! ```

use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use bytes::{BufMut, Bytes, BytesMut};
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use super::{hand_off, stopped, wake_addr, Conn, HostConn, ListenState, Net};
use crate::error::{NetError, Result};
use crate::message::Registry;

/// Frame header size: 4 byte big-endian byte count
pub const FRAME_HEADER_SIZE: usize = 4;

/// Maximum frame payload (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// Host Connection
// =============================================================================

/// One TCP stream
///
/// Sends are serialized by a per-connection lock so concurrent senders never
/// interleave frames. Reads take no lock: one consumer reads sequentially.
///
/// A rejected frame header leaves the stream mid-frame, so the connection is
/// shut down and every later `receive` fails with `Closed`.
pub struct TcpHostConn {
    reader: TcpStream,
    writer: Mutex<TcpStream>,
    peer_addr: SocketAddr,
    broken: AtomicBool,
}

impl TcpHostConn {
    /// Wrap a connected stream
    pub fn new(stream: TcpStream) -> Result<Self> {
        let peer_addr = stream.peer_addr()?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let writer = stream.try_clone()?;
        Ok(Self {
            reader: stream,
            writer: Mutex::new(writer),
            peer_addr,
            broken: AtomicBool::new(false),
        })
    }
}

impl HostConn for TcpHostConn {
    fn addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn send(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(NetError::TooLarge {
                len: bytes.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        let mut frame = BytesMut::with_capacity(FRAME_HEADER_SIZE + bytes.len());
        frame.put_u32(bytes.len() as u32);
        frame.put_slice(bytes);

        let mut writer = self.writer.lock();
        writer.write_all(&frame)?;
        writer.flush()?;
        Ok(())
    }

    fn receive(&self) -> Result<Bytes> {
        if self.broken.load(Ordering::Acquire) {
            return Err(NetError::Closed);
        }
        let mut header = [0u8; FRAME_HEADER_SIZE];
        (&self.reader).read_exact(&mut header)?;

        let len = u32::from_be_bytes(header) as usize;
        if len > MAX_FRAME_SIZE {
            tracing::error!(
                "Frame of {} bytes from {} exceeds {}: closing connection",
                len,
                self.peer_addr,
                MAX_FRAME_SIZE
            );
            self.broken.store(true, Ordering::Release);
            let _ = self.reader.shutdown(Shutdown::Both);
            return Err(NetError::TooLarge {
                len,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut payload = vec![0u8; len];
        let read = read_fully(&self.reader, &mut payload);
        if read != len {
            short_read(self.peer_addr, len, read);
        }
        Ok(Bytes::from(payload))
    }

    fn close(&self) -> Result<()> {
        match self.reader.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TcpHostConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.peer_addr)
    }
}

/// Read until `buf` is full or the stream stops yielding bytes
fn read_fully(mut reader: &TcpStream, buf: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!("Read failed mid-frame: {}", e);
                break;
            }
        }
    }
    filled
}

/// A peer declared a frame length and then stopped short.
///
/// Only cooperating peers speak this protocol, so a torn frame means the
/// stream can no longer be trusted.
fn short_read(peer: SocketAddr, expected: usize, read: usize) -> ! {
    tracing::error!(
        "Expected to read {} bytes from {}, read {}: aborting",
        expected,
        peer,
        read
    );
    std::process::abort()
}

// =============================================================================
// Network
// =============================================================================

/// TCP network
///
/// Cheap to clone; clones share the listener and registry.
#[derive(Clone, Default)]
pub struct TcpNet {
    inner: Arc<TcpNetInner>,
}

struct TcpNetInner {
    registry: RwLock<Registry>,
    state: Mutex<ListenState<SocketAddr>>,
}

impl Default for TcpNetInner {
    fn default() -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            state: Mutex::new(ListenState::Unbound),
        }
    }
}

impl TcpNet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Net for TcpNet {
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

        let listener = TcpListener::bind(addr)?;
        let local = listener.local_addr()?;
        let (tx, rx) = bounded(0);
        let (stop_tx, stop_rx) = bounded(0);

        thread::Builder::new()
            .name(format!("tcp-accept-{}", local))
            .spawn(move || accept_loop(listener, tx, stop_rx))?;

        tracing::info!("TCP listening on {}", local);
        *state = ListenState::Listening {
            socket: local,
            stop: stop_tx,
        };
        Ok(rx)
    }

    fn close_listener(&self) -> Result<()> {
        let local = {
            let mut state = self.inner.state.lock();
            match std::mem::replace(&mut *state, ListenState::Closed) {
                // Dropping `stop` here signals the accept loop
                ListenState::Listening { socket, .. } => socket,
                ListenState::Unbound => {
                    *state = ListenState::Unbound;
                    return Err(NetError::NotListening);
                }
                ListenState::Closed => return Ok(()),
            }
        };

        // A blocking accept only returns on a new connection
        let _ = TcpStream::connect(wake_addr(local));
        tracing::info!("TCP listener on {} closed", local);
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        match *self.inner.state.lock() {
            ListenState::Listening { socket, .. } => Some(socket),
            _ => None,
        }
    }

    fn open(&self, addr: &str) -> Result<Conn> {
        let stream = TcpStream::connect(addr)?;
        let conn = TcpHostConn::new(stream)?;
        tracing::debug!("Opened connection to {}", conn.addr());
        Ok(Arc::new(conn))
    }
}

fn accept_loop(listener: TcpListener, tx: Sender<Conn>, stop: Receiver<()>) {
    for stream in listener.incoming() {
        if stopped(&stop) {
            break;
        }
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Error on accept: {}", e);
                break;
            }
        };
        let conn = match TcpHostConn::new(stream) {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Dropping accepted connection: {}", e);
                continue;
            }
        };
        tracing::debug!("Accepted connection from {}", conn.addr());
        if !hand_off(&tx, &stop, Arc::new(conn)) {
            tracing::debug!("Listener closed or accept channel dropped, stopping");
            break;
        }
    }
    tracing::debug!("Accept loop terminated");
}
