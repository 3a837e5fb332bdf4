//! neti ping-pong demo
//!
//! Listens on `host`, answers every Ping with a Pong, and pings `target`
//! every two seconds over a raw TcpNet.

use std::thread;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use clap::Parser;
use neti::{Conn, Message, MessageKind, Net, TcpNet};
use tracing_subscriber::{fmt, EnvFilter};

/// neti ping-pong
#[derive(Parser, Debug)]
#[command(name = "neti-pingpong")]
#[command(about = "Ping-pong between two TCP peers")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    host: String,

    /// Peer address (host:port)
    target: String,

    /// Seconds between pings
    #[arg(short, long, default_value = "2")]
    interval: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct Ping;

impl Message for Ping {
    fn code(&self) -> u16 {
        Self::CODE
    }

    fn name(&self) -> &str {
        "Ping"
    }

    fn serialize(&self, _buf: &mut BytesMut) -> neti::Result<()> {
        Ok(())
    }
}

impl MessageKind for Ping {
    const CODE: u16 = 1;

    fn deserialize(_buf: &mut Bytes) -> neti::Result<Self> {
        Ok(Ping)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Pong;

impl Message for Pong {
    fn code(&self) -> u16 {
        Self::CODE
    }

    fn name(&self) -> &str {
        "Pong"
    }

    fn serialize(&self, _buf: &mut BytesMut) -> neti::Result<()> {
        Ok(())
    }
}

impl MessageKind for Pong {
    const CODE: u16 = 2;

    fn deserialize(_buf: &mut Bytes) -> neti::Result<Self> {
        Ok(Pong)
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,neti=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("neti ping-pong v{}", neti::VERSION);

    let tcp = TcpNet::new();
    tcp.register::<Ping>();
    tcp.register::<Pong>();

    let listener = match tcp.listen(&args.host) {
        Ok(rx) => rx,
        Err(e) => {
            tracing::error!("Failed to listen on {}: {}", args.host, e);
            std::process::exit(1);
        }
    };

    let server = tcp.clone();
    thread::spawn(move || {
        for conn in listener.iter() {
            let net = server.clone();
            thread::spawn(move || answer(&net, conn));
        }
    });

    let conn = loop {
        match tcp.open(&args.target) {
            Ok(conn) => break conn,
            Err(e) => {
                tracing::info!("Waiting for {}: {}", args.target, e);
                thread::sleep(Duration::from_secs(1));
            }
        }
    };

    loop {
        if let Err(e) = tcp.send_to(&conn, &Ping) {
            tracing::error!("Send failed: {}", e);
            std::process::exit(1);
        }
        match tcp.recv_from(&conn) {
            Ok(msg) => tracing::info!("Received msg {} from conn {}", msg.name(), conn.addr()),
            Err(e) => {
                tracing::error!("Receive failed: {}", e);
                std::process::exit(1);
            }
        }
        thread::sleep(Duration::from_secs(args.interval));
    }
}

fn answer(net: &TcpNet, conn: Conn) {
    loop {
        let msg = match net.recv_from(&conn) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::info!("Connection {} ended: {}", conn, e);
                return;
            }
        };
        tracing::info!("Received msg {} from conn {}", msg.name(), conn.addr());
        if let Err(e) = net.send_to(&conn, &Pong) {
            tracing::error!("Reply to {} failed: {}", conn, e);
            return;
        }
    }
}
