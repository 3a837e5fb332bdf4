//! neti multiplexed service demo
//!
//! Two logical clients share one listener. With `--dst`, each of them
//! periodically sends a request to both clients at the destination, which
//! answer with a reply carrying the same mark and sequence number.
//!
//! On TCP the reply comes back on the request's connection and the sender
//! reads it there. On UDP it arrives as a fresh delivery to the sending
//! client and shows up in its receive loop.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use clap::{Parser, ValueEnum};
use neti::wire::{decode_number, decode_string, encode_number, encode_string};
use neti::{Config, Message, NetClient, NetService, TcpService, TransportType, UdpService};
use tracing_subscriber::{fmt, EnvFilter};

const REQUEST: u16 = 1;
const REPLY: u16 = 2;

/// neti service demo
#[derive(Parser, Debug)]
#[command(name = "neti-service")]
#[command(about = "Two logical clients multiplexed over one socket")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:10000")]
    listen: String,

    /// Destination address (host:port)
    #[arg(short, long)]
    dst: Option<String>,

    /// Physical transport
    #[arg(short, long, value_enum, default_value = "tcp")]
    transport: Transport,

    /// UDP datagram buffer size in bytes
    #[arg(short, long, default_value = "1024")]
    buffer_size: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    Tcp,
    Udp,
}

/// Request or reply, told apart by code only
#[derive(Debug, Clone)]
struct Msg {
    code: u16,
    mark: String,
    seqnum: u32,
}

impl Msg {
    fn decoder(code: u16) -> neti::MessageDecoder {
        Arc::new(move |buf: &mut Bytes| -> neti::Result<Box<dyn Message>> {
            let mark = decode_string(buf)?;
            let seqnum = decode_number(buf)?;
            Ok(Box::new(Msg { code, mark, seqnum }))
        })
    }
}

impl Message for Msg {
    fn code(&self) -> u16 {
        self.code
    }

    fn name(&self) -> &str {
        "Msg"
    }

    fn serialize(&self, buf: &mut BytesMut) -> neti::Result<()> {
        encode_string(&self.mark, buf)?;
        encode_number(self.seqnum, buf);
        Ok(())
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

    let config = Config::builder()
        .listen_addr(&args.listen)
        .udp_buffer_size(args.buffer_size)
        .build();

    tracing::info!("neti service v{} on {} ({:?})", neti::VERSION, config, args.transport);

    let service: Box<dyn NetService> = match args.transport {
        Transport::Tcp => TcpService::bind(config).map(|s| Box::new(s) as Box<dyn NetService>),
        Transport::Udp => UdpService::bind(config).map(|s| Box::new(s) as Box<dyn NetService>),
    }
    .unwrap_or_else(|e| {
        tracing::error!("Failed to bind {}: {}", args.listen, e);
        std::process::exit(1);
    });

    let ids = ["client1", "client2"];
    let clients: Vec<Arc<dyn NetClient>> = ids
        .iter()
        .map(|id| {
            let client = service.register_listener(id);
            client.register_decoder(REQUEST, Msg::decoder(REQUEST));
            client.register_decoder(REPLY, Msg::decoder(REPLY));
            client
        })
        .collect();

    let mut handles = Vec::new();
    for client in &clients {
        let client = Arc::clone(client);
        handles.push(thread::spawn(move || receive_loop(&*client)));
    }

    if let Some(dst) = &args.dst {
        for (client, marks) in clients.iter().zip([["A", "B"], ["C", "D"]]) {
            for (dst_id, mark) in ids.iter().zip(marks) {
                let client = Arc::clone(client);
                let dst = dst.clone();
                let dst_id = dst_id.to_string();
                handles.push(thread::spawn(move || {
                    send_loop(&*client, &dst, &dst_id, mark)
                }));
            }
        }
    }

    for handle in handles {
        let _ = handle.join();
    }
}

fn receive_loop(client: &dyn NetClient) {
    for mut conn in client.accept().iter() {
        tracing::info!("{}: Accepted: {}", client.id(), conn);
        match client.recv_from(&mut conn) {
            Ok(msg) => {
                tracing::info!("{}: Received: {:?} from: {}", client.id(), msg, conn.service_id());
                if let Some(request) = msg.downcast_ref::<Msg>().filter(|m| m.code == REQUEST) {
                    let reply = Msg {
                        code: REPLY,
                        ..request.clone()
                    };
                    if let Err(e) = client.send_to(&conn, &reply) {
                        tracing::error!("{}: {}", client.id(), e);
                    }
                }
            }
            Err(e) => tracing::error!("{}: {}", client.id(), e),
        }
        if let Err(e) = conn.close() {
            tracing::error!("{}: {}", client.id(), e);
        }
    }
}

fn send_loop(client: &dyn NetClient, dst: &str, dst_id: &str, mark: &str) {
    let mut seqnum = 0u32;
    loop {
        thread::sleep(Duration::from_secs(1));
        match client.open_to(dst, dst_id) {
            Ok(mut conn) => {
                tracing::info!("{}: Opened: {} to: {}", client.id(), conn, dst_id);
                let msg = Msg {
                    code: REQUEST,
                    mark: mark.to_string(),
                    seqnum,
                };
                seqnum += 1;
                if let Err(e) = client.send_to(&conn, &msg) {
                    tracing::error!("{}: {}", client.id(), e);
                    let _ = conn.close();
                    continue;
                }
                tracing::info!("{}: Sent: {:?} to: {}", client.id(), msg, dst_id);
                if client.transport() == TransportType::Tcp {
                    match client.recv_from(&mut conn) {
                        Ok(reply) => tracing::info!(
                            "{}: Received: {:?} from: {}",
                            client.id(),
                            reply,
                            conn.service_id()
                        ),
                        Err(e) => tracing::error!("{}: {}", client.id(), e),
                    }
                    let _ = conn.close();
                }
            }
            Err(e) => tracing::error!("{}: {}", client.id(), e),
        }
    }
}
