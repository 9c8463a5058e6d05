//! Async transport driver for the Java status exchange.

use std::net::SocketAddr;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};
use tracing::trace;

use crate::{
    Error, Java, JavaResponse,
    java::{DEFAULT_JAVA_PORT, Event, StatusExchange},
    tokio::{AsyncPingable, lookup_ip, split_address, srv_override},
};

impl AsyncPingable for Java {
    type Response = JavaResponse;

    async fn ping(self) -> Result<(u64, JavaResponse), Error> {
        match self.timeout {
            Some(deadline) => time::timeout(deadline, exchange(&self))
                .await
                .map_err(|_| Error::PingTimeout)?,
            None => exchange(&self).await,
        }
    }
}

/// Runs the whole exchange: resolve, connect, write the opening packets,
/// then feed received bytes into the state machine until it completes.
///
/// The stream is dropped, and with it closed, on every exit path.
async fn exchange(config: &Java) -> Result<(u64, JavaResponse), Error> {
    let (host, port) = split_address(&config.server_address, DEFAULT_JAVA_PORT)?;
    let (host, port) = srv_override(host, port).await;
    let ip = lookup_ip(&host).await?;

    let mut stream = TcpStream::connect(SocketAddr::new(ip, port)).await?;
    trace!(%ip, port, "connected, sending handshake and status request");

    let (mut status, opening) = StatusExchange::open(&host, port, config.protocol_version);
    stream.write_all(&opening).await?;

    let mut chunk = [0; 1024];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Err(Error::Connection(std::io::ErrorKind::UnexpectedEof.into()));
        }

        let mut event = status.receive(&chunk[..read])?;
        loop {
            match event {
                Event::NeedMoreData => break,
                Event::Send(bytes) => {
                    stream.write_all(&bytes).await?;
                    // The pong may already sit in the receive buffer.
                    event = status.receive(&[])?;
                }
                Event::Complete(latency, response) => {
                    trace!(latency, "status exchange complete");
                    return Ok((latency, response));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::{
        DEFAULT_PROTOCOL_VERSION,
        frame::{Packet, encode_packet, try_decode_packet},
        varint::write_varint,
    };

    const STATUS_JSON: &str = r#"{"version":{"name":"1.20","protocol":763},"players":{"online":5,"max":20},"description":"A server"}"#;

    /// Reads from `stream` until `count` whole packets have been decoded.
    async fn read_packets(stream: &mut TcpStream, count: usize) -> Vec<Packet> {
        let mut buffer = Vec::new();
        let mut packets = Vec::new();
        let mut chunk = [0; 1024];
        while packets.len() < count {
            while let Some((packet, consumed)) = try_decode_packet(&buffer).unwrap() {
                buffer.drain(..consumed);
                packets.push(packet);
            }
            if packets.len() == count {
                break;
            }
            let read = stream.read(&mut chunk).await.unwrap();
            assert_ne!(read, 0, "client hung up early");
            buffer.extend_from_slice(&chunk[..read]);
        }
        packets
    }

    #[tokio::test]
    async fn exchange_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let packets = read_packets(&mut stream, 2).await;
            assert_eq!(packets[0].id, 0x00, "handshake first");
            assert_eq!(packets[1].id, 0x00, "status request second");
            assert!(packets[1].payload.is_empty());

            let mut payload = Vec::new();
            write_varint(&mut payload, STATUS_JSON.len() as i32);
            payload.extend_from_slice(STATUS_JSON.as_bytes());
            stream.write_all(&encode_packet(0x00, &payload)).await.unwrap();

            let ping = read_packets(&mut stream, 1).await.remove(0);
            assert_eq!(ping.id, 0x01);
            assert_eq!(ping.payload.len(), 8);
            stream
                .write_all(&encode_packet(0x01, &ping.payload))
                .await
                .unwrap();
        });

        let (latency, response) = Java {
            server_address: format!("127.0.0.1:{}", addr.port()),
            timeout: Some(Duration::from_secs(5)),
            protocol_version: DEFAULT_PROTOCOL_VERSION,
        }
        .ping()
        .await
        .unwrap();

        assert_eq!(response.players.online, 5);
        assert_eq!(response.players.max, 20);
        assert_eq!(response.version.protocol, 763);
        assert!(latency < 5000, "latency {latency}ms is not plausible");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            // Accept and then say nothing.
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let result = Java {
            server_address: format!("127.0.0.1:{}", addr.port()),
            timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        }
        .ping()
        .await;

        assert!(matches!(result, Err(Error::PingTimeout)));
        server.abort();
    }

    #[tokio::test]
    async fn early_disconnect_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // Drain the opening packets, then hang up without answering.
            let _ = read_packets(&mut stream, 2).await;
        });

        let result = Java {
            server_address: format!("127.0.0.1:{}", addr.port()),
            timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        }
        .ping()
        .await;

        assert!(matches!(result, Err(Error::Connection(_))));
        server.await.unwrap();
    }
}
