//! Async transport driver for the Bedrock unconnected ping.

use tokio::{net::UdpSocket, time};
use tracing::trace;

use crate::{
    Bedrock, BedrockResponse, Error,
    bedrock::{
        DEFAULT_BEDROCK_PORT, DEFAULT_TIMEOUT, decode_unconnected_pong, encode_unconnected_ping,
        wall_clock_millis,
    },
    tokio::{AsyncPingable, lookup_ip, split_address},
};

impl AsyncPingable for Bedrock {
    type Response = BedrockResponse;

    async fn ping(self) -> Result<(u64, BedrockResponse), Error> {
        let (host, port) = split_address(&self.server_address, DEFAULT_BEDROCK_PORT)?;
        let ip = lookup_ip(host).await?;

        let socket = UdpSocket::bind(self.socket_addresses.as_slice()).await?;
        socket.connect((ip, port)).await?;

        let probe = encode_unconnected_ping(wall_clock_millis(), rand::random());
        socket.send(&probe).await?;
        trace!(%ip, port, "unconnected ping sent");

        // The pong and the deadline race; whichever fires first wins, and
        // the socket drops on both paths.
        let deadline = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let mut datagram = [0; 1500];
        let read = time::timeout(deadline, socket.recv(&mut datagram))
            .await
            .map_err(|_| Error::PingTimeout)??;

        let (echoed, response) = decode_unconnected_pong(&datagram[..read])?;
        let latency = wall_clock_millis().saturating_sub(echoed);
        trace!(latency, "unconnected pong received");
        Ok((latency, response))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::{Ipv4Addr, SocketAddr},
        time::Duration,
    };

    use super::*;
    use crate::{BedrockEdition, bedrock::tests::pong_datagram};

    fn ephemeral_bind() -> Vec<SocketAddr> {
        vec![SocketAddr::from((Ipv4Addr::LOCALHOST, 0))]
    }

    #[tokio::test]
    async fn exchange_against_local_responder() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = responder.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut probe = [0; 64];
            let (read, from) = responder.recv_from(&mut probe).await.unwrap();
            assert_eq!(read, 33, "probe must be exactly 33 bytes");
            assert_eq!(probe[0], 0x01);

            // Echo the probe's timestamp back, as a real server would.
            let mut echoed = [0; 8];
            echoed.copy_from_slice(&probe[1..9]);
            let pong = pong_datagram(
                u64::from_be_bytes(echoed),
                "MCPE;Test;475;1.20;3;10;123456;World;Survival;0;19132;19133",
            );
            responder.send_to(&pong, from).await.unwrap();
        });

        let (latency, response) = Bedrock {
            server_address: format!("127.0.0.1:{}", addr.port()),
            timeout: Some(Duration::from_secs(5)),
            socket_addresses: ephemeral_bind(),
        }
        .ping()
        .await
        .unwrap();

        assert_eq!(response.edition, BedrockEdition::PocketEdition);
        assert_eq!(response.players_online, 3);
        assert_eq!(response.players_max, 10);
        assert!(latency < 5000, "latency {latency}ms is not plausible");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // Bound but never reads or replies.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap();

        let result = Bedrock {
            server_address: format!("127.0.0.1:{}", addr.port()),
            timeout: Some(Duration::from_millis(100)),
            socket_addresses: ephemeral_bind(),
        }
        .ping()
        .await;

        assert!(matches!(result, Err(Error::PingTimeout)));
    }

    #[tokio::test]
    async fn wrong_pong_id_is_rejected() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = responder.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut probe = [0; 64];
            let (_, from) = responder.recv_from(&mut probe).await.unwrap();
            let mut pong = pong_datagram(0, "MCPE;Test;475;1.20;3;10;1;W;S;0;1;2");
            pong[0] = 0x7F;
            responder.send_to(&pong, from).await.unwrap();
        });

        let result = Bedrock {
            server_address: format!("127.0.0.1:{}", addr.port()),
            timeout: Some(Duration::from_secs(5)),
            socket_addresses: ephemeral_bind(),
        }
        .ping()
        .await;

        assert!(matches!(result, Err(Error::InvalidPacketId(0x7F))));
        server.await.unwrap();
    }
}
