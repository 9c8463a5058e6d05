//! The Java edition status protocol: handshake, status request, ping.
//! [Server List Ping](https://wiki.vg/Server_List_Ping)

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::{
    Error,
    frame::{encode_packet, try_decode_packet},
    varint::{read_varint, write_varint},
};

/// The default port of a Java edition server.
pub const DEFAULT_JAVA_PORT: u16 = 25565;

/// The handshake protocol-version sentinel meaning "not a real client".
///
/// Status queries do not need to advertise a genuine client version, and
/// implementations in the wild disagree on what to send here, so
/// [`Java::protocol_version`] is left configurable with this as the default.
pub const DEFAULT_PROTOCOL_VERSION: i32 = -1;

const HANDSHAKE_ID: i32 = 0x00;
const STATUS_REQUEST_ID: i32 = 0x00;
const STATUS_RESPONSE_ID: i32 = 0x00;
const PING_ID: i32 = 0x01;
const PONG_ID: i32 = 0x01;

/// Configuration for pinging a Java server.
///
/// # Examples
///
/// ```
/// use piglin::Java;
/// use std::time::Duration;
///
/// let java_config = Java {
///     server_address: "mc.hypixel.net".to_string(),
///     timeout: Some(Duration::from_secs(10)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Java {
    /// The java server address.
    ///
    /// This can be either an IP or a hostname, and both may optionally have a
    /// port at the end.
    ///
    /// DNS resolution (including SRV records) will be performed on hostnames.
    ///
    /// # Examples
    ///
    /// ```text
    /// test.server.com
    /// test.server.com:19384
    /// 13.212.76.209
    /// 13.212.76.209:23193
    /// ```
    pub server_address: String,
    /// The deadline for the whole exchange, connect included.
    pub timeout: Option<Duration>,
    /// The protocol version declared in the handshake.
    pub protocol_version: i32,
}

impl Default for Java {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            timeout: None,
            protocol_version: DEFAULT_PROTOCOL_VERSION,
        }
    }
}

/// The server status reponse
///
/// More information can be found [here](https://wiki.vg/Server_List_Ping).
#[derive(Debug, Deserialize)]
pub struct JavaResponse {
    /// The version of the server.
    pub version: Version,
    /// Information about online players
    pub players: Players,
    /// The description of the server (MOTD).
    pub description: Chat,
    /// The server icon (a Base64-encoded PNG image)
    pub favicon: Option<String>,
}

/// Information about the server's version
#[derive(Debug, Deserialize)]
pub struct Version {
    /// The name of the version the server is running
    ///
    /// In practice this comes in a large variety of different formats.
    pub name: String,
    /// See [Protocol Version Numbers](https://wiki.vg/Protocol_version_numbers)
    pub protocol: i64,
}

/// An online player of the server.
#[derive(Debug, Deserialize)]
pub struct Player {
    /// The name of the player.
    pub name: String,
    /// The player's UUID
    pub id: String,
}

/// The stats for players on the server.
#[derive(Debug, Deserialize)]
pub struct Players {
    /// The max amount of players.
    pub max: i64,
    /// The amount of players online.
    pub online: i64,
    /// A preview of which players are online
    ///
    /// In practice servers often don't send this or use it for more advertising
    pub sample: Option<Vec<Player>>,
}

/// This is a partial implemenation of a Minecraft chat component limited to just text
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Chat {
    Text { text: String },
    String(String),
}

impl Chat {
    #[must_use]
    pub const fn text(&self) -> &str {
        match self {
            Self::Text { text } => text.as_str(),
            Self::String(s) => s.as_str(),
        }
    }
}

/// What the exchange needs from its transport next.
#[derive(Debug)]
pub(crate) enum Event {
    /// No complete packet is buffered; wait for the peer to deliver bytes.
    NeedMoreData,
    /// Bytes that must be written to the peer before reading again.
    Send(Vec<u8>),
    /// The exchange finished: round-trip latency in milliseconds and the
    /// parsed status.
    Complete(u64, JavaResponse),
}

enum State {
    AwaitingStatusResponse,
    AwaitingPong {
        response: JavaResponse,
        ping_sent: Instant,
    },
    Done,
}

/// The handshake → status → ping exchange, driven by transport events.
///
/// The machine owns its receive buffer, scoped to one connection. It never
/// touches a socket itself: [`StatusExchange::open`] hands back the bytes to
/// write on connect, and [`StatusExchange::receive`] consumes whatever the
/// transport delivered and says what to do next.
pub(crate) struct StatusExchange {
    buffer: Vec<u8>,
    state: State,
}

impl StatusExchange {
    /// Creates the exchange along with its opening bytes: the handshake
    /// declaring `next_state = 1`, followed immediately by the empty status
    /// request. Both are written before anything is read.
    pub(crate) fn open(host: &str, port: u16, protocol_version: i32) -> (Self, Vec<u8>) {
        let mut handshake = Vec::with_capacity(host.len() + 16);
        write_varint(&mut handshake, protocol_version);
        write_varint(&mut handshake, host.len() as i32);
        handshake.extend_from_slice(host.as_bytes());
        handshake.extend_from_slice(&port.to_be_bytes());
        write_varint(&mut handshake, 1); // next state: status

        let mut opening = encode_packet(HANDSHAKE_ID, &handshake);
        opening.extend_from_slice(&encode_packet(STATUS_REQUEST_ID, &[]));

        let exchange = Self {
            buffer: Vec::new(),
            state: State::AwaitingStatusResponse,
        };
        (exchange, opening)
    }

    /// Feeds freshly received bytes into the exchange and reports what the
    /// transport should do next.
    ///
    /// Decodes as many complete packets as the buffer holds. A status
    /// response triggers the ping (returned as [`Event::Send`], with the
    /// send instant recorded for latency); the matching pong completes the
    /// exchange. Packets with an id the current state does not expect are
    /// skipped. After an [`Event::Send`], call this again with an empty
    /// slice to drain anything already buffered.
    pub(crate) fn receive(&mut self, bytes: &[u8]) -> Result<Event, Error> {
        self.buffer.extend_from_slice(bytes);

        while let Some((packet, consumed)) = try_decode_packet(&self.buffer)? {
            self.buffer.drain(..consumed);

            match std::mem::replace(&mut self.state, State::Done) {
                State::AwaitingStatusResponse if packet.id == STATUS_RESPONSE_ID => {
                    let response = decode_status_payload(&packet.payload)?;
                    let ping = encode_packet(PING_ID, &rand::random::<u64>().to_be_bytes());
                    self.state = State::AwaitingPong {
                        response,
                        ping_sent: Instant::now(),
                    };
                    return Ok(Event::Send(ping));
                }
                State::AwaitingPong {
                    response,
                    ping_sent,
                } if packet.id == PONG_ID => {
                    // Only one probe is ever in flight, so the pong payload
                    // needs no correlation check.
                    let micros = ping_sent.elapsed().as_micros();
                    let latency = ((micros + 500) / 1000) as u64;
                    return Ok(Event::Complete(latency, response));
                }
                other => self.state = other,
            }
        }

        Ok(Event::NeedMoreData)
    }
}

/// Pulls the JSON document out of a status response payload
/// (`VarInt(length)` followed by that many UTF-8 bytes) and parses it.
fn decode_status_payload(payload: &[u8]) -> Result<JavaResponse, Error> {
    let (length, start) = read_varint(payload, 0)?.ok_or_else(|| {
        Error::MalformedStatusPayload("status response is missing its string length".to_string())
    })?;
    let length = usize::try_from(length).map_err(|_| Error::MalformedVarInt)?;

    let raw = payload
        .get(start..start + length)
        .ok_or_else(|| Error::MalformedStatusPayload("status string is truncated".to_string()))?;
    let json =
        std::str::from_utf8(raw).map_err(|err| Error::MalformedStatusPayload(err.to_string()))?;
    serde_json::from_str(json).map_err(|err| Error::MalformedStatusPayload(err.to_string()))
}
