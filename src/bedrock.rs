//! The Bedrock edition status protocol: `RakNet` unconnected ping/pong.
//! [Raknet: Unconnected Ping](https://wiki.vg/Raknet_Protocol#Unconnected_Ping)

use std::{
    net::{Ipv4Addr, SocketAddr},
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::Error;

/// Raknets default `OFFLINE_MESSAGE_DATA_ID`, sent in every unconnected ping
/// and echoed in the pong.
/// See more: [Raknet: Data Types](https://wiki.vg/Raknet_Protocol#Data_types)
pub(crate) const OFFLINE_MESSAGE_DATA_ID: &[u8; 16] = &[
    0x00, 0xff, 0xff, 0x00, 0xfe, 0xfe, 0xfe, 0xfe, 0xfd, 0xfd, 0xfd, 0xfd, 0x12, 0x34, 0x56, 0x78,
];

/// The default port of a Raknet Bedrock Server.
pub const DEFAULT_BEDROCK_PORT: u16 = 19132;

/// Deadline applied when [`Bedrock::timeout`] is unset.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const UNCONNECTED_PING_ID: u8 = 0x01;
const UNCONNECTED_PONG_ID: u8 = 0x1c;

/// Fixed region between the pong's id byte and its status string: echoed
/// timestamp, server GUID, magic, and the string length prefix. The exact
/// sub-field boundaries are not validated, only skipped as a whole.
const PONG_HEADER_LEN: usize = 34;

/// Configuration for pinging a Bedrock server.
///
/// # Examples
///
/// ```
/// use piglin::Bedrock;
/// use std::time::Duration;
///
/// let bedrock_config = Bedrock {
///     server_address: "play.nethergames.org".to_string(),
///     timeout: Some(Duration::from_secs(10)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Bedrock {
    /// The bedrock server address.
    ///
    /// This can be either an IP or a hostname, and both may optionally have a
    /// port at the end.
    ///
    /// DNS resolution will be performed on hostnames.
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
    /// How long to wait for the pong before giving up with
    /// [`Error::PingTimeout`](crate::Error::PingTimeout). Defaults to five
    /// seconds.
    pub timeout: Option<Duration>,
    /// The socket addresses to try binding the UDP socket to.
    pub socket_addresses: Vec<SocketAddr>,
}

impl Default for Bedrock {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            timeout: None,
            socket_addresses: vec![
                SocketAddr::from((Ipv4Addr::new(0, 0, 0, 0), 25567)),
                SocketAddr::from((Ipv4Addr::new(0, 0, 0, 0), 25568)),
                SocketAddr::from((Ipv4Addr::new(0, 0, 0, 0), 25569)),
            ],
        }
    }
}

/// Represents the edition of a bedrock server.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum BedrockEdition {
    PocketEdition,
    EducationEdition,
    /// An unknown edition string.
    Other(String),
}

impl std::fmt::Display for BedrockEdition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PocketEdition => f.write_str("MCPE"),
            Self::EducationEdition => f.write_str("MCEE"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl From<&str> for BedrockEdition {
    fn from(edition: &str) -> Self {
        match edition.to_lowercase().as_ref() {
            "mcpe" => Self::PocketEdition,
            "mcee" => Self::EducationEdition,
            _ => Self::Other(edition.to_string()),
        }
    }
}

/// Bedrock Server Payload Response
///
/// See More: [Raknet: Unconnected Pong](https://wiki.vg/Raknet_Protocol#Unconnected_Pong)
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BedrockResponse {
    /// The server's edition.
    pub edition: BedrockEdition,
    /// The first line of the server's Message Of The Day (MOTD).
    ///
    /// In practice, this seems to be the only line that the bedrock clients
    /// display, and therefore the only line servers usually send.
    pub motd: String,
    /// The server's protocol version (ex: 390).
    pub protocol_version: i64,
    /// The name of the servers version (ex: 1.16.200).
    ///
    /// Bedrock clients display this after the first line of the MOTD, in the
    /// format `motd - v{version_name}`.
    pub version_name: String,
    /// The numbers of players online.
    pub players_online: i64,
    /// The maximum number of players that could be online at once.
    pub players_max: i64,
    /// The server's unique identifier.
    pub server_id: String,
    /// The name of the world the server advertises.
    pub world_name: String,
    /// The game mode the server defaults new users to (e.g. "Survival").
    pub game_mode: String,
    /// Whether the server restricts Nintendo Switch players ("0" or "1").
    pub nintendo_limited: String,
    /// The port to connect to the server on with an IPv4 address.
    pub port_v4: u16,
    /// The port to connect to the server on with an IPv6 address.
    pub port_v6: u16,
}

impl BedrockResponse {
    /// Extracts information from the semicolon-separated payload.
    ///
    /// The pong carries exactly twelve ordered fields:
    ///
    /// Edition (MCPE or MCEE for Education Edition)
    /// MOTD line 1
    /// Protocol Version
    /// Version Name
    /// Player Count
    /// Max Player Count
    /// Server Unique ID
    /// World Name
    /// Game Mode
    /// Nintendo Limited
    /// Port (IPv4)
    /// Port (IPv6)
    ///
    /// Servers may append extra fields after these; they are ignored.
    pub(crate) fn extract(payload: &str) -> Result<Self, Error> {
        let mut parts = payload.split(';');
        let mut next = || {
            parts.next().ok_or_else(|| {
                Error::MalformedStatusPayload(format!(
                    "expected 12 status fields in {payload:?}"
                ))
            })
        };

        Ok(Self {
            edition: BedrockEdition::from(next()?),
            motd: next()?.to_string(),
            protocol_version: parse_field(next()?)?,
            version_name: next()?.to_string(),
            players_online: parse_field(next()?)?,
            players_max: parse_field(next()?)?,
            server_id: next()?.to_string(),
            world_name: next()?.to_string(),
            game_mode: next()?.to_string(),
            nintendo_limited: next()?.to_string(),
            port_v4: parse_field(next()?)?,
            port_v6: parse_field(next()?)?,
        })
    }
}

fn parse_field<T: FromStr>(field: &str) -> Result<T, Error> {
    field
        .parse()
        .map_err(|_| Error::MalformedStatusPayload(format!("non-numeric field {field:?}")))
}

/// Milliseconds since the Unix epoch, the timestamp format `RakNet` echoes.
pub(crate) fn wall_clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

/// Builds the 33-byte unconnected ping probe:
/// id, timestamp, magic, client GUID.
pub(crate) fn encode_unconnected_ping(timestamp_millis: u64, client_guid: u64) -> Vec<u8> {
    let mut probe = Vec::with_capacity(33);
    probe.push(UNCONNECTED_PING_ID);
    probe.extend_from_slice(&timestamp_millis.to_be_bytes());
    probe.extend_from_slice(OFFLINE_MESSAGE_DATA_ID);
    probe.extend_from_slice(&client_guid.to_be_bytes());
    probe
}

/// Decodes one unconnected pong datagram into the echoed request timestamp
/// and the parsed status fields.
///
/// The id byte is validated before anything else is touched; latency is the
/// caller's wall clock minus the echoed timestamp.
pub(crate) fn decode_unconnected_pong(datagram: &[u8]) -> Result<(u64, BedrockResponse), Error> {
    let id = *datagram.first().ok_or_else(|| {
        Error::MalformedStatusPayload("empty datagram received".to_string())
    })?;
    if id != UNCONNECTED_PONG_ID {
        return Err(Error::InvalidPacketId(id));
    }

    let body = &datagram[1..];
    if body.len() < PONG_HEADER_LEN {
        return Err(Error::MalformedStatusPayload(format!(
            "pong of {} bytes is shorter than its fixed header",
            datagram.len()
        )));
    }

    let mut echoed = [0; 8];
    echoed.copy_from_slice(&body[..8]);
    let timestamp = u64::from_be_bytes(echoed);

    let fields = std::str::from_utf8(&body[PONG_HEADER_LEN..])
        .map_err(|err| Error::MalformedStatusPayload(err.to_string()))?;
    Ok((timestamp, BedrockResponse::extract(fields)?))
}
