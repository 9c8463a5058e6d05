#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
//! `piglin` is a Rust crate that pings Minecraft servers and reports their
//! status: MOTD, player counts, version information, and round-trip latency.
//!
//! Both editions are supported. Java servers speak the TCP
//! [Server List Ping](https://wiki.vg/Server_List_Ping) protocol, Bedrock
//! servers answer the `RakNet`
//! [unconnected ping](https://wiki.vg/Raknet_Protocol#Unconnected_Ping).
//! Hostnames are resolved with SRV record handling for Java targets.
//!
//! The main API surface is [`tokio::get_status`].

pub mod tokio;

mod bedrock;
mod frame;
mod java;
mod varint;

pub use bedrock::{Bedrock, BedrockEdition, BedrockResponse, DEFAULT_BEDROCK_PORT};
pub use java::{
    Chat, DEFAULT_JAVA_PORT, DEFAULT_PROTOCOL_VERSION, Java, JavaResponse, Player, Players,
    Version,
};

/// Errors that can occur when pinging a server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport failed to connect or to move bytes.
    #[error("an I/O error occurred: {0}")]
    Connection(#[from] std::io::Error),
    /// No valid response arrived within the deadline.
    #[error("the server did not respond within the deadline")]
    PingTimeout,
    /// A response began with an identifier the protocol does not allow here.
    #[error("unexpected packet id {0:#04x}")]
    InvalidPacketId(u8),
    /// A VarInt ran past its five-byte limit.
    #[error("VarInt too large to represent in 32 bits")]
    MalformedVarInt,
    /// The status document (JSON or semicolon-delimited) could not be parsed.
    #[error("malformed status payload: {0}")]
    MalformedStatusPayload(String),
    /// DNS lookup for the host provided failed.
    #[error("DNS lookup for the host provided failed")]
    ResolutionFailure,
    /// The `host[:port]` input could not be split into a usable target.
    #[error("an invalid address was provided")]
    InvalidAddress,
}
