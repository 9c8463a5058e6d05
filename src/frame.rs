//! Length-prefixed packet framing for the stream protocol.
//!
//! On the wire a packet is `VarInt(length) VarInt(id) payload`, where
//! `length` covers the id and the payload. Decoding works against an
//! accumulating receive buffer, so a packet split across TCP segments is a
//! normal state rather than an error.

use crate::{
    Error,
    varint::{read_varint, write_varint},
};

/// A framed protocol packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Packet {
    pub id: i32,
    pub payload: Vec<u8>,
}

/// Frames `payload` under `id`.
pub(crate) fn encode_packet(id: i32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 5);
    write_varint(&mut body, id);
    body.extend_from_slice(payload);

    let mut packet = Vec::with_capacity(body.len() + 5);
    write_varint(&mut packet, body.len() as i32);
    packet.extend_from_slice(&body);
    packet
}

/// Attempts to decode one packet from the front of `buf`.
///
/// Returns the packet together with the number of leading bytes it occupied,
/// so the caller can drain the receive buffer. `Ok(None)` means the length
/// prefix or the declared window has not fully arrived yet; `buf` is left
/// untouched and the caller should wait for more bytes.
///
/// A negative declared length, or an id VarInt overrunning a window that is
/// already complete, is corruption and fails hard.
pub(crate) fn try_decode_packet(buf: &[u8]) -> Result<Option<(Packet, usize)>, Error> {
    let Some((length, body_start)) = read_varint(buf, 0)? else {
        return Ok(None);
    };
    let length = usize::try_from(length).map_err(|_| Error::MalformedVarInt)?;
    let body_end = body_start + length;
    if buf.len() < body_end {
        return Ok(None);
    }

    let window = &buf[body_start..body_end];
    let (id, id_len) = read_varint(window, 0)?.ok_or(Error::MalformedVarInt)?;
    let packet = Packet {
        id,
        payload: window[id_len..].to_vec(),
    };
    Ok(Some((packet, body_end)))
}
