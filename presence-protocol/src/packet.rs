//! Packet framing for the presence IPC protocol.
//!
//! Every packet on the wire is an 8-byte little-endian header followed by a
//! JSON payload:
//!
//! - 4 bytes: opcode (u32)
//! - 4 bytes: payload length in bytes (u32)
//! - N bytes: JSON-encoded payload
//!
//! Decoding consumes exactly one frame per call; bytes belonging to a
//! following frame stay buffered in the input stream.

use crate::io::{IpcInStream, IpcOutStream};
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

/// Upper bound on the declared payload length. Frames claiming more are
/// treated as corrupt rather than allocated.
pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

/// Packet opcodes understood by the presence service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Protocol handshake, sent once by the client at connect time.
    Handshake,
    /// Ordinary application-level data transfer.
    Frame,
    /// The peer is severing the connection.
    Close,
    /// Keepalive probe; must be answered with a Pong echoing the payload.
    Ping,
    /// Keepalive reply.
    Pong,
}

impl OpCode {
    /// Map a wire value to an opcode, if recognized.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Handshake),
            1 => Some(Self::Frame),
            2 => Some(Self::Close),
            3 => Some(Self::Ping),
            4 => Some(Self::Pong),
            _ => None,
        }
    }

    /// The opcode's wire value.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Handshake => 0,
            Self::Frame => 1,
            Self::Close => 2,
            Self::Ping => 3,
            Self::Pong => 4,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshake => write!(f, "Handshake"),
            Self::Frame => write!(f, "Frame"),
            Self::Close => write!(f, "Close"),
            Self::Ping => write!(f, "Ping"),
            Self::Pong => write!(f, "Pong"),
        }
    }
}

/// Errors produced while encoding or decoding a packet.
#[derive(Debug, Error)]
pub enum PacketError {
    /// I/O failure on the underlying transport.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// The transport was closed cleanly at a frame boundary.
    #[error("transport closed")]
    Closed,

    /// The header carried an opcode outside the known set.
    #[error("unrecognized opcode {0}")]
    UnknownOpCode(u32),

    /// The header declared a payload larger than [`MAX_PAYLOAD_LEN`].
    #[error("declared payload length {0} exceeds limit")]
    PayloadTooLarge(u32),

    /// The payload bytes were not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

impl PacketError {
    /// Whether this failure means the frame data itself is corrupt, as
    /// opposed to the transport going away between frames.
    ///
    /// An EOF mid-frame counts as corruption: the header promised bytes
    /// that never arrived.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        match self {
            Self::UnknownOpCode(_) | Self::PayloadTooLarge(_) | Self::InvalidPayload(_) => true,
            Self::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            Self::Closed => false,
        }
    }
}

/// A single framed protocol packet.
///
/// The serialized payload bytes are retained alongside the parsed value so
/// that echo replies ([`pong_reply`](Self::pong_reply)) can reproduce the
/// peer's payload byte-for-byte, independent of JSON key ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    opcode: OpCode,
    payload: Value,
    raw: Bytes,
}

impl Packet {
    /// Create a packet from an opcode and payload value.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn new(opcode: OpCode, payload: Value) -> Result<Self, PacketError> {
        let raw = serde_json::to_vec(&payload)?;
        Ok(Self {
            opcode,
            payload,
            raw: Bytes::from(raw),
        })
    }

    /// Create a packet with a freshly generated nonce injected into the
    /// payload.
    ///
    /// The nonce lets the peer correlate replies with this packet. It is
    /// only injected into object payloads; echo replies must not carry one
    /// (use [`pong_reply`](Self::pong_reply) for those).
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn with_nonce(opcode: OpCode, mut payload: Value) -> Result<Self, PacketError> {
        if let Value::Object(map) = &mut payload {
            map.insert(
                "nonce".to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }
        Self::new(opcode, payload)
    }

    /// Build the Pong reply for a received Ping.
    ///
    /// The reply reuses the received payload bytes unchanged; no nonce is
    /// injected.
    #[must_use]
    pub fn pong_reply(&self) -> Self {
        Self {
            opcode: OpCode::Pong,
            payload: self.payload.clone(),
            raw: self.raw.clone(),
        }
    }

    /// The packet's opcode.
    #[must_use]
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// The parsed payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The payload bytes exactly as they appear on the wire.
    #[must_use]
    pub fn raw_payload(&self) -> &[u8] {
        &self.raw
    }

    /// Read exactly one packet from the input stream.
    ///
    /// # Errors
    ///
    /// - [`PacketError::Closed`] if the transport reached EOF cleanly at a
    ///   frame boundary (no header bytes arrived).
    /// - [`PacketError::UnknownOpCode`] if the opcode is not a recognized
    ///   [`OpCode`] member.
    /// - [`PacketError::Io`] with `UnexpectedEof` if the transport closed
    ///   mid-frame, or any other I/O failure.
    /// - [`PacketError::InvalidPayload`] if the payload bytes do not parse
    ///   as JSON.
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut IpcInStream<R>,
    ) -> Result<Self, PacketError> {
        let opcode_raw = match stream.read_u32_le().await {
            Ok(value) => value,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && stream.available() == 0 => {
                return Err(PacketError::Closed);
            }
            Err(e) => return Err(PacketError::Io(e)),
        };

        let opcode = OpCode::from_u32(opcode_raw).ok_or(PacketError::UnknownOpCode(opcode_raw))?;

        let length = stream.read_u32_le().await?;
        if length as usize > MAX_PAYLOAD_LEN {
            return Err(PacketError::PayloadTooLarge(length));
        }

        let mut payload_bytes = vec![0u8; length as usize];
        stream.read_bytes(&mut payload_bytes).await?;

        let payload: Value = serde_json::from_slice(&payload_bytes)?;
        tracing::trace!(opcode = %opcode, len = length, "decoded packet");

        Ok(Self {
            opcode,
            payload,
            raw: Bytes::from(payload_bytes),
        })
    }

    /// Write this packet's header and payload to the output stream.
    ///
    /// The bytes are buffered; the caller is responsible for flushing.
    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut IpcOutStream<W>) {
        stream.write_u32_le(self.opcode.as_u32());
        stream.write_u32_le(self.raw.len() as u32);
        stream.write_bytes(&self.raw);
    }
}

#[cfg(test)]
mod proptest_framing;
