//! Wire protocol implementation for the presence IPC bridge.
//!
//! This crate provides the transport and protocol layer for talking to a
//! desktop application's local rich-presence service. It handles socket
//! connections, buffered I/O streams, packet framing, and the connection
//! state machine.
//!
//! # Modules
//!
//! - [`socket`] - Socket abstractions (Unix domain socket + discovery)
//! - [`io`] - Buffered I/O streams (IpcInStream, IpcOutStream)
//! - [`packet`] - Packet framing (opcode + length header, JSON payload)
//! - [`connection`] - Connection state machine and lifecycle management
//!
//! # Examples
//!
//! ```no_run
//! use presence_protocol::{Packet, OpCode};
//! use presence_protocol::io::{IpcInStream, IpcOutStream};
//! use serde_json::json;
//!
//! # #[cfg(unix)]
//! # async fn example() -> anyhow::Result<()> {
//! let socket = presence_protocol::UnixSocket::discover().await?;
//! let (reader, writer) = tokio::io::split(socket);
//! let mut input = IpcInStream::new(reader);
//! let mut output = IpcOutStream::new(writer);
//!
//! let hello = Packet::with_nonce(OpCode::Handshake, json!({"v": 1, "client_id": "12345"}))?;
//! hello.write_to(&mut output);
//! output.flush().await?;
//!
//! let reply = Packet::read_from(&mut input).await?;
//! println!("reply: {}", reply.opcode());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod io;
pub mod packet;
pub mod socket;

// Re-export commonly used types
pub use connection::{ConnectionState, StateMachine};
pub use io::{IpcInStream, IpcOutStream};
pub use packet::{OpCode, Packet, PacketError};
pub use socket::PresenceSocket;

#[cfg(unix)]
pub use socket::UnixSocket;
