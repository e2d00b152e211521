//! High-level async client for a desktop application's local
//! rich-presence service.
//!
//! This crate provides a complete client implementation built on top of
//! the low-level `presence-protocol` crate. It handles service discovery,
//! the connect handshake, the background read loop, keepalive replies,
//! and fan-out of typed notifications to subscribers.
//!
//! # Quick Start
//!
//! ```no_run
//! use presence_client::{ClientBuilder, ClientEvent, Config};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::builder().application_id(12345).build()?;
//!
//!     let builder = ClientBuilder::new(config);
//!     let events = builder.subscribe();
//!     let client = builder.build().await?;
//!
//!     while let Ok(event) = events.recv_async().await {
//!         match event {
//!             ClientEvent::ActivityJoin(activity) => {
//!                 println!("join secret: {}", activity.secret);
//!             }
//!             ClientEvent::Disconnected { code, message } => {
//!                 println!("disconnected ({}): {}", code, message);
//!                 break;
//!             }
//!             _ => {}
//!         }
//!     }
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! A single background task per connected client decodes one packet at a
//! time and dispatches it: activity frames become notifications, pings
//! are answered in place, a peer close or corrupt frame tears the
//! connection down. The caller's thread only connects, subscribes, and
//! closes.
//!
//! # Error Handling
//!
//! This crate follows a **fail-fast policy**: connect-time problems are
//! returned directly from [`ClientBuilder::build`], and nothing mid-session
//! is retried — a severed or corrupted connection is terminal and reported
//! as a [`ClientEvent::Disconnected`] notification. The read loop never
//! panics across the facade boundary.
//!
//! # Safety
//!
//! This crate is `#![forbid(unsafe_code)]` and uses only safe Rust.

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// Public modules
pub mod config;
pub mod errors;
pub mod events;

// Private implementation modules
mod protocol;
mod read_loop;
mod router;
mod trace;

// Re-exports
pub use config::Config;
pub use errors::PresenceClientError;
pub use events::{Activity, ClientEvent, User};
pub use presence_protocol::{ConnectionState, OpCode, Packet};

use events::EventBus;
use parking_lot::Mutex;
use presence_protocol::io::{IpcInStream, IpcOutStream};
use presence_protocol::StateMachine;
use read_loop::{Command, SharedState};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

#[cfg(unix)]
use presence_protocol::{PresenceSocket, UnixSocket};

/// Error code reported when the connection is torn down because of
/// corrupt or unrecognized frame data. Matches the code the official
/// service implementations use, so tooling can tell protocol corruption
/// from peer-reported errors.
pub const CORRUPT_FRAME_CODE: i32 = 2;

/// Error code reported when the transport is lost mid-session without a
/// Close packet.
pub const TRANSPORT_LOST_CODE: i32 = 0;

/// Builder for creating a presence client.
///
/// Subscribers registered on the builder observe the handshake's packet
/// notifications; subscribers added later only see subsequent events.
///
/// # Examples
///
/// ```no_run
/// use presence_client::{ClientBuilder, Config};
/// # use anyhow::Result;
///
/// # async fn example() -> Result<()> {
/// let config = Config::builder().application_id(12345).build()?;
///
/// let builder = ClientBuilder::new(config);
/// let events = builder.subscribe();
/// let client = builder.build().await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: Config,
    bus: EventBus,
}

impl ClientBuilder {
    /// Creates a new client builder with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            bus: EventBus::new(),
        }
    }

    /// Register a subscriber before connecting.
    pub fn subscribe(&self) -> flume::Receiver<ClientEvent> {
        self.bus.subscribe()
    }

    /// Builds and connects the client over the service's Unix socket.
    ///
    /// Uses the configured socket path, or probes the standard locations
    /// when none is set. See [`build_with_transport`](Self::build_with_transport)
    /// for the handshake this performs.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no service
    /// socket accepts a connection, or the handshake fails.
    #[cfg(unix)]
    pub async fn build(self) -> Result<Client, PresenceClientError> {
        let socket = match &self.config.socket_path {
            Some(path) => UnixSocket::connect(path).await.map_err(|e| {
                PresenceClientError::ConnectionFailed(format!("{}: {}", path.display(), e))
            })?,
            None => UnixSocket::discover()
                .await
                .map_err(|e| PresenceClientError::ConnectionFailed(e.to_string()))?,
        };
        tracing::debug!("using {}", socket.peer_endpoint());
        self.build_with_transport(socket).await
    }

    /// Builds and connects the client over an arbitrary duplex transport.
    ///
    /// Performs the connect sequence: send the Handshake packet
    /// (`{"v": 1, "client_id": …}` plus nonce), wait for the service's
    /// first reply within the configured timeout, then spawn the read
    /// loop. Any well-formed reply completes the handshake; a Close reply
    /// means the service refused the connection. At most one read loop
    /// ever runs per client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, writing the
    /// handshake fails, or the reply is missing, corrupt, or a refusal.
    pub async fn build_with_transport<S>(self, transport: S) -> Result<Client, PresenceClientError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        self.config.validate()?;

        let state: SharedState = Arc::new(Mutex::new(StateMachine::new()));
        transition(&state, ConnectionState::Connecting)?;

        let (reader, writer) = tokio::io::split(transport);
        let mut input = IpcInStream::new(reader);
        let mut output = IpcOutStream::new(writer);

        let handshake = Packet::with_nonce(
            OpCode::Handshake,
            protocol::handshake_payload(self.config.application_id),
        )
        .map_err(|e| PresenceClientError::Internal(format!("failed to encode handshake: {}", e)))?;
        protocol::send_packet(&mut output, &handshake, &self.bus).await?;

        let reply =
            match tokio::time::timeout(self.config.timeout(), Packet::read_from(&mut input)).await
            {
                Ok(Ok(packet)) => packet,
                Ok(Err(err)) => {
                    let _ = state.lock().transition_to(ConnectionState::Disconnected);
                    return Err(protocol::connect_error(err));
                }
                Err(_) => {
                    let _ = state.lock().transition_to(ConnectionState::Disconnected);
                    return Err(PresenceClientError::Handshake(
                        "timed out waiting for the service's reply".to_string(),
                    ));
                }
            };

        trace::in_packet(&reply);
        self.bus.broadcast(ClientEvent::PacketReceived(reply.clone()));

        if reply.opcode() == OpCode::Close {
            let (code, message) = protocol::close_details(reply.payload());
            let _ = state.lock().transition_to(ConnectionState::Disconnected);
            return Err(PresenceClientError::Handshake(format!(
                "service refused the connection: {} (code {})",
                message, code
            )));
        }

        transition(&state, ConnectionState::Connected)?;
        tracing::info!(
            application_id = self.config.application_id,
            "connected to presence service"
        );

        let (cmd_tx, cmd_rx) = flume::bounded(4);
        let join_handle = read_loop::spawn(
            input,
            output,
            Arc::clone(&state),
            self.bus.clone(),
            cmd_rx,
        );

        Ok(Client {
            handle: ClientHandle {
                commands: cmd_tx,
                bus: self.bus,
                state,
            },
            join_handle,
        })
    }
}

fn transition(
    state: &SharedState,
    to: ConnectionState,
) -> Result<(), PresenceClientError> {
    state
        .lock()
        .transition_to(to)
        .map_err(|e| PresenceClientError::Internal(e.to_string()))
}

/// Handle for interacting with a running presence client.
///
/// The handle can be cloned and shared across threads.
#[derive(Clone)]
pub struct ClientHandle {
    commands: flume::Sender<Command>,
    bus: EventBus,
    state: SharedState,
}

impl ClientHandle {
    /// Register a new event subscriber.
    ///
    /// The returned receiver sees every notification broadcast after this
    /// call, in arrival order.
    pub fn subscribe(&self) -> flume::Receiver<ClientEvent> {
        self.bus.subscribe()
    }

    /// The connection's current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.lock().state()
    }

    /// Close the connection.
    ///
    /// Only legal while connected. The state moves to `Closed`
    /// immediately — no further packet notifications are emitted — and
    /// the read loop releases the socket when it observes the request.
    ///
    /// # Errors
    ///
    /// Returns [`PresenceClientError::InvalidState`] when not connected;
    /// the state is left unchanged.
    pub fn close(&self) -> Result<(), PresenceClientError> {
        {
            let mut sm = self.state.lock();
            if !sm.is_connected() {
                return Err(PresenceClientError::InvalidState(format!(
                    "can only close while connected (state: {})",
                    sm.state()
                )));
            }
            sm.transition_to(ConnectionState::Closed)
                .map_err(|e| PresenceClientError::Internal(e.to_string()))?;
        }

        // Best-effort: the loop may already have exited on its own.
        let _ = self.commands.send(Command::Close);
        Ok(())
    }
}

/// A connected presence client.
///
/// The read loop runs in a background task. Use [`handle()`](Self::handle)
/// to get a cloneable handle for subscribing and closing.
pub struct Client {
    handle: ClientHandle,
    join_handle: JoinHandle<()>,
}

impl Client {
    /// Returns a handle for interacting with the client.
    #[must_use]
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Close the connection and wait for the read loop to finish.
    ///
    /// The socket is guaranteed released once this returns.
    ///
    /// # Errors
    ///
    /// Returns [`PresenceClientError::InvalidState`] when not connected,
    /// or an internal error if the read loop panicked.
    pub async fn close(self) -> Result<(), PresenceClientError> {
        self.handle.close()?;
        self.join_handle
            .await
            .map_err(|e| PresenceClientError::Internal(format!("read loop panicked: {}", e)))
    }

    /// Wait for the client to finish on its own (peer close, transport
    /// loss, or corruption).
    ///
    /// # Errors
    ///
    /// Returns an error if the read loop panicked.
    pub async fn join(self) -> Result<(), PresenceClientError> {
        let Client {
            handle,
            join_handle,
        } = self;
        let result = join_handle
            .await
            .map_err(|e| PresenceClientError::Internal(format!("read loop panicked: {}", e)));
        drop(handle);
        result
    }
}
