//! Connection state machine for a presence IPC session.
//!
//! This module tracks the lifecycle of a single client connection and
//! validates that operations only happen in states where they are legal.
//!
//! # Connection Lifecycle
//!
//! 1. **New** - The client has been created and has yet to connect
//! 2. **Connecting** - The handshake exchange is in progress
//! 3. **Connected** - Normal operation (read loop running)
//! 4. **Disconnected** - Torn down by the peer or by protocol corruption
//! 5. **Closed** - Shut down by the caller
//!
//! Disconnected and Closed are terminal: a fresh connection instance is
//! required to talk to the service again.

use std::fmt;

/// Connection state for the presence IPC state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Created, not yet connecting.
    New,

    /// Handshake exchange in progress.
    Connecting,

    /// Handshake complete; packets are flowing.
    Connected,

    /// Severed by the peer, a transport failure, or corrupt frame data.
    Disconnected,

    /// Shut down normally by the caller.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "New"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Validating wrapper around the current [`ConnectionState`].
///
/// Transitions only move forward; once a terminal state is reached no
/// further transition is accepted.
#[derive(Debug)]
pub struct StateMachine {
    state: ConnectionState,
}

impl StateMachine {
    /// Create a state machine in the `New` state.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::New,
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if the connection is in a specific state.
    pub fn is_state(&self, state: ConnectionState) -> bool {
        self.state == state
    }

    /// Check if the connection is ready for normal operation.
    ///
    /// Returns `true` only when in the `Connected` state.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Check if the connection has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Closed
        )
    }

    /// Transition to a new connection state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state transition is invalid (e.g., trying
    /// to leave a terminal state, or to reach `Closed` from anywhere but
    /// `Connected`).
    pub fn transition_to(&mut self, new_state: ConnectionState) -> anyhow::Result<()> {
        match (self.state, new_state) {
            // Terminal states admit no transitions
            (ConnectionState::Disconnected, _) => {
                anyhow::bail!("cannot transition from Disconnected state");
            }
            (ConnectionState::Closed, _) => {
                anyhow::bail!("cannot transition from Closed state");
            }

            // Normal forward progression
            (ConnectionState::New, ConnectionState::Connecting) => {}
            (ConnectionState::Connecting, ConnectionState::Connected) => {}

            // Handshake rejection or mid-session teardown
            (ConnectionState::Connecting, ConnectionState::Disconnected) => {}
            (ConnectionState::Connected, ConnectionState::Disconnected) => {}

            // Caller-initiated shutdown, legal only while connected
            (ConnectionState::Connected, ConnectionState::Closed) => {}

            _ => {
                anyhow::bail!(
                    "invalid state transition: {} -> {}",
                    self.state,
                    new_state
                );
            }
        }

        self.state = new_state;
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
