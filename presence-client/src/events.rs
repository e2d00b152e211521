//! Application-facing notification types and subscriber fan-out.

use parking_lot::Mutex;
use presence_protocol::Packet;
use std::sync::Arc;

/// Identity of a peer user, parsed from a frame's nested user object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Account name.
    pub username: String,
    /// Four-digit tag distinguishing users with the same name.
    pub discriminator: String,
    /// Numeric user id (carried as a string on the wire).
    pub id: u64,
    /// Avatar hash, if the user has one.
    pub avatar: Option<String>,
}

/// Data for activity-related notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// The secret that was provided when the rich presence was set.
    pub secret: String,
    /// In a join request, the user who asked to join. Otherwise `None`.
    pub user: Option<User>,
}

/// Notifications delivered to subscribers.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A packet was written to the service.
    PacketSent(Packet),

    /// A packet was decoded from the service, regardless of opcode.
    PacketReceived(Packet),

    /// A user joined the activity.
    ActivityJoin(Activity),

    /// A user started spectating the activity.
    ActivitySpectate(Activity),

    /// A user requested to join the activity.
    ActivityJoinRequest(Activity),

    /// The service reported an in-band application error. The connection
    /// stays up.
    Error {
        /// The error's numerical identifier.
        code: i32,
        /// The error message.
        message: String,
    },

    /// The connection was severed: peer Close, corrupt frame data
    /// (code 2), or transport loss (code 0).
    Disconnected {
        /// The close/error code.
        code: i32,
        /// Human-readable reason.
        message: String,
    },
}

/// Registry of event subscribers.
///
/// Each subscriber gets its own unbounded channel; every broadcast is
/// delivered to every live subscriber in arrival order. Subscribers whose
/// receiver has been dropped are pruned on the next broadcast.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<flume::Sender<ClientEvent>>>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    ///
    /// The returned receiver sees every event broadcast after this call.
    pub fn subscribe(&self) -> flume::Receiver<ClientEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber.
    pub(crate) fn broadcast(&self, event: ClientEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
