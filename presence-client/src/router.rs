//! Routing of inbound frame events to typed notifications.
//!
//! Frames carry an `evt` name and a `data` object. The set of event names
//! this client understands is a closed enumeration; anything else is
//! ignored so that newer services can add events without breaking older
//! clients.

use crate::events::{Activity, ClientEvent, User};
use serde::Deserialize;
use serde_json::Value;

/// Inner frame events this client recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameEvent {
    /// Handshake confirmation; consumed at connect time, never routed.
    Ready,
    /// In-band application error.
    Error,
    /// A user joined the activity.
    ActivityJoin,
    /// A user started spectating the activity.
    ActivitySpectate,
    /// A user requested to join the activity.
    ActivityJoinRequest,
}

impl FrameEvent {
    /// Map an event name to its variant, if recognized.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "READY" => Some(Self::Ready),
            "ERROR" => Some(Self::Error),
            "ACTIVITY_JOIN" => Some(Self::ActivityJoin),
            "ACTIVITY_SPECTATE" => Some(Self::ActivitySpectate),
            "ACTIVITY_JOIN_REQUEST" => Some(Self::ActivityJoinRequest),
            _ => None,
        }
    }
}

/// Wire shape of the nested user object.
#[derive(Debug, Deserialize)]
struct UserPayload {
    username: String,
    discriminator: String,
    id: String,
    #[serde(default)]
    avatar: Option<String>,
}

impl UserPayload {
    fn into_user(self) -> Option<User> {
        let id = self.id.parse::<u64>().ok()?;
        Some(User {
            username: self.username,
            discriminator: self.discriminator,
            id,
            avatar: self.avatar,
        })
    }
}

/// Map a frame's event name and data object to a notification.
///
/// Returns `None` for unrecognized event names, for READY (which carries
/// no notification), and for recognized events whose data is missing
/// required fields.
pub(crate) fn route(evt: &str, data: &Value) -> Option<ClientEvent> {
    match FrameEvent::from_name(evt)? {
        FrameEvent::Ready => None,

        FrameEvent::Error => {
            let code = data.get("code")?.as_i64()? as i32;
            let message = data.get("message")?.as_str()?.to_string();
            Some(ClientEvent::Error { code, message })
        }

        FrameEvent::ActivityJoin => Some(ClientEvent::ActivityJoin(Activity {
            secret: secret(data)?,
            user: None,
        })),

        FrameEvent::ActivitySpectate => Some(ClientEvent::ActivitySpectate(Activity {
            secret: secret(data)?,
            user: None,
        })),

        FrameEvent::ActivityJoinRequest => {
            let user: UserPayload = serde_json::from_value(data.get("user")?.clone()).ok()?;
            Some(ClientEvent::ActivityJoinRequest(Activity {
                secret: secret(data)?,
                user: Some(user.into_user()?),
            }))
        }
    }
}

fn secret(data: &Value) -> Option<String> {
    Some(data.get("secret")?.as_str()?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_error_event() {
        let event = route("ERROR", &json!({"code": 4000, "message": "bad payload"})).unwrap();
        match event {
            ClientEvent::Error { code, message } => {
                assert_eq!(code, 4000);
                assert_eq!(message, "bad payload");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_activity_join() {
        let event = route("ACTIVITY_JOIN", &json!({"secret": "abc"})).unwrap();
        match event {
            ClientEvent::ActivityJoin(activity) => {
                assert_eq!(activity.secret, "abc");
                assert_eq!(activity.user, None);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_activity_spectate() {
        let event = route("ACTIVITY_SPECTATE", &json!({"secret": "xyz"})).unwrap();
        assert!(matches!(event, ClientEvent::ActivitySpectate(a) if a.secret == "xyz"));
    }

    #[test]
    fn test_activity_join_request_parses_user() {
        let data = json!({
            "secret": "abc",
            "user": {
                "username": "bob",
                "discriminator": "0001",
                "id": "42",
                "avatar": "hash"
            }
        });

        let event = route("ACTIVITY_JOIN_REQUEST", &data).unwrap();
        match event {
            ClientEvent::ActivityJoinRequest(activity) => {
                assert_eq!(activity.secret, "abc");
                assert_eq!(
                    activity.user,
                    Some(User {
                        username: "bob".to_string(),
                        discriminator: "0001".to_string(),
                        id: 42,
                        avatar: Some("hash".to_string()),
                    })
                );
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_join_request_without_avatar() {
        let data = json!({
            "secret": "abc",
            "user": {"username": "bob", "discriminator": "0001", "id": "42"}
        });

        let event = route("ACTIVITY_JOIN_REQUEST", &data).unwrap();
        match event {
            ClientEvent::ActivityJoinRequest(activity) => {
                assert_eq!(activity.user.unwrap().avatar, None);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_ignored() {
        assert!(route("GUILD_CREATE", &json!({"secret": "abc"})).is_none());
        assert!(route("", &json!({})).is_none());
    }

    #[test]
    fn test_ready_produces_no_notification() {
        assert!(route("READY", &json!({"v": 1})).is_none());
        // ...but the name itself is recognized.
        assert_eq!(FrameEvent::from_name("READY"), Some(FrameEvent::Ready));
    }

    #[test]
    fn test_malformed_data_ignored() {
        // Missing secret
        assert!(route("ACTIVITY_JOIN", &json!({})).is_none());
        // Non-string secret
        assert!(route("ACTIVITY_JOIN", &json!({"secret": 7})).is_none());
        // Unparsable user id
        let data = json!({
            "secret": "abc",
            "user": {"username": "bob", "discriminator": "0001", "id": "not-a-number"}
        });
        assert!(route("ACTIVITY_JOIN_REQUEST", &data).is_none());
        // Missing code on an ERROR frame
        assert!(route("ERROR", &json!({"message": "m"})).is_none());
    }
}
