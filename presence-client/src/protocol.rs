//! Protocol helpers shared by the connect path and the read loop.
//!
//! The helpers are intentionally thin wrappers over
//! `presence_protocol::Packet`, enforcing the project's fail-fast policy
//! and keeping the packet-sent notification and wire trace in one place.

use crate::errors::PresenceClientError;
use crate::events::{ClientEvent, EventBus};
use crate::trace;
use presence_protocol::io::IpcOutStream;
use presence_protocol::{Packet, PacketError};
use serde_json::{json, Value};
use tokio::io::AsyncWrite;

/// Protocol version spoken by this client.
pub(crate) const PROTOCOL_VERSION: u32 = 1;

/// Build the handshake payload for an application id.
///
/// The nonce is injected separately at packet construction.
pub(crate) fn handshake_payload(application_id: u64) -> Value {
    json!({
        "v": PROTOCOL_VERSION,
        "client_id": application_id.to_string(),
    })
}

/// Write a packet, flush it, and notify subscribers that it was sent.
pub(crate) async fn send_packet<W: AsyncWrite + Unpin>(
    output: &mut IpcOutStream<W>,
    packet: &Packet,
    bus: &EventBus,
) -> Result<(), PresenceClientError> {
    trace::out_packet(packet);
    packet.write_to(output);
    output.flush().await.map_err(PresenceClientError::Transport)?;
    bus.broadcast(ClientEvent::PacketSent(packet.clone()));
    Ok(())
}

/// Extract the code/message pair from a Close payload.
///
/// Missing fields fall back to code 0 and a generic reason.
pub(crate) fn close_details(payload: &Value) -> (i32, String) {
    let code = payload
        .get("code")
        .and_then(Value::as_i64)
        .unwrap_or(0) as i32;
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("connection closed by peer")
        .to_string();
    (code, message)
}

/// Convert a decode failure into a caller-facing connect error.
pub(crate) fn connect_error(err: PacketError) -> PresenceClientError {
    if err.is_corrupt() {
        PresenceClientError::CorruptFrame(err.to_string())
    } else {
        PresenceClientError::ConnectionFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_payload_shape() {
        let payload = handshake_payload(12345);
        assert_eq!(payload, json!({"v": 1, "client_id": "12345"}));
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"client_id":"12345","v":1}"#
        );
    }

    #[test]
    fn test_close_details() {
        let (code, message) = close_details(&json!({"code": 4001, "message": "going away"}));
        assert_eq!(code, 4001);
        assert_eq!(message, "going away");

        let (code, message) = close_details(&json!({}));
        assert_eq!(code, 0);
        assert_eq!(message, "connection closed by peer");
    }

    #[tokio::test]
    async fn test_send_packet_notifies_subscribers() {
        use presence_protocol::OpCode;

        let bus = EventBus::new();
        let rx = bus.subscribe();
        let mut output = IpcOutStream::new(Vec::new());

        let packet = Packet::new(OpCode::Ping, json!({"seq": 1})).unwrap();
        send_packet(&mut output, &packet, &bus).await.unwrap();

        assert!(output.get_ref().len() > 8);
        match rx.try_recv().unwrap() {
            ClientEvent::PacketSent(sent) => assert_eq!(sent.opcode(), OpCode::Ping),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
