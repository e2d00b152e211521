//! Background read loop: decode, dispatch, and keepalive replies.
//!
//! One loop task runs per connected client. It owns both stream halves,
//! so the socket is released only when the loop itself exits; shutdown is
//! requested over the command channel and takes effect between frames.

use crate::events::{ClientEvent, EventBus};
use crate::{protocol, router, trace, CORRUPT_FRAME_CODE, TRANSPORT_LOST_CODE};
use parking_lot::Mutex;
use presence_protocol::io::{IpcInStream, IpcOutStream};
use presence_protocol::{ConnectionState, OpCode, Packet, PacketError, StateMachine};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio::task::JoinHandle;

/// Connection state shared between the facade and the read loop.
pub(crate) type SharedState = Arc<Mutex<StateMachine>>;

/// Requests from the facade to the read loop.
pub(crate) enum Command {
    /// Stop reading and release the transport.
    Close,
}

/// Spawn the read loop task.
pub(crate) fn spawn<R, W>(
    input: IpcInStream<R>,
    output: IpcOutStream<W>,
    state: SharedState,
    bus: EventBus,
    commands: flume::Receiver<Command>,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(run(input, output, state, bus, commands))
}

async fn run<R, W>(
    mut input: IpcInStream<R>,
    mut output: IpcOutStream<W>,
    state: SharedState,
    bus: EventBus,
    commands: flume::Receiver<Command>,
) where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin,
{
    loop {
        select! {
            cmd = commands.recv_async() => {
                // Close command, or every facade handle dropped.
                match cmd {
                    Ok(Command::Close) | Err(_) => break,
                }
            }

            res = Packet::read_from(&mut input) => {
                // A close may have landed while this decode was in
                // flight; once the state is terminal nothing more is
                // emitted.
                if !state.lock().is_connected() {
                    break;
                }

                match res {
                    Ok(packet) => {
                        if !handle_packet(&mut output, &state, &bus, packet).await {
                            break;
                        }
                    }
                    Err(err) => {
                        handle_decode_failure(&state, &bus, &err);
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!("read loop exited");
    // The streams (and the socket under them) drop here, after the final
    // cycle has fully completed.
}

/// Dispatch one decoded packet. Returns false when the loop should stop.
async fn handle_packet<W: AsyncWrite + Unpin>(
    output: &mut IpcOutStream<W>,
    state: &SharedState,
    bus: &EventBus,
    packet: Packet,
) -> bool {
    trace::in_packet(&packet);
    bus.broadcast(ClientEvent::PacketReceived(packet.clone()));

    match packet.opcode() {
        OpCode::Frame => {
            // Ordinary data transfer: route by the inner event name.
            if let Some(evt) = packet.payload().get("evt").and_then(Value::as_str) {
                let data = packet
                    .payload()
                    .get("data")
                    .cloned()
                    .unwrap_or(Value::Null);
                if let Some(event) = router::route(evt, &data) {
                    bus.broadcast(event);
                }
            }
            true
        }

        OpCode::Close => {
            // The service has severed the connection.
            let (code, message) = protocol::close_details(packet.payload());
            disconnect(state, bus, code, message);
            false
        }

        OpCode::Ping => {
            // Answer with the same payload, no nonce.
            let pong = packet.pong_reply();
            match protocol::send_packet(output, &pong, bus).await {
                Ok(()) => true,
                Err(e) => {
                    disconnect(
                        state,
                        bus,
                        TRANSPORT_LOST_CODE,
                        format!("failed to answer ping: {}", e),
                    );
                    false
                }
            }
        }

        // Recognized but inert.
        OpCode::Pong => true,

        OpCode::Handshake => {
            // The service never sends a handshake after connect.
            disconnect(state, bus, CORRUPT_FRAME_CODE, "the frame data is corrupt");
            false
        }
    }
}

fn handle_decode_failure(state: &SharedState, bus: &EventBus, err: &PacketError) {
    if err.is_corrupt() {
        tracing::warn!("corrupt frame: {}", err);
        disconnect(state, bus, CORRUPT_FRAME_CODE, "the frame data is corrupt");
    } else {
        disconnect(
            state,
            bus,
            TRANSPORT_LOST_CODE,
            format!("transport lost: {}", err),
        );
    }
}

/// Move to Disconnected and tell subscribers, once.
///
/// If the caller closed the connection concurrently the state is already
/// terminal; no notification is emitted then.
fn disconnect(state: &SharedState, bus: &EventBus, code: i32, message: impl Into<String>) {
    let message = message.into();
    let transitioned = state
        .lock()
        .transition_to(ConnectionState::Disconnected)
        .is_ok();

    if transitioned {
        tracing::info!(code, %message, "disconnected");
        bus.broadcast(ClientEvent::Disconnected { code, message });
    }
}
