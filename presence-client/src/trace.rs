use once_cell::sync::Lazy;
use presence_protocol::Packet;
use std::sync::atomic::{AtomicBool, Ordering};

static TRACE_ENABLED: Lazy<AtomicBool> = Lazy::new(|| {
    let on = std::env::var("PRESENCE_IPC_TRACE")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
        .unwrap_or(false);
    AtomicBool::new(on)
});

#[inline]
pub fn enabled() -> bool {
    TRACE_ENABLED.load(Ordering::Relaxed)
}

#[inline]
#[allow(dead_code)]
pub fn set_enabled(on: bool) {
    TRACE_ENABLED.store(on, Ordering::Relaxed)
}

#[inline]
pub fn out_packet(packet: &Packet) {
    if enabled() {
        tracing::info!(
            target: "wire_trace",
            "OUT {} len={}",
            packet.opcode(),
            packet.raw_payload().len()
        );
    }
}

#[inline]
pub fn in_packet(packet: &Packet) {
    if enabled() {
        tracing::info!(
            target: "wire_trace",
            "IN  {} len={}",
            packet.opcode(),
            packet.raw_payload().len()
        );
    }
}
