//! Transport-to-loop channels.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge the transport's
//! server task with the synchronous control loop.  The transport only
//! enqueues; all state mutation happens when the loop drains the queue,
//! which gives every command a single total order.
//!
//! ```text
//! ┌──────────────┐  LifecycleMsg ┌──────────────┐
//! │ WS server    │──────────────▶│ Control Loop │
//! │ (httpd task) │  InboundMsg   │ (sync)       │
//! │              │──────────────▶│              │
//! └──────────────┘               └──────┬───────┘
//! ┌──────────────┐  OutboundMsg         │
//! │ WS writer    │◀─────────────────────┘
//! │ (thread)     │
//! └──────────────┘
//! ```
//!
//! Connects and disconnects travel on their own channel so a burst of
//! frames can never crowd them out, and [`try_next`] hands them out first.
//! Outbound frames are only queued by the loop; a writer task owns the
//! sockets and does the (possibly slow) sends.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use super::clients::{ClientId, MAX_CLIENTS};
use super::protocol::MAX_FRAME_LEN;

/// Event from the transport, delivered to the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMsg {
    Connected(ClientId),
    /// One complete text frame.
    Frame { client_id: ClientId, text: heapless::String<MAX_FRAME_LEN> },
    /// Keep-alive traffic (ping/pong); refreshes the idle timer.
    Activity(ClientId),
    Disconnected(ClientId),
}

impl InboundMsg {
    fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Connected(_) | Self::Disconnected(_))
    }
}

/// Frame produced by the control loop for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMsg {
    Broadcast(String),
    To { client_id: ClientId, payload: String },
    Close(ClientId),
}

/// Frames and keep-alives.
const INBOUND_DEPTH: usize = 16;

/// Every table slot plus a refused extra can connect and close once per drain.
const LIFECYCLE_DEPTH: usize = 2 * (MAX_CLIENTS + 1);

/// A full greeting round for every client plus one transition.
const OUTBOUND_DEPTH: usize = 4 * MAX_CLIENTS + 8;

/// Frame channel: transport task → control loop.
pub static INBOUND_CHANNEL: Channel<CriticalSectionRawMutex, InboundMsg, INBOUND_DEPTH> =
    Channel::new();

/// Connect/disconnect channel: transport task → control loop.
pub static LIFECYCLE_CHANNEL: Channel<CriticalSectionRawMutex, InboundMsg, LIFECYCLE_DEPTH> =
    Channel::new();

/// Outbound channel: control loop → writer task.
pub static OUTBOUND_CHANNEL: Channel<CriticalSectionRawMutex, OutboundMsg, OUTBOUND_DEPTH> =
    Channel::new();

// ── Inbound ──────────────────────────────────────────────────

/// Enqueue a text frame.  Oversized frames and a full queue are dropped.
pub fn push_frame(client_id: ClientId, text: &str) -> bool {
    let mut buf = heapless::String::new();
    if buf.push_str(text).is_err() {
        warn!("channels: frame from {} exceeds {} bytes, dropped", client_id, MAX_FRAME_LEN);
        return false;
    }
    push(InboundMsg::Frame { client_id, text: buf })
}

/// Enqueue any inbound message without blocking.
pub fn push(msg: InboundMsg) -> bool {
    let sent = if msg.is_lifecycle() {
        LIFECYCLE_CHANNEL.try_send(msg)
    } else {
        INBOUND_CHANNEL.try_send(msg)
    };
    match sent {
        Ok(()) => true,
        Err(embassy_sync::channel::TrySendError::Full(msg)) => {
            warn!("channels: inbound queue full, {} dropped", msg_kind(&msg));
            false
        }
    }
}

/// Pop the next pending message, connects and disconnects first.
pub fn try_next() -> Option<InboundMsg> {
    LIFECYCLE_CHANNEL.try_receive().or_else(|_| INBOUND_CHANNEL.try_receive()).ok()
}

fn msg_kind(msg: &InboundMsg) -> &'static str {
    match msg {
        InboundMsg::Connected(_) => "connect",
        InboundMsg::Frame { .. } => "frame",
        InboundMsg::Activity(_) => "activity",
        InboundMsg::Disconnected(_) => "disconnect",
    }
}

// ── Outbound ─────────────────────────────────────────────────

/// Queue a frame for the writer.  Never blocks; a full queue drops it.
pub fn queue_outbound(msg: OutboundMsg) -> bool {
    if OUTBOUND_CHANNEL.try_send(msg).is_err() {
        warn!("channels: outbound queue full, frame dropped");
        return false;
    }
    true
}

/// Wait for the next outbound frame.  Wakes as soon as the loop queues one.
pub async fn next_outbound() -> OutboundMsg {
    OUTBOUND_CHANNEL.receive().await
}

/// Pop an outbound frame without waiting.
pub fn try_next_outbound() -> Option<OutboundMsg> {
    OUTBOUND_CHANNEL.try_receive().ok()
}
