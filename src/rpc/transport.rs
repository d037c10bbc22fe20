//! Observer transport abstraction: any multi-client text channel.
//!
//! Concrete implementations:
//! - [`QueuedTransport`] on the device: the control loop only queues, and
//!   the WebSocket writer (`adapters::ws_transport`) drains the queue
//! - Recording mocks in the host tests
//!
//! The broadcaster and engine are generic over `ObserverTransport`, so
//! adding a new transport requires zero changes to the protocol logic.

use super::channels::{self, OutboundMsg};
use super::clients::ClientId;

/// Text-frame transport with per-client addressing.
///
/// Implementations used by the control loop must not block: these are
/// called from inside `AppService::tick`, ahead of the siren update.
pub trait ObserverTransport {
    /// Send `payload` to every attached client.
    fn broadcast(&mut self, payload: &str);

    /// Send `payload` to one client.  Unknown clients are ignored.
    fn send(&mut self, client: ClientId, payload: &str);

    /// Close a connection (table full or idle expiry).
    fn close(&mut self, client: ClientId);
}

/// Hands every frame to the outbound channel.
pub struct QueuedTransport;

impl ObserverTransport for QueuedTransport {
    fn broadcast(&mut self, payload: &str) {
        channels::queue_outbound(OutboundMsg::Broadcast(payload.to_owned()));
    }

    fn send(&mut self, client: ClientId, payload: &str) {
        let msg = OutboundMsg::To { client_id: client, payload: payload.to_owned() };
        channels::queue_outbound(msg);
    }

    fn close(&mut self, client: ClientId) {
        channels::queue_outbound(OutboundMsg::Close(client));
    }
}

/// A null transport that discards everything.
/// Useful as a default when no observer server is running.
pub struct NullTransport;

impl ObserverTransport for NullTransport {
    fn broadcast(&mut self, _payload: &str) {}

    fn send(&mut self, _client: ClientId, _payload: &str) {}

    fn close(&mut self, _client: ClientId) {}
}
