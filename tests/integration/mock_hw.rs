//! Mock adapters for integration tests.
//!
//! Records every relay edge, stored blob and transmitted frame so tests can
//! assert on the full history without touching real GPIO, flash or sockets.

use std::collections::HashMap;

use courttimer::app::events::AppEvent;
use courttimer::app::ports::{EventSink, RelayPort, StorageError, StoragePort};
use courttimer::clock::Tick;
use courttimer::rpc::clients::ClientId;
use courttimer::rpc::transport::ObserverTransport;
use serde_json::Value;

// ── MockRelay ────────────────────────────────────────────────

/// Relay that records each edge.
#[derive(Default)]
pub struct MockRelay {
    pub on: bool,
    pub edges: Vec<bool>,
}

#[allow(dead_code)]
impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed on-pulses.
    pub fn pulses(&self) -> usize {
        self.edges.iter().filter(|on| **on).count()
    }
}

impl RelayPort for MockRelay {
    fn set_relay(&mut self, on: bool) {
        if on != self.on {
            self.edges.push(on);
        }
        self.on = on;
    }

    fn is_relay_on(&self) -> bool {
        self.on
    }
}

// ── MockStorage ──────────────────────────────────────────────

/// Blob store with failure injection.
#[derive(Default)]
pub struct MockStorage {
    pub blobs: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
    pub writes: usize,
}

#[allow(dead_code)]
impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoragePort for MockStorage {
    fn load_blob(&self, namespace: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs.get(namespace).cloned().ok_or(StorageError::NotFound)
    }

    fn save_blob(&mut self, namespace: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.writes += 1;
        self.blobs.insert(namespace.to_owned(), data.to_vec());
        Ok(())
    }
}

// ── RecordingTransport ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Broadcast(Value),
    To(ClientId, Value),
    Closed(ClientId),
}

/// Transport that parses and records every outbound frame.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Vec<Sent>,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `event` names of broadcast frames, in order.
    pub fn broadcast_events(&self) -> Vec<String> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Broadcast(v) => v["event"].as_str().map(str::to_owned),
                _ => None,
            })
            .collect()
    }

    /// Frames addressed to one client, in order.
    pub fn frames_to(&self, client: ClientId) -> Vec<&Value> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::To(id, v) if *id == client => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl ObserverTransport for RecordingTransport {
    fn broadcast(&mut self, payload: &str) {
        let v = serde_json::from_str(payload).expect("broadcast payload is JSON");
        self.sent.push(Sent::Broadcast(v));
    }

    fn send(&mut self, client: ClientId, payload: &str) {
        let v = serde_json::from_str(payload).expect("unicast payload is JSON");
        self.sent.push(Sent::To(client, v));
    }

    fn close(&mut self, client: ClientId) {
        self.sent.push(Sent::Closed(client));
    }
}

// ── RecordingSink ────────────────────────────────────────────

/// Event sink that keeps every event.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn siren_blasts(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::SirenStarted { blasts } => Some(*blasts),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

/// Tick the app every `step` ms from `from` up to and including `to`.
#[allow(dead_code)]
pub fn run_until(
    app: &mut courttimer::app::service::AppService,
    from: Tick,
    to: Tick,
    step: u32,
    relay: &mut MockRelay,
    sink: &mut impl EventSink,
) {
    let mut now = from;
    loop {
        app.tick(now, None, relay, sink);
        if now >= to {
            break;
        }
        now = (now + step).min(to);
    }
}
