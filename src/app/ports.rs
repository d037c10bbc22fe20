//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (relay, clock, event sinks, storage) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches hardware directly.
//!
//! The observer transport lives with the protocol code in
//! [`rpc::transport`](crate::rpc::transport).

use crate::clock::Tick;
use crate::scheduler::WeekMinute;

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the siren relay.
pub trait RelayPort {
    /// Energise (`true`) or release (`false`) the relay.
    fn set_relay(&mut self, on: bool);

    fn is_relay_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: hardware / RTC → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic and wall-clock time.
pub trait ClockPort {
    /// Free-running millisecond counter, wraps at 2^32.
    fn now_ms(&self) -> Tick;

    /// Local week minute, or `None` until the wall clock has been set.
    fn week_minute(&self) -> Option<WeekMinute>;

    /// Seconds since the Unix epoch, or `None` until the wall clock has been set.
    fn unix_secs(&self) -> Option<u64>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / observers)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// WebSocket observers, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan one event stream out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Opaque blob store, one blob per namespace.
///
/// - Write operations MUST be atomic, with no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
/// - Callers never invoke this from inside a timer or siren update.
pub trait StoragePort {
    /// Read the blob stored under `namespace`.
    fn load_blob(&self, namespace: &str) -> Result<Vec<u8>, StorageError>;

    /// Replace the blob stored under `namespace`.
    fn save_blob(&mut self, namespace: &str, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Nothing stored under the namespace.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored blob failed to deserialize.
    Corrupted,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "blob not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "blob corrupted"),
        }
    }
}
