//! Observer client table.
//!
//! A fixed-capacity table keyed by the transport's connection id.  Each
//! entry carries the caller identity supplied by the identity collaborator,
//! a token-bucket command limiter and the tick of the last inbound frame.
//! The control loop sweeps the table every iteration; entries are purged
//! on disconnect or idle expiry.

use burster::Limiter;
use core::time::Duration;
use log::{info, warn};

use crate::app::commands::Caller;
use crate::clock::{self, Tick};
use crate::error::CommandError;

// ── Constants ────────────────────────────────────────────────

/// Maximum number of concurrently attached observers.
pub const MAX_CLIENTS: usize = 10;

/// Connection identifier assigned by the transport.
pub type ClientId = u32;

// ── Client entry ─────────────────────────────────────────────

pub struct Client {
    pub id: ClientId,
    pub caller: Caller,
    pub connected_at: Tick,
    pub last_seen: Tick,
    rate_limiter: burster::TokenBucket<fn() -> Duration>,
}

impl Client {
    fn new(id: ClientId, now: Tick) -> Self {
        Self {
            id,
            caller: Caller::anonymous(),
            connected_at: now,
            last_seen: now,
            rate_limiter: burster::TokenBucket::new_with_time_provider(
                10,
                10, // 10 commands per second, 10 burst capacity
                platform_now as fn() -> Duration,
            ),
        }
    }

    /// Consume one rate-limit token; returns `false` when exhausted.
    pub fn check_rate_limit(&mut self) -> bool {
        self.rate_limiter.try_consume(1).is_ok()
    }
}

// ── Table ────────────────────────────────────────────────────

pub struct ClientTable {
    clients: heapless::Vec<Client, MAX_CLIENTS>,
    idle_timeout_ms: u32,
}

impl ClientTable {
    pub fn new(idle_timeout_ms: u32) -> Self {
        Self { clients: heapless::Vec::new(), idle_timeout_ms }
    }

    /// Register a new connection as an anonymous viewer.
    pub fn connect(&mut self, id: ClientId, now: Tick) -> Result<(), CommandError> {
        if let Some(existing) = self.get_mut(id) {
            // Transport reused an id without telling us; start fresh.
            *existing = Client::new(id, now);
            return Ok(());
        }
        self.clients.push(Client::new(id, now)).map_err(|_| {
            warn!("clients: table full, refusing {}", id);
            CommandError::TableFull
        })?;
        info!("clients: {} connected ({}/{})", id, self.clients.len(), MAX_CLIENTS);
        Ok(())
    }

    /// Purge a connection.  Returns `false` if it was unknown.
    pub fn disconnect(&mut self, id: ClientId) -> bool {
        match self.clients.iter().position(|c| c.id == id) {
            Some(idx) => {
                self.clients.swap_remove(idx);
                info!("clients: {} disconnected ({}/{})", id, self.clients.len(), MAX_CLIENTS);
                true
            }
            None => false,
        }
    }

    /// Attach the identity resolved by the identity collaborator.
    pub fn set_identity(&mut self, id: ClientId, caller: Caller) -> bool {
        match self.get_mut(id) {
            Some(client) => {
                info!("clients: {} is {} ({:?})", id, caller.username, caller.role);
                client.caller = caller;
                true
            }
            None => false,
        }
    }

    pub fn touch(&mut self, id: ClientId, now: Tick) {
        if let Some(client) = self.get_mut(id) {
            client.last_seen = now;
        }
    }

    /// Drop clients idle for longer than the timeout and return their ids
    /// so the transport can close them.
    pub fn sweep(&mut self, now: Tick) -> heapless::Vec<ClientId, MAX_CLIENTS> {
        let mut expired = heapless::Vec::new();
        let timeout = self.idle_timeout_ms;
        self.clients.retain(|c| {
            if clock::elapsed(c.last_seen, now) > timeout {
                // Capacity matches the table, so this cannot overflow.
                let _ = expired.push(c.id);
                false
            } else {
                true
            }
        });
        for id in &expired {
            info!("clients: {} expired after {} ms idle", id, timeout);
        }
        expired
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

// ── Platform time for rate limiter ───────────────────────────

#[cfg(target_os = "espidf")]
fn platform_now() -> Duration {
    // SAFETY: esp_timer_get_time has no preconditions after boot.
    let us = unsafe { esp_idf_sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

#[cfg(not(target_os = "espidf"))]
fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}

// ── Tests ────────────────────────────────────────────────────
