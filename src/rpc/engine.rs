//! RPC engine: dispatches inbound observer frames to the AppService.
//!
//! **Transport-decoupled**: the engine does not own a transport.  The
//! control loop feeds `(client_id, frame)` via [`RpcEngine::dispatch`] and
//! receives an optional [`Reply`] addressed to the sender.  Broadcasts
//! to everyone flow through the [`EventSink`] instead.
//!
//! All frames pass through a gate pipeline:
//!
//! 1. **Known client**: frames from unregistered connections are dropped.
//! 2. **Rate limiting**: token-bucket rejects bursts (via `burster`).
//! 3. **Decode**: malformed JSON or unknown actions are rejected.
//! 4. **Role gate**: viewers may only read; the app service enforces
//!    schedule ownership on top of this.

use log::{info, warn};

use crate::app::commands::{Caller, CommandContext, CommandReply};
use crate::app::ports::{EventSink, RelayPort};
use crate::app::service::AppService;
use crate::clock::Tick;
use crate::config::SystemConfig;
use crate::error::CommandError;

use super::clients::{ClientId, ClientTable, MAX_CLIENTS};
use super::protocol::{Outbound, Request, ScheduleView, decode_request, encode};

/// Response frame produced by the engine, tagged with destination client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub client_id: ClientId,
    pub payload: String,
}

/// Wall-clock-independent inputs for one dispatch.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTime {
    pub now: Tick,
    pub unix_secs: Option<u64>,
}

/// Transport-decoupled RPC engine with the observer client table.
pub struct RpcEngine {
    clients: ClientTable,
    rejected: u32,
}

impl RpcEngine {
    pub fn new(config: &SystemConfig) -> Self {
        Self { clients: ClientTable::new(config.client_idle_timeout_ms), rejected: 0 }
    }

    // ── Connection lifecycle ─────────────────────────────────

    /// Register a connection.  On `Err` the caller should close it.
    pub fn on_connect(&mut self, client_id: ClientId, now: Tick) -> Result<(), CommandError> {
        self.clients.connect(client_id, now)
    }

    pub fn on_disconnect(&mut self, client_id: ClientId) {
        self.clients.disconnect(client_id);
    }

    /// Keep-alive traffic without a command.
    pub fn on_activity(&mut self, client_id: ClientId, now: Tick) {
        self.clients.touch(client_id, now);
    }

    /// Attach a resolved identity to a connection.
    pub fn set_identity(&mut self, client_id: ClientId, caller: Caller) -> bool {
        self.clients.set_identity(client_id, caller)
    }

    /// Expire idle clients; returns the ids the transport should close.
    pub fn sweep(&mut self, now: Tick) -> heapless::Vec<ClientId, MAX_CLIENTS> {
        self.clients.sweep(now)
    }

    pub fn clients(&self) -> &ClientTable {
        &self.clients
    }

    /// Commands rejected since boot.
    pub fn rejected_count(&self) -> u32 {
        self.rejected
    }

    // ── Dispatch ─────────────────────────────────────────────

    /// Run one frame through the gates and the app service.
    pub fn dispatch(
        &mut self,
        client_id: ClientId,
        frame: &str,
        time: DispatchTime,
        app: &mut AppService,
        relay: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) -> Option<Reply> {
        // Gate 1: known client
        let Some(client) = self.clients.get_mut(client_id) else {
            warn!("rpc: frame from unknown client {}", client_id);
            return None;
        };
        client.last_seen = time.now;
        let allowed = client.check_rate_limit();
        let caller = client.caller.clone();

        // Gate 2: rate limit
        if !allowed {
            return self.reject(client_id, "?", CommandError::RateLimited);
        }

        // Gate 3: decode
        let request = match decode_request(frame) {
            Ok(r) => r,
            Err(e) => return self.reject(client_id, "?", e),
        };

        match request {
            Request::ListSchedules => {
                let schedules = app.schedules();
                let msg = Outbound::SchedulesList {
                    scheduling_enabled: schedules.scheduling_enabled(),
                    schedules: schedules
                        .list_for(&caller.username, caller.role.is_admin())
                        .map(ScheduleView::from)
                        .collect(),
                };
                Self::reply(client_id, &msg)
            }
            Request::Command(cmd) => {
                let name = cmd.name();

                // Gate 4: role
                if !caller.role.can_control() {
                    return self.reject(client_id, name, CommandError::PermissionDenied);
                }

                let ctx = CommandContext { now: time.now, unix_secs: time.unix_secs, caller: &caller };
                match app.handle_command(cmd, &ctx, relay, sink) {
                    Ok(reply) => {
                        info!("rpc: {} from {} ({}) ok", name, client_id, caller.username);
                        Self::reply_for(client_id, &reply)
                    }
                    Err(e) => self.reject(client_id, name, e),
                }
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────

    fn reject(&mut self, client_id: ClientId, action: &str, e: CommandError) -> Option<Reply> {
        self.rejected = self.rejected.wrapping_add(1);
        warn!("rpc: {} from {} rejected: {}", action, client_id, e);
        Self::reply(client_id, &Outbound::error(e))
    }

    fn reply_for(client_id: ClientId, reply: &CommandReply) -> Option<Reply> {
        let msg = match reply {
            // Timer transitions and the master switch reach everyone,
            // including the sender, through the broadcaster.
            CommandReply::Done | CommandReply::SchedulingChanged(_) => return None,
            CommandReply::SettingsSaved => Outbound::SettingsSaved,
            CommandReply::ScheduleAdded(s) => Outbound::ScheduleAdded { schedule: s.into() },
            CommandReply::ScheduleUpdated(s) => Outbound::ScheduleUpdated { schedule: s.into() },
            CommandReply::ScheduleDeleted(id) => Outbound::ScheduleDeleted { id: id.as_str() },
        };
        Self::reply(client_id, &msg)
    }

    fn reply(client_id: ClientId, msg: &Outbound<'_>) -> Option<Reply> {
        encode(msg).map(|payload| Reply { client_id, payload })
    }
}
