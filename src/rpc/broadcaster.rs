//! Observer state synchronisation.
//!
//! [`SyncBroadcaster`] keeps every attached observer consistent with the
//! authoritative timer:
//!
//! - **Transitions**: each observable timer transition is broadcast as a
//!   discrete event followed by a full `state` snapshot.
//! - **Periodic sync**: while Running, a lighter `sync` frame with the
//!   server tick goes out every `sync_interval_ms` so observers that
//!   missed an event or drift self-correct.
//! - **Greeting**: a newly attached observer immediately receives the
//!   settings, then `sync` (Running/Paused) or `state` (otherwise), then
//!   the scheduling master switch.
//!
//! The broadcaster owns the transport and implements [`EventSink`], so
//! the app service feeds it directly.

use log::debug;

use crate::app::events::{AppEvent, Transition};
use crate::app::ports::EventSink;
use crate::app::service::AppService;
use crate::clock::{self, Tick};
use crate::config::SystemConfig;
use crate::timer::{TimerSnapshot, TimerState};

use super::clients::ClientId;
use super::protocol::{Outbound, SettingsView, StateView, SyncView, encode};
use super::transport::ObserverTransport;

pub struct SyncBroadcaster<T: ObserverTransport> {
    transport: T,
    sync_interval_ms: u32,
    last_sync: Option<Tick>,
    frames_sent: u64,
}

impl<T: ObserverTransport> SyncBroadcaster<T> {
    pub fn new(transport: T, config: &SystemConfig) -> Self {
        Self {
            transport,
            sync_interval_ms: config.sync_interval_ms,
            last_sync: None,
            frames_sent: 0,
        }
    }

    /// Bring a newly attached observer up to date.
    pub fn greet(&mut self, client: ClientId, app: &AppService, now: Tick) {
        let snapshot = app.timer_snapshot();
        self.send(client, &Outbound::Settings { settings: SettingsView::from(app.settings()) });
        if snapshot.status.is_active() {
            self.send(client, &Outbound::Sync(SyncView::new(&snapshot, now)));
        } else {
            self.send(client, &Outbound::State { state: StateView::from(&snapshot) });
        }
        let enabled = app.schedules().scheduling_enabled();
        self.send(client, &Outbound::SchedulingStatus { enabled });
        debug!("sync: greeted {}", client);
    }

    /// Emit a periodic sync if Running and the interval has elapsed.
    /// Returns `true` if a frame went out.
    pub fn poll(&mut self, now: Tick, snapshot: &TimerSnapshot) -> bool {
        if snapshot.status != TimerState::Running {
            self.last_sync = None;
            return false;
        }
        let due = match self.last_sync {
            None => true,
            Some(last) => clock::elapsed(last, now) >= self.sync_interval_ms,
        };
        if !due {
            return false;
        }
        self.last_sync = Some(now);
        self.broadcast(&Outbound::Sync(SyncView::new(snapshot, now)));
        true
    }

    /// Send one frame to one observer.
    pub fn send(&mut self, client: ClientId, msg: &Outbound<'_>) {
        if let Some(payload) = encode(msg) {
            self.transport.send(client, &payload);
            self.frames_sent += 1;
        }
    }

    pub fn broadcast(&mut self, msg: &Outbound<'_>) {
        if let Some(payload) = encode(msg) {
            self.transport.broadcast(&payload);
            self.frames_sent += 1;
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    fn on_transition(&mut self, transition: Transition, snapshot: &TimerSnapshot) {
        let discrete = match transition {
            Transition::Started => Outbound::Start,
            Transition::Paused => Outbound::Pause,
            Transition::Resumed => Outbound::Resume,
            Transition::Reset => Outbound::Reset,
            Transition::RoundEnded => Outbound::NewRound { current_round: snapshot.current_round },
            Transition::MatchFinished => Outbound::Finished,
        };
        self.broadcast(&discrete);
        self.broadcast(&Outbound::State { state: StateView::from(snapshot) });
    }
}

impl<T: ObserverTransport> EventSink for SyncBroadcaster<T> {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Timer { transition, snapshot } => self.on_transition(*transition, snapshot),
            AppEvent::SettingsChanged(settings) => {
                self.broadcast(&Outbound::Settings { settings: SettingsView::from(settings) });
            }
            AppEvent::SchedulingChanged(enabled) => {
                self.broadcast(&Outbound::SchedulingStatus { enabled: *enabled });
            }
            AppEvent::SirenStarted { .. }
            | AppEvent::BreakEnded { .. }
            | AppEvent::ScheduleFired { .. }
            | AppEvent::ScheduleSkipped { .. } => {}
        }
    }
}
