//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the match timer, the siren sequencer and the
//! schedule table.  It exposes a clean, hardware-agnostic API.  All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!   week minute ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                   │          AppService          │
//!   AppCommand ───▶ │ Schedules · Timer · Siren    │ ──▶ RelayPort
//!                   └──────────────────────────────┘
//!                                 │ dirty flags
//!                                 ▼
//!                            StoragePort
//! ```
//!
//! One [`tick`](AppService::tick) runs the loop steps in order: schedule
//! check (at its own cadence), timer update, fanfare, siren update.
//! Storage is only touched from [`persist_if_dirty`](AppService::persist_if_dirty),
//! which the loop calls outside `tick`.

use log::{debug, info, warn};

use crate::clock::{self, Tick};
use crate::config::{
    BREAK_END_BLASTS, MATCH_END_BLASTS, ROUND_END_BLASTS, SystemConfig, TimerSettings,
};
use crate::error::CommandError;
use crate::scheduler::{ScheduleEngine, ScheduleLimits, ScheduleStore, WeekMinute, has_permission};
use crate::siren::SirenSequencer;
use crate::timer::{MatchTimer, TimerConfig, TimerEvents, TimerSnapshot, TimerState};

use super::commands::{AppCommand, CommandContext, CommandReply};
use super::events::{AppEvent, Transition};
use super::persistence;
use super::ports::{EventSink, RelayPort, StoragePort};

/// Siren blasts for the events of one timer update.  The most significant event wins.
pub fn fanfare_blasts(events: TimerEvents) -> u8 {
    if events.match_finished {
        MATCH_END_BLASTS
    } else if events.round_ended {
        ROUND_END_BLASTS
    } else if events.break_ended {
        BREAK_END_BLASTS
    } else {
        0
    }
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: SystemConfig,
    settings: TimerSettings,
    timer: MatchTimer,
    siren: SirenSequencer,
    schedules: ScheduleEngine,
    last_schedule_check: Option<Tick>,
    tick_count: u64,
    settings_dirty: bool,
    schedules_dirty: bool,
}

impl AppService {
    /// Construct the service from already-loaded state.
    pub fn new(config: SystemConfig, settings: TimerSettings, store: ScheduleStore) -> Self {
        let limits = ScheduleLimits::from(&config);
        Self {
            timer: MatchTimer::new(TimerConfig::from(&settings)),
            siren: SirenSequencer::new(settings.siren_length_ms, settings.siren_pause_ms),
            schedules: ScheduleEngine::from_store(store, limits),
            config,
            settings,
            last_schedule_check: None,
            tick_count: 0,
            settings_dirty: false,
            schedules_dirty: false,
        }
    }

    /// Load settings and schedules from storage, falling back to defaults.
    pub fn boot(config: SystemConfig, storage: &impl StoragePort) -> Self {
        let settings = persistence::load_settings(storage);
        let store = persistence::load_schedules(storage);
        let app = Self::new(config, settings, store);
        info!(
            "AppService ready: {} rounds x {} ms, {} schedule(s), auto-start {}",
            app.settings.num_rounds,
            app.settings.game_duration_ms,
            app.schedules.len(),
            if app.schedules.scheduling_enabled() { "on" } else { "off" }
        );
        app
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: schedules → timer → fanfare → siren.
    ///
    /// `week_minute` is `None` until the wall clock is synced, in which
    /// case schedules are not evaluated.
    pub fn tick(
        &mut self,
        now: Tick,
        week_minute: Option<WeekMinute>,
        relay: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        // 1. Schedule trigger, at its own cadence
        if let Some(wm) = week_minute {
            if self.schedule_check_due(now) {
                self.expire_records_after_gap(now);
                self.last_schedule_check = Some(now);
                self.poll_schedules(now, wm, sink);
            }
        }

        // 2. Timer
        let events = self.timer.update(now);

        // 3. Fanfare
        if events.any() {
            self.on_timer_events(events, now, sink);
        }

        // 4. Siren pulse state
        self.siren.update(now, relay);
    }

    // ── Command handling ──────────────────────────────────────

    /// Validate and apply an external command.
    ///
    /// Rejections leave every piece of state untouched.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        ctx: &CommandContext<'_>,
        relay: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandReply, CommandError> {
        let caller = ctx.caller;
        if !caller.role.can_control() {
            return Err(CommandError::PermissionDenied);
        }

        match cmd {
            AppCommand::Start => {
                if !self.timer.start(ctx.now) {
                    return Err(CommandError::InvalidState("match already in progress"));
                }
                self.emit_transition(Transition::Started, sink);
                Ok(CommandReply::Done)
            }
            AppCommand::Pause => match self.timer.state() {
                TimerState::Running => {
                    self.timer.pause(ctx.now);
                    self.emit_transition(Transition::Paused, sink);
                    Ok(CommandReply::Done)
                }
                TimerState::Paused => {
                    self.timer.resume(ctx.now);
                    self.emit_transition(Transition::Resumed, sink);
                    Ok(CommandReply::Done)
                }
                _ => Err(CommandError::InvalidState("timer is not running")),
            },
            AppCommand::Resume => {
                if !self.timer.resume(ctx.now) {
                    return Err(CommandError::InvalidState("timer is not paused"));
                }
                self.emit_transition(Transition::Resumed, sink);
                Ok(CommandReply::Done)
            }
            AppCommand::Reset => {
                self.siren.stop(relay);
                self.timer.reset();
                self.emit_transition(Transition::Reset, sink);
                Ok(CommandReply::Done)
            }
            AppCommand::SaveSettings(settings) => {
                settings.validate()?;
                if self.timer.state().is_active() {
                    return Err(CommandError::InvalidState("cannot change settings during a match"));
                }
                self.timer.apply_config(TimerConfig::from(&settings));
                self.siren.set_timing(settings.siren_length_ms, settings.siren_pause_ms);
                self.settings = settings;
                self.settings_dirty = true;
                info!("settings: updated by {}", caller.username);
                sink.emit(&AppEvent::SettingsChanged(settings));
                Ok(CommandReply::SettingsSaved)
            }
            AppCommand::AddSchedule(draft) => {
                let id = self.schedules.generate_id(ctx.now);
                let created_at = ctx.unix_secs.unwrap_or(u64::from(ctx.now));
                let schedule = draft.into_schedule(id, &caller.username, created_at);
                let added = self.schedules.add(schedule)?.clone();
                self.schedules_dirty = true;
                Ok(CommandReply::ScheduleAdded(added))
            }
            AppCommand::UpdateSchedule(draft) => {
                let id = draft.id.clone().ok_or(CommandError::Validation("id is required"))?;
                let existing = self.schedules.get(&id).ok_or(CommandError::UnknownSchedule)?;
                if !has_permission(existing, &caller.username, caller.role.is_admin()) {
                    return Err(CommandError::PermissionDenied);
                }
                let schedule = draft.into_schedule(id, &existing.owner_username, existing.created_at);
                let updated = self.schedules.update(schedule)?.clone();
                self.schedules_dirty = true;
                Ok(CommandReply::ScheduleUpdated(updated))
            }
            AppCommand::DeleteSchedule(id) => {
                let existing = self.schedules.get(&id).ok_or(CommandError::UnknownSchedule)?;
                if !has_permission(existing, &caller.username, caller.role.is_admin()) {
                    return Err(CommandError::PermissionDenied);
                }
                self.schedules.delete(&id)?;
                self.schedules_dirty = true;
                Ok(CommandReply::ScheduleDeleted(id))
            }
            AppCommand::EnableScheduling(enabled) => {
                if self.schedules.scheduling_enabled() != enabled {
                    self.schedules.set_scheduling_enabled(enabled);
                    self.schedules_dirty = true;
                    sink.emit(&AppEvent::SchedulingChanged(enabled));
                }
                Ok(CommandReply::SchedulingChanged(enabled))
            }
        }
    }

    // ── Persistence ───────────────────────────────────────────

    /// Flush dirty settings / schedules.  Returns `true` if anything was written.
    ///
    /// A failed write keeps the flag set so the next call retries.
    pub fn persist_if_dirty(&mut self, storage: &mut impl StoragePort) -> bool {
        let mut wrote = false;
        if self.settings_dirty {
            match persistence::save_settings(storage, &self.settings) {
                Ok(()) => {
                    self.settings_dirty = false;
                    wrote = true;
                    info!("settings persisted");
                }
                Err(e) => warn!("settings persist failed: {}", e),
            }
        }
        if self.schedules_dirty {
            match persistence::save_schedules(storage, &self.schedules.to_store()) {
                Ok(()) => {
                    self.schedules_dirty = false;
                    wrote = true;
                    info!("schedules persisted ({})", self.schedules.len());
                }
                Err(e) => warn!("schedules persist failed: {}", e),
            }
        }
        wrote
    }

    pub fn is_dirty(&self) -> bool {
        self.settings_dirty || self.schedules_dirty
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn timer_snapshot(&self) -> TimerSnapshot {
        self.timer.snapshot()
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn schedules(&self) -> &ScheduleEngine {
        &self.schedules
    }

    pub fn siren_active(&self) -> bool {
        self.siren.is_active()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn schedule_check_due(&self, now: Tick) -> bool {
        match self.last_schedule_check {
            None => true,
            Some(last) => clock::elapsed(last, now) >= self.config.schedule_check_interval_ms,
        }
    }

    /// Every trigger record predates the previous check.  If that check is
    /// at least a debounce window old (clock unsynced in between), none of
    /// them can still be suppressing anything.
    fn expire_records_after_gap(&mut self, now: Tick) {
        let Some(last) = self.last_schedule_check else { return };
        let debounce_ms = u32::from(self.config.trigger_debounce_min) * 60_000;
        let gap = clock::elapsed(last, now);
        if gap >= debounce_ms {
            debug!("schedules: {} ms since last check, trigger records cleared", gap);
            self.schedules.clear_trigger_records();
        }
    }

    fn poll_schedules(&mut self, now: Tick, wm: WeekMinute, sink: &mut impl EventSink) {
        let Some(fired) = self.schedules.check_trigger(wm) else {
            return;
        };
        let id = fired.id.clone();
        let club_name = fired.club_name.clone();
        self.schedules.mark_triggered(&id, wm);

        if self.timer.start(now) {
            info!("schedule {} ({}) auto-started a match", id, club_name);
            sink.emit(&AppEvent::ScheduleFired { id, club_name });
            self.emit_transition(Transition::Started, sink);
        } else {
            warn!("schedule {} fired during a match, not starting", id);
            sink.emit(&AppEvent::ScheduleSkipped { id });
        }
    }

    fn on_timer_events(&mut self, events: TimerEvents, now: Tick, sink: &mut impl EventSink) {
        if events.break_ended {
            // The round counter has already moved on if the round ended too.
            let round = if events.round_ended && !events.match_finished {
                self.timer.current_round().saturating_sub(1)
            } else {
                self.timer.current_round()
            };
            sink.emit(&AppEvent::BreakEnded { round });
        }
        if events.match_finished {
            self.emit_transition(Transition::MatchFinished, sink);
        } else if events.round_ended {
            self.emit_transition(Transition::RoundEnded, sink);
        }

        let blasts = fanfare_blasts(events);
        if blasts > 0 && self.siren.start(blasts, now) {
            sink.emit(&AppEvent::SirenStarted { blasts });
        }
    }

    fn emit_transition(&self, transition: Transition, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Timer { transition, snapshot: self.timer.snapshot() });
    }
}
