//! Match timer state machine.
//!
//! ```text
//!            start()             pause()
//!   Idle ───────────► Running ───────────► Paused
//!    ▲                │  ▲  ◄──────────────  │
//!    │ reset()        │  │     resume()      │
//!    │                │  └─ round ended,     │
//!    │                │     more rounds      │
//!    │                ▼                      │
//!    └──────────── Finished ◄────────────────┘ reset() from any state
//!                    │ start()
//!                    └──────► Running
//! ```
//!
//! The timer never reads a clock itself: every transition takes `now`
//! from the caller.  Transitions requested from the wrong state are
//! no-ops that return `false`; the caller is expected to check
//! [`MatchTimer::state`] first and reject the command.

use log::{debug, info};
use serde::Serialize;

use crate::clock::{self, Tick};
use crate::config::TimerSettings;

/// Lifecycle state of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Finished,
}

impl TimerState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Finished => "FINISHED",
        }
    }

    /// A match is in progress (countdowns are meaningful).
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// Timing configuration consumed by the engine.
///
/// Deliberately unvalidated: the engine accepts any durations (including
/// a zero-length break) and leaves range checks to the command boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub game_duration_ms: u32,
    pub break_duration_ms: u32,
    pub num_rounds: u8,
    pub break_enabled: bool,
}

impl From<&TimerSettings> for TimerConfig {
    fn from(s: &TimerSettings) -> Self {
        Self {
            game_duration_ms: s.game_duration_ms,
            break_duration_ms: s.break_duration_ms,
            num_rounds: s.num_rounds,
            break_enabled: s.break_enabled,
        }
    }
}

/// Events raised by a single [`MatchTimer::update`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerEvents {
    pub break_ended: bool,
    pub round_ended: bool,
    pub match_finished: bool,
}

impl TimerEvents {
    pub const fn any(&self) -> bool {
        self.break_ended || self.round_ended || self.match_finished
    }
}

/// Point-in-time view of the timer for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub status: TimerState,
    pub main_remaining_ms: u32,
    pub break_remaining_ms: u32,
    pub current_round: u8,
    pub num_rounds: u8,
}

/// Authoritative match/round/break countdown.
#[derive(Debug, Clone)]
pub struct MatchTimer {
    state: TimerState,
    config: TimerConfig,
    current_round: u8,
    main_start: Tick,
    break_start: Tick,
    main_remaining: u32,
    break_remaining: u32,
    break_siren_sounded: bool,
}

impl MatchTimer {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            state: TimerState::Idle,
            config,
            current_round: 1,
            main_start: 0,
            break_start: 0,
            main_remaining: 0,
            break_remaining: 0,
            break_siren_sounded: false,
        }
    }

    // ── Transitions ────────────────────────────────────────────

    /// Begin round one.  Valid from Idle or Finished.
    pub fn start(&mut self, now: Tick) -> bool {
        if self.state.is_active() {
            return false;
        }
        self.current_round = 1;
        self.begin_round(now);
        self.state = TimerState::Running;
        info!(
            "timer: started ({} rounds x {} ms)",
            self.config.num_rounds, self.config.game_duration_ms
        );
        true
    }

    /// Freeze both countdowns.  Valid from Running.
    pub fn pause(&mut self, now: Tick) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.recompute(now);
        self.state = TimerState::Paused;
        info!("timer: paused, {} ms left in round {}", self.main_remaining, self.current_round);
        true
    }

    /// Continue from the frozen remaining times.  Valid from Paused.
    pub fn resume(&mut self, now: Tick) -> bool {
        if self.state != TimerState::Paused {
            return false;
        }
        let main_used = self.config.game_duration_ms.saturating_sub(self.main_remaining);
        let break_used = self.config.break_duration_ms.saturating_sub(self.break_remaining);
        self.main_start = clock::rebase(now, main_used);
        self.break_start = clock::rebase(now, break_used);
        self.state = TimerState::Running;
        info!("timer: resumed");
        true
    }

    /// Return to Idle from any state.  Configuration is untouched.
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.current_round = 1;
        self.main_remaining = 0;
        self.break_remaining = 0;
        self.break_siren_sounded = false;
        info!("timer: reset");
    }

    /// Advance the countdowns and report what happened since the last call.
    pub fn update(&mut self, now: Tick) -> TimerEvents {
        let mut events = TimerEvents::default();
        if self.state != TimerState::Running {
            return events;
        }

        self.recompute(now);

        if self.config.break_enabled && !self.break_siren_sounded && self.break_remaining == 0 {
            self.break_siren_sounded = true;
            events.break_ended = true;
            info!("timer: break ended in round {}", self.current_round);
        }

        if self.main_remaining == 0 {
            events.round_ended = true;
            if self.current_round >= self.config.num_rounds {
                self.state = TimerState::Finished;
                events.match_finished = true;
                info!("timer: match finished after {} rounds", self.current_round);
            } else {
                self.current_round += 1;
                self.begin_round(now);
                info!("timer: round {} of {}", self.current_round, self.config.num_rounds);
            }
        }

        events
    }

    /// Replace the timing configuration.  Refused while a match is in progress.
    pub fn apply_config(&mut self, config: TimerConfig) -> bool {
        if self.state.is_active() {
            return false;
        }
        self.config = config;
        debug!("timer: config {:?}", config);
        true
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn current_round(&self) -> u8 {
        self.current_round
    }

    pub fn main_remaining(&self) -> u32 {
        self.main_remaining
    }

    pub fn break_remaining(&self) -> u32 {
        self.break_remaining
    }

    /// Observer view.  Idle shows the full durations, Finished shows zero.
    pub fn snapshot(&self) -> TimerSnapshot {
        let (main, brk) = match self.state {
            TimerState::Running | TimerState::Paused => (self.main_remaining, self.break_remaining),
            TimerState::Idle => (self.config.game_duration_ms, self.config.break_duration_ms),
            TimerState::Finished => (0, 0),
        };
        TimerSnapshot {
            status: self.state,
            main_remaining_ms: main,
            break_remaining_ms: brk,
            current_round: self.current_round,
            num_rounds: self.config.num_rounds,
        }
    }

    // ── Internals ──────────────────────────────────────────────

    fn begin_round(&mut self, now: Tick) {
        self.main_start = now;
        self.break_start = now;
        self.main_remaining = self.config.game_duration_ms;
        self.break_remaining = self.config.break_duration_ms;
        self.break_siren_sounded = false;
    }

    fn recompute(&mut self, now: Tick) {
        self.main_remaining = clock::remaining(self.config.game_duration_ms, self.main_start, now);
        self.break_remaining =
            clock::remaining(self.config.break_duration_ms, self.break_start, now);
    }
}
