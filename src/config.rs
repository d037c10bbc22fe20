//! System configuration parameters
//!
//! Two layers of tuning live here:
//!
//! * [`TimerSettings`]: the operator-editable match configuration, persisted
//!   to NVS and changed through the `save_settings` command.
//! * [`SystemConfig`]: compiled-in runtime tuning for the control loop,
//!   schedule engine and observer protocol.
//!
//! All bounds enforced at the command boundary are `pub const`s so tests
//! and the wire layer can refer to them by name.

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, Error};
use crate::scheduler::MINUTES_PER_WEEK;

// ── Timer defaults ─────────────────────────────────────────────

pub const DEFAULT_GAME_DURATION_MS: u32 = 21 * 60 * 1000;
pub const DEFAULT_BREAK_DURATION_MS: u32 = 60 * 1000;
pub const DEFAULT_NUM_ROUNDS: u8 = 3;
pub const DEFAULT_SIREN_LENGTH_MS: u32 = 1000;
pub const DEFAULT_SIREN_PAUSE_MS: u32 = 1000;

// ── Validation bounds ──────────────────────────────────────────

pub const MIN_GAME_DURATION_MIN: u32 = 1;
pub const MAX_GAME_DURATION_MIN: u32 = 120;
pub const MIN_ROUNDS: u8 = 1;
pub const MAX_ROUNDS: u8 = 20;
pub const MIN_BREAK_DURATION_SEC: u32 = 1;
pub const MAX_BREAK_DURATION_SEC: u32 = 3600;
/// Break may not exceed this share of the game duration.
pub const MAX_BREAK_PERCENT: u32 = 50;
pub const MIN_SIREN_MS: u32 = 100;
pub const MAX_SIREN_MS: u32 = 10_000;

// ── Siren fanfare ──────────────────────────────────────────────

pub const BREAK_END_BLASTS: u8 = 1;
pub const ROUND_END_BLASTS: u8 = 2;
pub const MATCH_END_BLASTS: u8 = 3;

/// Operator-editable match configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub game_duration_ms: u32,
    pub break_duration_ms: u32,
    pub num_rounds: u8,
    pub break_enabled: bool,
    /// Relay on-time per blast.
    pub siren_length_ms: u32,
    /// Relay off-time between blasts.
    pub siren_pause_ms: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            game_duration_ms: DEFAULT_GAME_DURATION_MS,
            break_duration_ms: DEFAULT_BREAK_DURATION_MS,
            num_rounds: DEFAULT_NUM_ROUNDS,
            break_enabled: true,
            siren_length_ms: DEFAULT_SIREN_LENGTH_MS,
            siren_pause_ms: DEFAULT_SIREN_PAUSE_MS,
        }
    }
}

impl TimerSettings {
    /// Check every field against the boundary limits.
    ///
    /// The break bounds apply even when the break timer is disabled so a
    /// stored configuration stays valid if it is re-enabled later.
    pub fn validate(&self) -> Result<(), CommandError> {
        let game_min = MIN_GAME_DURATION_MIN * 60_000;
        let game_max = MAX_GAME_DURATION_MIN * 60_000;
        if !(game_min..=game_max).contains(&self.game_duration_ms) {
            return Err(CommandError::Validation("gameDuration must be 1-120 minutes"));
        }
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&self.num_rounds) {
            return Err(CommandError::Validation("numRounds must be 1-20"));
        }
        let break_min = MIN_BREAK_DURATION_SEC * 1000;
        let break_max = MAX_BREAK_DURATION_SEC * 1000;
        if !(break_min..=break_max).contains(&self.break_duration_ms) {
            return Err(CommandError::Validation("breakDuration must be 1-3600 seconds"));
        }
        if u64::from(self.break_duration_ms) * 100
            > u64::from(self.game_duration_ms) * u64::from(MAX_BREAK_PERCENT)
        {
            return Err(CommandError::Validation(
                "breakDuration must not exceed 50% of gameDuration",
            ));
        }
        if !(MIN_SIREN_MS..=MAX_SIREN_MS).contains(&self.siren_length_ms) {
            return Err(CommandError::Validation("sirenLength must be 100-10000 ms"));
        }
        if !(MIN_SIREN_MS..=MAX_SIREN_MS).contains(&self.siren_pause_ms) {
            return Err(CommandError::Validation("sirenPause must be 100-10000 ms"));
        }
        Ok(())
    }
}

/// Compiled-in runtime tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Observer protocol ---
    /// Periodic sync cadence while Running (milliseconds)
    pub sync_interval_ms: u32,
    /// Idle observers are dropped after this long without traffic (milliseconds)
    pub client_idle_timeout_ms: u32,

    // --- Schedules ---
    /// How often the schedule table is checked (milliseconds)
    pub schedule_check_interval_ms: u32,
    /// Minimum gap before the same schedule may fire again (minutes)
    pub trigger_debounce_min: u16,
    pub schedule_min_duration_min: u16,
    pub schedule_max_duration_min: u16,
    pub max_schedules: usize,

    // --- Wall clock ---
    /// POSIX TZ string applied before local-time conversion
    pub timezone: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: 5000,
            client_idle_timeout_ms: 120_000,

            schedule_check_interval_ms: 10_000,
            trigger_debounce_min: 2,
            schedule_min_duration_min: 1,
            schedule_max_duration_min: 180,
            max_schedules: 50,

            // Pacific/Auckland
            timezone: String::from("NZST-12NZDT,M9.5.0,M4.1.0/3"),
        }
    }
}

impl SystemConfig {
    /// Reject tuning combinations that would double-fire or suppress schedules.
    pub fn validate(&self) -> Result<(), Error> {
        let debounce_ms = u64::from(self.trigger_debounce_min) * 60_000;
        if u64::from(self.schedule_check_interval_ms) >= debounce_ms {
            return Err(Error::Config("schedule check interval must be shorter than debounce"));
        }
        if self.trigger_debounce_min >= MINUTES_PER_WEEK {
            return Err(Error::Config("debounce must be shorter than one week"));
        }
        if self.schedule_min_duration_min == 0
            || self.schedule_min_duration_min > self.schedule_max_duration_min
        {
            return Err(Error::Config("schedule duration bounds are inverted"));
        }
        if self.sync_interval_ms == 0 {
            return Err(Error::Config("sync interval must be non-zero"));
        }
        Ok(())
    }
}
