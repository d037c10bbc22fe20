//! JSON wire protocol for observers.
//!
//! Inbound frames are `{"action": "...", ...}` objects decoded into
//! [`InboundCommand`]; outbound frames are `{"event": "...", ...}`
//! objects built from [`Outbound`].  Field names are camelCase on the
//! wire.  `save_settings` carries the game duration in minutes and the
//! break duration in seconds; everything else is milliseconds.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::commands::{AppCommand, ScheduleDraft};
use crate::clock::Tick;
use crate::config::TimerSettings;
use crate::error::CommandError;
use crate::scheduler::Schedule;
use crate::timer::{TimerSnapshot, TimerState};

/// Largest inbound frame accepted from a client.
pub const MAX_FRAME_LEN: usize = 1024;

// ═══════════════════════════════════════════════════════════════
//  Inbound
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InboundCommand {
    Start,
    Pause,
    Resume,
    Reset,
    SaveSettings { settings: WireSettings },
    AddSchedule { schedule: WireSchedule },
    UpdateSchedule { schedule: WireSchedule },
    DeleteSchedule { id: String },
    EnableScheduling { enabled: bool },
    GetSchedules,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSettings {
    /// Minutes.
    pub game_duration: u32,
    /// Seconds.
    pub break_duration: u32,
    pub num_rounds: u8,
    pub break_timer_enabled: bool,
    /// Milliseconds.
    pub siren_length: u32,
    /// Milliseconds.
    pub siren_pause: u32,
}

impl WireSettings {
    /// Convert to milliseconds.  Out-of-range values saturate and are
    /// caught by [`TimerSettings::validate`].
    pub fn into_settings(self) -> TimerSettings {
        TimerSettings {
            game_duration_ms: self.game_duration.saturating_mul(60_000),
            break_duration_ms: self.break_duration.saturating_mul(1000),
            num_rounds: self.num_rounds,
            break_enabled: self.break_timer_enabled,
            siren_length_ms: self.siren_length,
            siren_pause_ms: self.siren_pause,
        }
    }
}

/// Schedule fields as sent by clients.  Numbers are wide so a bad value
/// becomes a range error naming the field instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSchedule {
    #[serde(default)]
    pub id: Option<String>,
    pub club_name: String,
    pub day_of_week: i64,
    pub start_hour: i64,
    pub start_minute: i64,
    pub duration_minutes: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl WireSchedule {
    pub fn try_into_draft(self) -> Result<ScheduleDraft, CommandError> {
        Ok(ScheduleDraft {
            id: self.id,
            club_name: self.club_name,
            day_of_week: u8::try_from(self.day_of_week)
                .map_err(|_| CommandError::Validation("dayOfWeek must be 0-6"))?,
            start_hour: u8::try_from(self.start_hour)
                .map_err(|_| CommandError::Validation("startHour must be 0-23"))?,
            start_minute: u8::try_from(self.start_minute)
                .map_err(|_| CommandError::Validation("startMinute must be 0-59"))?,
            duration_minutes: u16::try_from(self.duration_minutes)
                .map_err(|_| CommandError::Validation("durationMinutes out of range"))?,
            enabled: self.enabled,
        })
    }
}

/// What the engine should do with a decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Mutating command for the app service.
    Command(AppCommand),
    /// Read the caller's visible schedules.
    ListSchedules,
}

/// Decode one text frame.
pub fn decode_request(frame: &str) -> Result<Request, CommandError> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(CommandError::Malformed);
    }
    let inbound: InboundCommand = serde_json::from_str(frame).map_err(|_| CommandError::Malformed)?;
    Ok(match inbound {
        InboundCommand::Start => Request::Command(AppCommand::Start),
        InboundCommand::Pause => Request::Command(AppCommand::Pause),
        InboundCommand::Resume => Request::Command(AppCommand::Resume),
        InboundCommand::Reset => Request::Command(AppCommand::Reset),
        InboundCommand::SaveSettings { settings } => {
            Request::Command(AppCommand::SaveSettings(settings.into_settings()))
        }
        InboundCommand::AddSchedule { schedule } => {
            Request::Command(AppCommand::AddSchedule(schedule.try_into_draft()?))
        }
        InboundCommand::UpdateSchedule { schedule } => {
            Request::Command(AppCommand::UpdateSchedule(schedule.try_into_draft()?))
        }
        InboundCommand::DeleteSchedule { id } => Request::Command(AppCommand::DeleteSchedule(id)),
        InboundCommand::EnableScheduling { enabled } => {
            Request::Command(AppCommand::EnableScheduling(enabled))
        }
        InboundCommand::GetSchedules => Request::ListSchedules,
    })
}

// ═══════════════════════════════════════════════════════════════
//  Outbound
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub status: TimerState,
    pub main_timer: u32,
    pub break_timer: u32,
    pub current_round: u8,
    pub num_rounds: u8,
}

impl From<&TimerSnapshot> for StateView {
    fn from(s: &TimerSnapshot) -> Self {
        Self {
            status: s.status,
            main_timer: s.main_remaining_ms,
            break_timer: s.break_remaining_ms,
            current_round: s.current_round,
            num_rounds: s.num_rounds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncView {
    pub main_timer_remaining: u32,
    pub break_timer_remaining: u32,
    /// Monotonic tick at emission, for observer skew correction.
    pub server_timestamp: Tick,
    pub current_round: u8,
    pub num_rounds: u8,
    pub status: TimerState,
}

impl SyncView {
    pub fn new(s: &TimerSnapshot, now: Tick) -> Self {
        Self {
            main_timer_remaining: s.main_remaining_ms,
            break_timer_remaining: s.break_remaining_ms,
            server_timestamp: now,
            current_round: s.current_round,
            num_rounds: s.num_rounds,
            status: s.status,
        }
    }
}

/// Settings in milliseconds, as observers display them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub game_duration: u32,
    pub break_duration: u32,
    pub num_rounds: u8,
    pub break_timer_enabled: bool,
    pub siren_length: u32,
    pub siren_pause: u32,
}

impl From<&TimerSettings> for SettingsView {
    fn from(s: &TimerSettings) -> Self {
        Self {
            game_duration: s.game_duration_ms,
            break_duration: s.break_duration_ms,
            num_rounds: s.num_rounds,
            break_timer_enabled: s.break_enabled,
            siren_length: s.siren_length_ms,
            siren_pause: s.siren_pause_ms,
        }
    }
}

/// Wire view of a schedule.  `createdAt` stays on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView<'a> {
    pub id: &'a str,
    pub club_name: &'a str,
    pub owner_username: &'a str,
    pub day_of_week: u8,
    pub start_hour: u8,
    pub start_minute: u8,
    pub duration_minutes: u16,
    pub enabled: bool,
}

impl<'a> From<&'a Schedule> for ScheduleView<'a> {
    fn from(s: &'a Schedule) -> Self {
        Self {
            id: &s.id,
            club_name: &s.club_name,
            owner_username: &s.owner_username,
            day_of_week: s.day_of_week,
            start_hour: s.start_hour,
            start_minute: s.start_minute,
            duration_minutes: s.duration_minutes,
            enabled: s.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Outbound<'a> {
    State { state: StateView },
    Sync(SyncView),
    Settings { settings: SettingsView },
    SchedulingStatus { enabled: bool },
    SchedulesList { scheduling_enabled: bool, schedules: Vec<ScheduleView<'a>> },
    ScheduleAdded { schedule: ScheduleView<'a> },
    ScheduleUpdated { schedule: ScheduleView<'a> },
    ScheduleDeleted { id: &'a str },
    SettingsSaved,
    Start,
    Pause,
    Resume,
    Reset,
    NewRound { current_round: u8 },
    Finished,
    Error { code: &'static str, message: String },
}

impl Outbound<'_> {
    pub fn error(e: CommandError) -> Self {
        Outbound::Error { code: e.code(), message: e.to_string() }
    }
}

/// Serialize an outbound frame.  `None` only if serialization fails.
pub fn encode(msg: &Outbound<'_>) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("protocol: encode failed: {}", e);
            None
        }
    }
}
