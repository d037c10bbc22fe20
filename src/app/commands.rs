//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (WebSocket
//! observers today) that the [`AppService`](super::service::AppService)
//! validates and applies serially from the control loop.

use crate::clock::Tick;
use crate::config::TimerSettings;
use crate::scheduler::Schedule;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a match from Idle or Finished.
    Start,

    /// Pause a running match.  On a paused match this resumes instead.
    Pause,

    /// Resume a paused match.
    Resume,

    /// Return to Idle and silence the siren.
    Reset,

    /// Replace the match configuration (Idle/Finished only).
    SaveSettings(TimerSettings),

    /// Create a schedule owned by the caller.
    AddSchedule(ScheduleDraft),

    /// Edit an existing schedule; the draft must carry its id.
    UpdateSchedule(ScheduleDraft),

    DeleteSchedule(String),

    /// Flip the auto-start master switch.
    EnableScheduling(bool),
}

impl AppCommand {
    /// Short tag for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Reset => "reset",
            Self::SaveSettings(_) => "save_settings",
            Self::AddSchedule(_) => "add_schedule",
            Self::UpdateSchedule(_) => "update_schedule",
            Self::DeleteSchedule(_) => "delete_schedule",
            Self::EnableScheduling(_) => "enable_scheduling",
        }
    }
}

/// Client-editable schedule fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDraft {
    pub id: Option<String>,
    pub club_name: String,
    pub day_of_week: u8,
    pub start_hour: u8,
    pub start_minute: u8,
    pub duration_minutes: u16,
    pub enabled: bool,
}

impl ScheduleDraft {
    /// Complete the draft with server-assigned fields.
    pub fn into_schedule(self, id: String, owner: &str, created_at: u64) -> Schedule {
        Schedule {
            id,
            club_name: self.club_name,
            owner_username: owner.to_owned(),
            day_of_week: self.day_of_week,
            start_hour: self.start_hour,
            start_minute: self.start_minute,
            duration_minutes: self.duration_minutes,
            enabled: self.enabled,
            created_at,
        }
    }
}

/// Access level resolved by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Read-only observer.
    Viewer,
    /// May run matches and manage their own schedules.
    Operator,
    /// Full control, including other users' schedules.
    Admin,
}

impl Role {
    pub const fn can_control(self) -> bool {
        matches!(self, Self::Operator | Self::Admin)
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Who issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub username: String,
    pub role: Role,
}

impl Caller {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self { username: username.into(), role }
    }

    /// Unauthenticated connection.
    pub fn anonymous() -> Self {
        Self::new("", Role::Viewer)
    }
}

/// Per-command inputs that come from the loop rather than the client.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub now: Tick,
    /// Wall-clock seconds if synced, used for `created_at`.
    pub unix_secs: Option<u64>,
    pub caller: &'a Caller,
}

/// Successful outcome of [`AppCommand`] handling, for the issuing client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// Timer transition applied; observers learn of it through events.
    Done,
    SettingsSaved,
    ScheduleAdded(Schedule),
    ScheduleUpdated(Schedule),
    ScheduleDeleted(String),
    SchedulingChanged(bool),
}
