//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, broadcast to
//! WebSocket observers, etc.

use crate::config::TimerSettings;
use crate::timer::TimerSnapshot;

/// Externally observable timer transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Paused,
    Resumed,
    Reset,
    /// A round ended and the next one began.
    RoundEnded,
    MatchFinished,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The timer changed state; carries the snapshot taken right after.
    Timer { transition: Transition, snapshot: TimerSnapshot },

    /// The break countdown of the current round reached zero.
    BreakEnded { round: u8 },

    /// A siren sequence was queued.
    SirenStarted { blasts: u8 },

    /// A schedule slot fired and started a match.
    ScheduleFired { id: String, club_name: String },

    /// A schedule slot fired while a match was already in progress.
    ScheduleSkipped { id: String },

    /// Match configuration changed.
    SettingsChanged(TimerSettings),

    /// Auto-start master switch changed.
    SchedulingChanged(bool),
}
