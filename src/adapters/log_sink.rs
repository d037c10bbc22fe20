//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::info;

use crate::app::events::{AppEvent, Transition};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Timer { transition, snapshot } => {
                let name = match transition {
                    Transition::Started => "start",
                    Transition::Paused => "pause",
                    Transition::Resumed => "resume",
                    Transition::Reset => "reset",
                    Transition::RoundEnded => "new_round",
                    Transition::MatchFinished => "finished",
                };
                info!(
                    "TIMER | {} | status={} | main={}ms break={}ms | round {}/{}",
                    name,
                    snapshot.status.as_str(),
                    snapshot.main_remaining_ms,
                    snapshot.break_remaining_ms,
                    snapshot.current_round,
                    snapshot.num_rounds,
                );
            }
            AppEvent::BreakEnded { round } => {
                info!("TIMER | break_ended | round {}", round);
            }
            AppEvent::SirenStarted { blasts } => {
                info!("SIREN | sequence | blasts={}", blasts);
            }
            AppEvent::ScheduleFired { id, club_name } => {
                info!("SCHED | fired | id={} club={}", id, club_name);
            }
            AppEvent::ScheduleSkipped { id } => {
                info!("SCHED | skipped (match in progress) | id={}", id);
            }
            AppEvent::SettingsChanged(s) => {
                info!(
                    "TIMER | settings | game={}ms break={}ms({}) rounds={} siren={}/{}ms",
                    s.game_duration_ms,
                    s.break_duration_ms,
                    if s.break_enabled { "on" } else { "off" },
                    s.num_rounds,
                    s.siren_length_ms,
                    s.siren_pause_ms,
                );
            }
            AppEvent::SchedulingChanged(enabled) => {
                info!("SCHED | auto-start {}", if *enabled { "enabled" } else { "disabled" });
            }
        }
    }
}
