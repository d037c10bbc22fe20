//! Weekly schedule table and auto-start trigger engine.
//!
//! Schedules recur every week at a fixed minute.  The control loop polls
//! [`ScheduleEngine::check_trigger`] every few seconds; a per-schedule
//! trigger record (id → last fired [`WeekMinute`]) keeps a slot from
//! firing on every poll inside the same minute.
//!
//! ```text
//!   wall clock ──► WeekMinute ──► check_trigger ──► Some(schedule)
//!                                      │                  │
//!                                      │ debounce         ▼
//!                                      ◄──────── mark_triggered(id, now)
//! ```
//!
//! Debounce distance is computed circularly over the 10 080-minute week,
//! so Saturday 23:59 → Sunday 00:00 is one minute apart, not 10 079.

use std::collections::HashMap;

use chrono::{Datelike, Timelike};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::clock::Tick;
use crate::config::SystemConfig;
use crate::error::CommandError;

pub const MINUTES_PER_DAY: u16 = 24 * 60;
pub const MINUTES_PER_WEEK: u16 = 7 * MINUTES_PER_DAY;

// ═══════════════════════════════════════════════════════════════
//  WeekMinute
// ═══════════════════════════════════════════════════════════════

/// Minutes since Sunday 00:00, in `[0, 10080)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekMinute(u16);

impl WeekMinute {
    pub fn new(raw: u16) -> Option<Self> {
        (raw < MINUTES_PER_WEEK).then_some(Self(raw))
    }

    /// `day` 0 = Sunday.
    pub fn from_parts(day: u8, hour: u8, minute: u8) -> Option<Self> {
        if day > 6 || hour > 23 || minute > 59 {
            return None;
        }
        Some(Self(
            u16::from(day) * MINUTES_PER_DAY + u16::from(hour) * 60 + u16::from(minute),
        ))
    }

    /// Local calendar time → week minute.
    pub fn from_datetime<T: Datelike + Timelike>(t: &T) -> Self {
        let day = t.weekday().num_days_from_sunday() as u16;
        Self(day * MINUTES_PER_DAY + t.hour() as u16 * 60 + t.minute() as u16)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Circular distance from `earlier` forward to `self`.
    pub fn minutes_since(self, earlier: WeekMinute) -> u16 {
        (self.0 + MINUTES_PER_WEEK - earlier.0) % MINUTES_PER_WEEK
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schedule records
// ═══════════════════════════════════════════════════════════════

/// A recurring weekly match slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub club_name: String,
    /// Immutable after creation.
    pub owner_username: String,
    /// 0 = Sunday.
    pub day_of_week: u8,
    pub start_hour: u8,
    pub start_minute: u8,
    pub duration_minutes: u16,
    pub enabled: bool,
    /// Unix seconds when known, otherwise the boot tick.  Immutable after creation.
    pub created_at: u64,
}

impl Schedule {
    pub fn week_minute(&self) -> Option<WeekMinute> {
        WeekMinute::from_parts(self.day_of_week, self.start_hour, self.start_minute)
    }
}

/// Persisted form of the table: master switch plus all records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStore {
    pub scheduling_enabled: bool,
    pub schedules: Vec<Schedule>,
}

/// Table limits taken from [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleLimits {
    pub min_duration_min: u16,
    pub max_duration_min: u16,
    pub max_schedules: usize,
    pub debounce_min: u16,
}

impl From<&SystemConfig> for ScheduleLimits {
    fn from(c: &SystemConfig) -> Self {
        Self {
            min_duration_min: c.schedule_min_duration_min,
            max_duration_min: c.schedule_max_duration_min,
            max_schedules: c.max_schedules,
            debounce_min: c.trigger_debounce_min,
        }
    }
}

impl Default for ScheduleLimits {
    fn default() -> Self {
        Self::from(&SystemConfig::default())
    }
}

/// Field-range check shared by add, update and the persistence loader.
pub fn validate_schedule(s: &Schedule, limits: &ScheduleLimits) -> Result<(), CommandError> {
    if s.id.is_empty() {
        return Err(CommandError::Validation("id must not be empty"));
    }
    if s.day_of_week > 6 {
        return Err(CommandError::Validation("dayOfWeek must be 0-6"));
    }
    if s.start_hour > 23 {
        return Err(CommandError::Validation("startHour must be 0-23"));
    }
    if s.start_minute > 59 {
        return Err(CommandError::Validation("startMinute must be 0-59"));
    }
    if !(limits.min_duration_min..=limits.max_duration_min).contains(&s.duration_minutes) {
        return Err(CommandError::Validation("durationMinutes out of range"));
    }
    Ok(())
}

/// Admins may mutate any schedule, everyone else only their own.
pub fn has_permission(schedule: &Schedule, username: &str, is_admin: bool) -> bool {
    is_admin || schedule.owner_username == username
}

// ═══════════════════════════════════════════════════════════════
//  Engine
// ═══════════════════════════════════════════════════════════════

pub struct ScheduleEngine {
    schedules: Vec<Schedule>,
    last_triggered: HashMap<String, WeekMinute>,
    scheduling_enabled: bool,
    id_counter: u32,
    limits: ScheduleLimits,
}

impl ScheduleEngine {
    pub fn new(limits: ScheduleLimits) -> Self {
        Self {
            schedules: Vec::new(),
            last_triggered: HashMap::new(),
            scheduling_enabled: false,
            id_counter: 0,
            limits,
        }
    }

    /// Rebuild from a persisted store.  Invalid or excess records are dropped.
    pub fn from_store(store: ScheduleStore, limits: ScheduleLimits) -> Self {
        let mut engine = Self::new(limits);
        engine.scheduling_enabled = store.scheduling_enabled;
        for s in store.schedules {
            if let Err(e) = engine.insert(s) {
                warn!("schedules: dropped stored record ({e})");
            }
        }
        engine
    }

    pub fn to_store(&self) -> ScheduleStore {
        ScheduleStore {
            scheduling_enabled: self.scheduling_enabled,
            schedules: self.schedules.clone(),
        }
    }

    // ── Trigger evaluation ─────────────────────────────────────

    /// First enabled schedule whose slot matches `now` and is outside its debounce window.
    ///
    /// Trigger records older than the debounce window are pruned first.  A
    /// record left in place for a full week would otherwise sit at circular
    /// distance zero from its own slot and suppress the next occurrence.
    pub fn check_trigger(&mut self, now: WeekMinute) -> Option<&Schedule> {
        let debounce = self.limits.debounce_min;
        self.last_triggered.retain(|_, last| now.minutes_since(*last) < debounce);

        if !self.scheduling_enabled {
            return None;
        }
        let last_triggered = &self.last_triggered;
        self.schedules.iter().filter(|s| s.enabled).find(|s| {
            if s.week_minute() != Some(now) {
                return false;
            }
            if last_triggered.contains_key(&s.id) {
                debug!("schedules: {} debounced", s.id);
                return false;
            }
            true
        })
    }

    pub fn mark_triggered(&mut self, id: &str, at: WeekMinute) {
        self.last_triggered.insert(id.to_owned(), at);
    }

    /// Forget every trigger record.
    pub fn clear_trigger_records(&mut self) {
        self.last_triggered.clear();
    }

    pub fn last_triggered(&self, id: &str) -> Option<WeekMinute> {
        self.last_triggered.get(id).copied()
    }

    // ── Table mutation ─────────────────────────────────────────

    pub fn add(&mut self, schedule: Schedule) -> Result<&Schedule, CommandError> {
        let id = schedule.id.clone();
        self.insert(schedule)?;
        info!("schedules: added {id}");
        Ok(&self.schedules[self.schedules.len() - 1])
    }

    /// Replace the editable fields of an existing schedule.
    ///
    /// `owner_username` and `created_at` are kept from the stored record.
    /// If the slot moves, its trigger record is dropped so the new slot
    /// is not suppressed by a firing of the old one.
    pub fn update(&mut self, mut schedule: Schedule) -> Result<&Schedule, CommandError> {
        validate_schedule(&schedule, &self.limits)?;
        let idx = self
            .schedules
            .iter()
            .position(|s| s.id == schedule.id)
            .ok_or(CommandError::UnknownSchedule)?;

        let existing = &self.schedules[idx];
        schedule.owner_username.clone_from(&existing.owner_username);
        schedule.created_at = existing.created_at;
        if schedule.week_minute() != existing.week_minute() {
            self.last_triggered.remove(&schedule.id);
        }
        info!("schedules: updated {}", schedule.id);
        self.schedules[idx] = schedule;
        Ok(&self.schedules[idx])
    }

    pub fn delete(&mut self, id: &str) -> Result<Schedule, CommandError> {
        let idx = self
            .schedules
            .iter()
            .position(|s| s.id == id)
            .ok_or(CommandError::UnknownSchedule)?;
        self.last_triggered.remove(id);
        info!("schedules: deleted {id}");
        Ok(self.schedules.remove(idx))
    }

    pub fn set_scheduling_enabled(&mut self, enabled: bool) {
        if self.scheduling_enabled != enabled {
            info!("schedules: auto-start {}", if enabled { "enabled" } else { "disabled" });
        }
        self.scheduling_enabled = enabled;
    }

    /// Fresh id of the form `"<tick>-<counter>"`, unique within the table.
    pub fn generate_id(&mut self, now: Tick) -> String {
        loop {
            self.id_counter = self.id_counter.wrapping_add(1);
            let id = format!("{now}-{}", self.id_counter);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.id == id)
    }

    pub fn list(&self) -> &[Schedule] {
        &self.schedules
    }

    pub fn list_by_club<'a>(&'a self, club: &'a str) -> impl Iterator<Item = &'a Schedule> + 'a {
        self.schedules.iter().filter(move |s| s.club_name == club)
    }

    /// Schedules visible to a caller: admins see all, others see their own.
    pub fn list_for<'a>(
        &'a self,
        username: &'a str,
        is_admin: bool,
    ) -> impl Iterator<Item = &'a Schedule> + 'a {
        self.schedules.iter().filter(move |s| has_permission(s, username, is_admin))
    }

    pub fn scheduling_enabled(&self) -> bool {
        self.scheduling_enabled
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    fn insert(&mut self, schedule: Schedule) -> Result<(), CommandError> {
        validate_schedule(&schedule, &self.limits)?;
        if self.schedules.len() >= self.limits.max_schedules {
            return Err(CommandError::TableFull);
        }
        if self.get(&schedule.id).is_some() {
            return Err(CommandError::Validation("duplicate schedule id"));
        }
        self.schedules.push(schedule);
        Ok(())
    }
}
