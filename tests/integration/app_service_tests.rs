//! Integration tests for the AppService → timer → siren → relay pipeline.
//!
//! These run on the host (x86_64) and drive the service the way the
//! control loop does: commands in, ticks at a fixed period, events and
//! relay edges out.

use super::mock_hw::{MockRelay, MockStorage, RecordingSink, run_until};

use courttimer::app::commands::{AppCommand, Caller, CommandContext, CommandReply, Role, ScheduleDraft};
use courttimer::app::events::{AppEvent, Transition};
use courttimer::app::service::AppService;
use courttimer::clock::Tick;
use courttimer::config::{SystemConfig, TimerSettings};
use courttimer::error::CommandError;
use courttimer::scheduler::{ScheduleStore, WeekMinute};
use courttimer::timer::TimerState;

fn short_match() -> TimerSettings {
    TimerSettings {
        game_duration_ms: 60_000,
        break_duration_ms: 10_000,
        num_rounds: 2,
        break_enabled: true,
        siren_length_ms: 100,
        siren_pause_ms: 100,
    }
}

fn make_app(settings: TimerSettings) -> (AppService, MockRelay, RecordingSink) {
    let app = AppService::new(SystemConfig::default(), settings, ScheduleStore::default());
    (app, MockRelay::new(), RecordingSink::new())
}

fn run(
    app: &mut AppService,
    cmd: AppCommand,
    now: Tick,
    caller: &Caller,
    relay: &mut MockRelay,
    sink: &mut RecordingSink,
) -> Result<CommandReply, CommandError> {
    let ctx = CommandContext { now, unix_secs: None, caller };
    app.handle_command(cmd, &ctx, relay, sink)
}

fn transitions(sink: &RecordingSink) -> Vec<Transition> {
    sink.events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Timer { transition, .. } => Some(*transition),
            _ => None,
        })
        .collect()
}

fn draft(day: u8, hour: u8, minute: u8) -> ScheduleDraft {
    ScheduleDraft {
        id: None,
        club_name: "Hawks".into(),
        day_of_week: day,
        start_hour: hour,
        start_minute: minute,
        duration_minutes: 60,
        enabled: true,
    }
}

fn wm(day: u8, hour: u8, minute: u8) -> Option<WeekMinute> {
    WeekMinute::from_parts(day, hour, minute)
}

// ── Full match ───────────────────────────────────────────────

#[test]
fn full_match_sounds_every_fanfare() {
    let (mut app, mut relay, mut sink) = make_app(short_match());
    let op = Caller::new("alice", Role::Operator);

    run(&mut app, AppCommand::Start, 0, &op, &mut relay, &mut sink).unwrap();
    run_until(&mut app, 0, 121_000, 50, &mut relay, &mut sink);

    assert_eq!(app.timer_state(), TimerState::Finished);
    // break end, round end, break end, match end
    assert_eq!(sink.siren_blasts(), vec![1, 2, 1, 3]);
    assert_eq!(relay.pulses(), 7);
    assert!(!relay.on, "relay must be released after the last blast");
    assert_eq!(
        transitions(&sink),
        vec![Transition::Started, Transition::RoundEnded, Transition::MatchFinished]
    );
    let breaks: Vec<u8> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::BreakEnded { round } => Some(*round),
            _ => None,
        })
        .collect();
    assert_eq!(breaks, vec![1, 2]);
}

#[test]
fn finished_snapshot_reports_zero() {
    let (mut app, mut relay, mut sink) = make_app(short_match());
    let op = Caller::new("alice", Role::Operator);
    run(&mut app, AppCommand::Start, 0, &op, &mut relay, &mut sink).unwrap();
    run_until(&mut app, 0, 120_000, 1_000, &mut relay, &mut sink);

    let snap = app.timer_snapshot();
    assert_eq!(snap.status, TimerState::Finished);
    assert_eq!(snap.main_remaining_ms, 0);
    assert_eq!(snap.current_round, 2);
}

#[test]
fn pause_freezes_and_toggle_resumes() {
    let (mut app, mut relay, mut sink) = make_app(short_match());
    let op = Caller::new("alice", Role::Operator);

    run(&mut app, AppCommand::Start, 0, &op, &mut relay, &mut sink).unwrap();
    run_until(&mut app, 0, 20_000, 100, &mut relay, &mut sink);
    run(&mut app, AppCommand::Pause, 20_000, &op, &mut relay, &mut sink).unwrap();
    assert_eq!(app.timer_snapshot().main_remaining_ms, 40_000);

    // A long pause costs nothing.
    run_until(&mut app, 20_000, 500_000, 1_000, &mut relay, &mut sink);
    assert_eq!(app.timer_snapshot().main_remaining_ms, 40_000);

    // Pause on a paused timer resumes.
    run(&mut app, AppCommand::Pause, 500_000, &op, &mut relay, &mut sink).unwrap();
    assert_eq!(app.timer_state(), TimerState::Running);
    run_until(&mut app, 500_000, 510_000, 100, &mut relay, &mut sink);
    assert_eq!(app.timer_snapshot().main_remaining_ms, 30_000);
    assert_eq!(
        transitions(&sink),
        vec![Transition::Started, Transition::Paused, Transition::Resumed]
    );
}

#[test]
fn reset_silences_siren_mid_blast() {
    let (mut app, mut relay, mut sink) = make_app(short_match());
    let op = Caller::new("alice", Role::Operator);

    run(&mut app, AppCommand::Start, 0, &op, &mut relay, &mut sink).unwrap();
    // Break ends at 10 s; the first blast starts on that tick.
    run_until(&mut app, 0, 10_000, 50, &mut relay, &mut sink);
    assert!(relay.on);
    assert!(app.siren_active());

    run(&mut app, AppCommand::Reset, 10_020, &op, &mut relay, &mut sink).unwrap();
    assert!(!relay.on);
    assert!(!app.siren_active());
    assert_eq!(app.timer_state(), TimerState::Idle);
    let snap = app.timer_snapshot();
    assert_eq!(snap.main_remaining_ms, 60_000, "idle shows the full duration");
}

#[test]
fn viewer_cannot_mutate() {
    let (mut app, mut relay, mut sink) = make_app(short_match());
    let viewer = Caller::new("bob", Role::Viewer);
    let err = run(&mut app, AppCommand::Start, 0, &viewer, &mut relay, &mut sink).unwrap_err();
    assert_eq!(err, CommandError::PermissionDenied);
    assert_eq!(app.timer_state(), TimerState::Idle);
    assert!(sink.events.is_empty());
}

#[test]
fn settings_locked_during_match() {
    let (mut app, mut relay, mut sink) = make_app(short_match());
    let op = Caller::new("alice", Role::Operator);
    run(&mut app, AppCommand::Start, 0, &op, &mut relay, &mut sink).unwrap();

    let err = run(
        &mut app,
        AppCommand::SaveSettings(TimerSettings::default()),
        10,
        &op,
        &mut relay,
        &mut sink,
    )
    .unwrap_err();
    assert!(matches!(err, CommandError::InvalidState(_)));
    assert_eq!(*app.settings(), short_match());
}

#[test]
fn invalid_settings_rejected_untouched() {
    let (mut app, mut relay, mut sink) = make_app(short_match());
    let op = Caller::new("alice", Role::Operator);
    let mut bad = short_match();
    bad.break_duration_ms = 45_000; // > 50 % of a one-minute game
    let err = run(&mut app, AppCommand::SaveSettings(bad), 0, &op, &mut relay, &mut sink)
        .unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));
    assert!(!app.is_dirty());
}

// ── Scheduling ───────────────────────────────────────────────

#[test]
fn schedule_auto_starts_once_per_slot() {
    let (mut app, mut relay, mut sink) = make_app(TimerSettings::default());
    let op = Caller::new("alice", Role::Operator);
    run(&mut app, AppCommand::AddSchedule(draft(1, 18, 0)), 0, &op, &mut relay, &mut sink)
        .unwrap();
    run(&mut app, AppCommand::EnableScheduling(true), 0, &op, &mut relay, &mut sink).unwrap();

    app.tick(0, wm(1, 18, 0), &mut relay, &mut sink);
    assert_eq!(app.timer_state(), TimerState::Running);
    assert!(sink.events.iter().any(|e| matches!(e, AppEvent::ScheduleFired { club_name, .. } if club_name == "Hawks")));

    // Reset and keep polling inside the same minute: no second start.
    run(&mut app, AppCommand::Reset, 1_000, &op, &mut relay, &mut sink).unwrap();
    for now in (10_000..60_000).step_by(10_000) {
        app.tick(now, wm(1, 18, 0), &mut relay, &mut sink);
    }
    assert_eq!(app.timer_state(), TimerState::Idle);
}

#[test]
fn schedule_during_match_is_skipped() {
    let (mut app, mut relay, mut sink) = make_app(TimerSettings::default());
    let op = Caller::new("alice", Role::Operator);
    run(&mut app, AppCommand::AddSchedule(draft(2, 9, 0)), 0, &op, &mut relay, &mut sink).unwrap();
    run(&mut app, AppCommand::EnableScheduling(true), 0, &op, &mut relay, &mut sink).unwrap();
    run(&mut app, AppCommand::Start, 0, &op, &mut relay, &mut sink).unwrap();

    app.tick(10_000, wm(2, 9, 0), &mut relay, &mut sink);
    assert!(sink.events.iter().any(|e| matches!(e, AppEvent::ScheduleSkipped { .. })));
    assert_eq!(
        transitions(&sink),
        vec![Transition::Started],
        "a skipped slot must not restart the match"
    );

    // The slot was consumed: finishing the match inside the minute does not fire it.
    run(&mut app, AppCommand::Reset, 15_000, &op, &mut relay, &mut sink).unwrap();
    app.tick(20_000, wm(2, 9, 0), &mut relay, &mut sink);
    assert_eq!(app.timer_state(), TimerState::Idle);
}

#[test]
fn schedule_fires_again_next_week() {
    let (mut app, mut relay, mut sink) = make_app(TimerSettings::default());
    let op = Caller::new("alice", Role::Operator);
    run(&mut app, AppCommand::AddSchedule(draft(3, 7, 30)), 0, &op, &mut relay, &mut sink)
        .unwrap();
    run(&mut app, AppCommand::EnableScheduling(true), 0, &op, &mut relay, &mut sink).unwrap();

    app.tick(0, wm(3, 7, 30), &mut relay, &mut sink);
    assert_eq!(app.timer_state(), TimerState::Running);
    run(&mut app, AppCommand::Reset, 100, &op, &mut relay, &mut sink).unwrap();

    // Polling carries on through the week.
    app.tick(20_000, wm(3, 7, 45), &mut relay, &mut sink);
    app.tick(40_000, wm(5, 12, 0), &mut relay, &mut sink);
    app.tick(60_000, wm(3, 7, 30), &mut relay, &mut sink);
    assert_eq!(app.timer_state(), TimerState::Running);
}

#[test]
fn slot_fires_after_a_week_without_wall_clock() {
    let (mut app, mut relay, mut sink) = make_app(TimerSettings::default());
    let op = Caller::new("alice", Role::Operator);
    run(&mut app, AppCommand::AddSchedule(draft(4, 19, 0)), 0, &op, &mut relay, &mut sink)
        .unwrap();
    run(&mut app, AppCommand::EnableScheduling(true), 0, &op, &mut relay, &mut sink).unwrap();

    app.tick(0, wm(4, 19, 0), &mut relay, &mut sink);
    assert_eq!(app.timer_state(), TimerState::Running);
    run(&mut app, AppCommand::Reset, 100, &op, &mut relay, &mut sink).unwrap();

    // SNTP lost for exactly one week: the loop keeps ticking unsynced.
    const WEEK_MS: Tick = 7 * 24 * 60 * 60 * 1000;
    for now in (60_000..WEEK_MS).step_by(3_600_000) {
        app.tick(now, None, &mut relay, &mut sink);
    }

    app.tick(WEEK_MS, wm(4, 19, 0), &mut relay, &mut sink);
    assert_eq!(app.timer_state(), TimerState::Running);
    assert_eq!(
        sink.events.iter().filter(|e| matches!(e, AppEvent::ScheduleFired { .. })).count(),
        2
    );
}

#[test]
fn master_switch_off_blocks_auto_start() {
    let (mut app, mut relay, mut sink) = make_app(TimerSettings::default());
    let op = Caller::new("alice", Role::Operator);
    run(&mut app, AppCommand::AddSchedule(draft(0, 10, 0)), 0, &op, &mut relay, &mut sink)
        .unwrap();
    assert!(!app.schedules().scheduling_enabled(), "auto-start defaults off");

    app.tick(0, wm(0, 10, 0), &mut relay, &mut sink);
    assert_eq!(app.timer_state(), TimerState::Idle);
}

#[test]
fn schedule_ownership_is_enforced() {
    let (mut app, mut relay, mut sink) = make_app(TimerSettings::default());
    let alice = Caller::new("alice", Role::Operator);
    let bob = Caller::new("bob", Role::Operator);
    let admin = Caller::new("root", Role::Admin);

    let CommandReply::ScheduleAdded(s) =
        run(&mut app, AppCommand::AddSchedule(draft(4, 19, 0)), 0, &alice, &mut relay, &mut sink)
            .unwrap()
    else {
        panic!("expected ScheduleAdded");
    };
    assert_eq!(s.owner_username, "alice");

    let err = run(&mut app, AppCommand::DeleteSchedule(s.id.clone()), 1, &bob, &mut relay, &mut sink)
        .unwrap_err();
    assert_eq!(err, CommandError::PermissionDenied);

    let mut edit = draft(4, 20, 0);
    edit.id = Some(s.id.clone());
    let CommandReply::ScheduleUpdated(u) =
        run(&mut app, AppCommand::UpdateSchedule(edit), 2, &admin, &mut relay, &mut sink).unwrap()
    else {
        panic!("expected ScheduleUpdated");
    };
    assert_eq!(u.owner_username, "alice", "owner survives an admin edit");
    assert_eq!(u.start_hour, 20);

    run(&mut app, AppCommand::DeleteSchedule(s.id.clone()), 3, &alice, &mut relay, &mut sink)
        .unwrap();
    assert!(app.schedules().is_empty());
    let err = run(&mut app, AppCommand::DeleteSchedule(s.id), 4, &alice, &mut relay, &mut sink)
        .unwrap_err();
    assert_eq!(err, CommandError::UnknownSchedule);
}

// ── Persistence ──────────────────────────────────────────────

#[test]
fn settings_and_schedules_survive_reboot() {
    let mut storage = MockStorage::new();
    let (mut app, mut relay, mut sink) = make_app(TimerSettings::default());
    let op = Caller::new("alice", Role::Operator);

    run(&mut app, AppCommand::SaveSettings(short_match()), 0, &op, &mut relay, &mut sink).unwrap();
    run(&mut app, AppCommand::AddSchedule(draft(6, 8, 15)), 0, &op, &mut relay, &mut sink).unwrap();
    run(&mut app, AppCommand::EnableScheduling(true), 0, &op, &mut relay, &mut sink).unwrap();
    assert!(app.is_dirty());
    assert!(app.persist_if_dirty(&mut storage));
    assert!(!app.is_dirty());
    assert!(!app.persist_if_dirty(&mut storage), "clean state writes nothing");

    let rebooted = AppService::boot(SystemConfig::default(), &storage);
    assert_eq!(*rebooted.settings(), short_match());
    assert_eq!(rebooted.schedules().len(), 1);
    assert!(rebooted.schedules().scheduling_enabled());
    assert_eq!(rebooted.timer_snapshot().main_remaining_ms, 60_000);
}

#[test]
fn failed_write_is_retried() {
    let mut storage = MockStorage::new();
    storage.fail_writes = true;
    let (mut app, mut relay, mut sink) = make_app(TimerSettings::default());
    let op = Caller::new("alice", Role::Operator);

    run(&mut app, AppCommand::SaveSettings(short_match()), 0, &op, &mut relay, &mut sink).unwrap();
    assert!(!app.persist_if_dirty(&mut storage));
    assert!(app.is_dirty());

    storage.fail_writes = false;
    assert!(app.persist_if_dirty(&mut storage));
    assert_eq!(storage.writes, 1);
}

#[test]
fn corrupted_storage_boots_with_defaults() {
    let mut storage = MockStorage::new();
    storage.blobs.insert("timer".into(), vec![0xff; 3]);
    storage.blobs.insert("schedules".into(), vec![0xff; 7]);
    let app = AppService::boot(SystemConfig::default(), &storage);
    assert_eq!(*app.settings(), TimerSettings::default());
    assert!(app.schedules().is_empty());
}
