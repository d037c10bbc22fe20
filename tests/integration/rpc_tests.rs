//! Integration tests for the observer path:
//! frame → RpcEngine → AppService → SyncBroadcaster → transport.

use super::mock_hw::{MockRelay, RecordingSink, RecordingTransport, Sent};

use courttimer::app::commands::{Caller, Role};
use courttimer::app::service::AppService;
use courttimer::clock::Tick;
use courttimer::config::{SystemConfig, TimerSettings};
use courttimer::rpc::broadcaster::SyncBroadcaster;
use courttimer::rpc::clients::ClientId;
use courttimer::rpc::engine::{DispatchTime, Reply, RpcEngine};
use courttimer::scheduler::ScheduleStore;
use serde_json::Value;

struct Rig {
    app: AppService,
    rpc: RpcEngine,
    relay: MockRelay,
    sink: (SyncBroadcaster<RecordingTransport>, RecordingSink),
}

impl Rig {
    fn new() -> Self {
        let config = SystemConfig::default();
        Self {
            app: AppService::new(config.clone(), TimerSettings::default(), ScheduleStore::default()),
            rpc: RpcEngine::new(&config),
            relay: MockRelay::new(),
            sink: (SyncBroadcaster::new(RecordingTransport::new(), &config), RecordingSink::new()),
        }
    }

    fn connect(&mut self, id: ClientId, role: Role, name: &str) {
        self.rpc.on_connect(id, 0).unwrap();
        self.rpc.set_identity(id, Caller::new(name, role));
    }

    fn send(&mut self, id: ClientId, frame: &str, now: Tick) -> Option<Value> {
        let at = DispatchTime { now, unix_secs: Some(1_700_000_000) };
        self.rpc
            .dispatch(id, frame, at, &mut self.app, &mut self.relay, &mut self.sink)
            .map(|Reply { client_id, payload }| {
                assert_eq!(client_id, id, "replies go to the sender");
                serde_json::from_str(&payload).unwrap()
            })
    }

    fn transport(&mut self) -> &mut RecordingTransport {
        self.sink.0.transport_mut()
    }
}

const ADD_HAWKS: &str = r#"{"action":"add_schedule","schedule":{"clubName":"Hawks",
    "dayOfWeek":1,"startHour":18,"startMinute":0,"durationMinutes":60}}"#;

// ── Greeting ─────────────────────────────────────────────────

#[test]
fn greeting_while_idle_sends_state() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Viewer, "");
    rig.sink.0.greet(1, &rig.app, 0);

    let frames = rig.transport().frames_to(1);
    let events: Vec<&str> = frames.iter().map(|v| v["event"].as_str().unwrap()).collect();
    assert_eq!(events, ["settings", "state", "scheduling_status"]);
    assert_eq!(frames[0]["settings"]["gameDuration"], 21 * 60 * 1000);
    assert_eq!(frames[1]["state"]["status"], "IDLE");
    assert_eq!(frames[2]["enabled"], false);
}

#[test]
fn greeting_during_match_sends_sync() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Operator, "alice");
    assert!(rig.send(1, r#"{"action":"start"}"#, 0).is_none());
    rig.app.tick(3_000, None, &mut rig.relay, &mut rig.sink);

    rig.connect(2, Role::Viewer, "");
    rig.sink.0.greet(2, &rig.app, 3_000);
    let frames = rig.transport().frames_to(2);
    assert_eq!(frames[1]["event"], "sync");
    assert_eq!(frames[1]["serverTimestamp"], 3_000);
    assert_eq!(frames[1]["mainTimerRemaining"], 21 * 60 * 1000 - 3_000);
}

// ── Commands ─────────────────────────────────────────────────

#[test]
fn start_broadcasts_event_then_state() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Operator, "alice");
    assert!(rig.send(1, r#"{"action":"start"}"#, 0).is_none());

    assert_eq!(rig.transport().broadcast_events(), ["start", "state"]);
    let Some(Sent::Broadcast(state)) = rig.transport().sent.last().cloned() else {
        panic!("expected a broadcast");
    };
    assert_eq!(state["state"]["status"], "RUNNING");
    assert_eq!(state["state"]["currentRound"], 1);
}

#[test]
fn viewer_gets_permission_error() {
    let mut rig = Rig::new();
    rig.rpc.on_connect(1, 0).unwrap(); // anonymous
    let reply = rig.send(1, r#"{"action":"start"}"#, 0).unwrap();
    assert_eq!(reply["event"], "error");
    assert_eq!(reply["code"], "permission_denied");
    assert!(rig.transport().sent.is_empty(), "rejections broadcast nothing");
    assert_eq!(rig.rpc.rejected_count(), 1);
}

#[test]
fn error_frames_name_the_problem() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Operator, "alice");

    let reply = rig.send(1, "{nope", 0).unwrap();
    assert_eq!(reply["code"], "malformed");

    let reply = rig.send(1, r#"{"action":"delete_schedule","id":"missing"}"#, 0).unwrap();
    assert_eq!(reply["code"], "unknown_schedule");

    let reply = rig.send(1, r#"{"action":"pause"}"#, 0).unwrap();
    assert_eq!(reply["code"], "invalid_state");

    let bad = r#"{"action":"save_settings","settings":{"gameDuration":0,"breakDuration":60,
        "numRounds":3,"breakTimerEnabled":true,"sirenLength":1000,"sirenPause":1000}}"#;
    let reply = rig.send(1, bad, 0).unwrap();
    assert_eq!(reply["code"], "validation");
}

#[test]
fn frames_from_unknown_clients_are_dropped() {
    let mut rig = Rig::new();
    assert!(rig.send(42, r#"{"action":"start"}"#, 0).is_none());
    assert!(!rig.app.timer_state().is_active());
}

#[test]
fn save_settings_replies_and_broadcasts() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Admin, "root");
    let frame = r#"{"action":"save_settings","settings":{"gameDuration":10,"breakDuration":120,
        "numRounds":4,"breakTimerEnabled":false,"sirenLength":500,"sirenPause":250}}"#;
    let reply = rig.send(1, frame, 0).unwrap();
    assert_eq!(reply["event"], "settings_saved");

    assert_eq!(rig.transport().broadcast_events(), ["settings"]);
    assert_eq!(rig.app.settings().game_duration_ms, 600_000);
    assert!(rig.app.is_dirty());
}

// ── Schedules ────────────────────────────────────────────────

#[test]
fn schedule_round_trip_over_the_wire() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Operator, "alice");
    rig.connect(2, Role::Operator, "bob");
    rig.connect(3, Role::Admin, "root");

    let added = rig.send(1, ADD_HAWKS, 5).unwrap();
    assert_eq!(added["event"], "schedule_added");
    assert_eq!(added["schedule"]["ownerUsername"], "alice");
    assert_eq!(added["schedule"]["enabled"], true);
    let id = added["schedule"]["id"].as_str().unwrap().to_owned();

    // Others only see their own; admins see everything.
    let list = rig.send(2, r#"{"action":"get_schedules"}"#, 6).unwrap();
    assert_eq!(list["schedules"].as_array().unwrap().len(), 0);
    let list = rig.send(3, r#"{"action":"get_schedules"}"#, 6).unwrap();
    assert_eq!(list["schedules"].as_array().unwrap().len(), 1);

    let frame = format!(r#"{{"action":"delete_schedule","id":"{id}"}}"#);
    let reply = rig.send(2, &frame, 7).unwrap();
    assert_eq!(reply["code"], "permission_denied");
    let reply = rig.send(1, &frame, 8).unwrap();
    assert_eq!(reply["event"], "schedule_deleted");
    assert_eq!(reply["id"], id.as_str());
}

#[test]
fn enable_scheduling_is_broadcast() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Operator, "alice");
    assert!(rig.send(1, r#"{"action":"enable_scheduling","enabled":true}"#, 0).is_none());
    let Some(Sent::Broadcast(v)) = rig.transport().sent.last().cloned() else {
        panic!("expected a broadcast");
    };
    assert_eq!(v["event"], "scheduling_status");
    assert_eq!(v["enabled"], true);
}

// ── Periodic sync ────────────────────────────────────────────

#[test]
fn sync_runs_only_while_running() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Operator, "alice");
    let snap = rig.app.timer_snapshot();
    assert!(!rig.sink.0.poll(0, &snap), "idle never syncs");

    rig.send(1, r#"{"action":"start"}"#, 0);
    rig.transport().clear();
    for now in (0..=10_000).step_by(500) {
        rig.app.tick(now, None, &mut rig.relay, &mut rig.sink);
        let snap = rig.app.timer_snapshot();
        rig.sink.0.poll(now, &snap);
    }
    // At 0, 5000 and 10000.
    assert_eq!(rig.transport().broadcast_events(), ["sync", "sync", "sync"]);

    rig.send(1, r#"{"action":"pause"}"#, 10_100);
    rig.transport().clear();
    let snap = rig.app.timer_snapshot();
    assert!(!rig.sink.0.poll(20_000, &snap));
    assert!(rig.transport().sent.is_empty());
}

// ── Client table ─────────────────────────────────────────────

#[test]
fn burst_is_rate_limited() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Operator, "alice");
    for _ in 0..10 {
        let reply = rig.send(1, r#"{"action":"get_schedules"}"#, 0).unwrap();
        assert_eq!(reply["event"], "schedules_list");
    }
    let reply = rig.send(1, r#"{"action":"get_schedules"}"#, 0).unwrap();
    assert_eq!(reply["code"], "rate_limited");
}

#[test]
fn idle_clients_expire_and_active_ones_stay() {
    let mut rig = Rig::new();
    rig.connect(1, Role::Viewer, "");
    rig.connect(2, Role::Viewer, "");
    rig.rpc.on_activity(2, 100_000);

    let expired = rig.rpc.sweep(120_001);
    assert_eq!(expired.as_slice(), &[1]);
    assert!(rig.rpc.clients().get(2).is_some());

    rig.rpc.on_disconnect(2);
    assert!(rig.rpc.clients().is_empty());
}
