//! Court Timer Firmware: Main Entry Point
//!
//! Hexagonal architecture around a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RelayDriver    LogEventSink   NvsAdapter    Esp32TimeAdapter  │
//! │  (RelayPort)    (EventSink)    (StoragePort) (ClockPort)       │
//! │  WsTransport ─▶ channels ─▶ RpcEngine    SyncBroadcaster       │
//! │                                          (EventSink)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  MatchTimer · SirenSequencer · ScheduleEngine          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::modem::Modem;
use esp_idf_hal::prelude::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use courttimer::adapters::log_sink::LogEventSink;
use courttimer::adapters::nvs::NvsAdapter;
use courttimer::adapters::time::{self, Esp32TimeAdapter};
use courttimer::adapters::ws_transport::WsTransport;
use courttimer::app::commands::{Caller, Role};
use courttimer::app::ports::ClockPort;
use courttimer::app::service::AppService;
use courttimer::config::SystemConfig;
use courttimer::drivers::relay::RelayDriver;
use courttimer::drivers::watchdog::Watchdog;
use courttimer::error::Error;
use courttimer::pins;
use courttimer::rpc::broadcaster::SyncBroadcaster;
use courttimer::rpc::channels::{self, InboundMsg};
use courttimer::rpc::engine::{DispatchTime, RpcEngine};
use courttimer::rpc::transport::{ObserverTransport, QueuedTransport};

/// Control loop period.  Bounds siren edge jitter.
const LOOP_PERIOD_MS: u32 = 10;

/// Identity given to LAN observers until a login collaborator is wired in.
const LAN_OPERATOR: &str = "court";

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CourtTimer v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();
    config.validate()?;
    time::apply_timezone(&config.timezone);
    let mut watchdog = Watchdog::new();

    // ── 3. Persistence + application core ─────────────────────
    let mut nvs = NvsAdapter::new().map_err(|e| {
        warn!("NVS init failed: {}", e);
        Error::Init("nvs")
    })?;
    let clock = Esp32TimeAdapter::new();
    let mut app = AppService::boot(config.clone(), &nvs);

    // ── 4. Hardware ───────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let mut relay = RelayDriver::new(PinDriver::output(peripherals.pins.gpio26)?);
    info!("Relay: GPIO{}", pins::RELAY_GPIO);

    // ── 5. Network: station, wall clock, observer endpoint ────
    let sysloop = EspSystemEventLoop::take()?;
    let _wifi = match connect_wifi(peripherals.modem, sysloop) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("WiFi unavailable ({}); running without observers", e);
            None
        }
    };
    let _sntp = EspSntp::new_default()?;
    let ws = WsTransport::start()?;
    let _writer = ws.spawn_writer()?;

    let mut rpc = RpcEngine::new(&config);
    let mut sink = (SyncBroadcaster::new(QueuedTransport, &config), LogEventSink::new());

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        let now = clock.now_ms();

        // Inbound traffic, applied serially.  Connects and disconnects come first.
        while let Some(msg) = channels::try_next() {
            match msg {
                InboundMsg::Connected(id) => match rpc.on_connect(id, now) {
                    Ok(()) => {
                        rpc.set_identity(id, Caller::new(LAN_OPERATOR, Role::Operator));
                        sink.0.greet(id, &app, now);
                    }
                    Err(e) => {
                        warn!("Observer {} refused: {}", id, e);
                        sink.0.transport_mut().close(id);
                    }
                },
                InboundMsg::Frame { client_id, text } => {
                    let at = DispatchTime { now, unix_secs: clock.unix_secs() };
                    if let Some(reply) =
                        rpc.dispatch(client_id, &text, at, &mut app, &mut relay, &mut sink)
                    {
                        sink.0.transport_mut().send(reply.client_id, &reply.payload);
                    }
                }
                InboundMsg::Activity(id) => rpc.on_activity(id, now),
                InboundMsg::Disconnected(id) => rpc.on_disconnect(id),
            }
        }

        // Core update.
        app.tick(now, clock.week_minute(), &mut relay, &mut sink);
        sink.0.poll(now, &app.timer_snapshot());

        // Housekeeping, outside any update().
        for id in rpc.sweep(now) {
            sink.0.transport_mut().close(id);
        }
        app.persist_if_dirty(&mut nvs);
        watchdog.feed();

        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}

/// Bring the station interface up with build-time credentials.
fn connect_wifi(modem: Modem, sysloop: EspSystemEventLoop) -> Result<BlockingWifi<EspWifi<'static>>> {
    let ssid = option_env!("COURTTIMER_WIFI_SSID").ok_or_else(|| anyhow!("no SSID configured"))?;
    let password = option_env!("COURTTIMER_WIFI_PASS").unwrap_or("");

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), None)?, sysloop)?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("SSID too long"))?,
        password: password.try_into().map_err(|_| anyhow!("password too long"))?,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi: connected to '{}'", ssid);
    Ok(wifi)
}
