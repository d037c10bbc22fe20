//! ESP32 time adapter.
//!
//! Implements [`ClockPort`]: the monotonic millisecond tick plus the local
//! week minute used by the schedule trigger.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer and `localtime_r` for wall-clock fields
//!   (the POSIX TZ rule is installed once at boot with [`apply_timezone`]).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` and
//!   `chrono::Local` for host-side testing and simulation.

use crate::app::ports::ClockPort;
use crate::clock::Tick;
use crate::scheduler::WeekMinute;

/// Wall-clock readings before 2020-01-01 mean SNTP has not synced yet.
pub const EPOCH_2020: i64 = 1_577_836_800;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer_get_time has no preconditions after boot.
        (unsafe { esp_idf_sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    #[cfg(target_os = "espidf")]
    fn wall_secs(&self) -> Option<i64> {
        let mut tv = esp_idf_sys::timeval { tv_sec: 0, tv_usec: 0 };
        // SAFETY: tv is a valid out-pointer; a null timezone is allowed.
        if unsafe { esp_idf_sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        let secs = tv.tv_sec as i64;
        (secs >= EPOCH_2020).then_some(secs)
    }

    #[cfg(not(target_os = "espidf"))]
    fn wall_secs(&self) -> Option<i64> {
        let secs = chrono::Utc::now().timestamp();
        (secs >= EPOCH_2020).then_some(secs)
    }
}

impl ClockPort for Esp32TimeAdapter {
    fn now_ms(&self) -> Tick {
        // Truncation is the wrap at 2^32 ms.
        (self.uptime_us() / 1000) as Tick
    }

    #[cfg(target_os = "espidf")]
    fn week_minute(&self) -> Option<WeekMinute> {
        let secs = self.wall_secs()? as esp_idf_sys::time_t;
        // SAFETY: all-zero is a valid `tm`.
        let mut tm: esp_idf_sys::tm = unsafe { core::mem::zeroed() };
        // SAFETY: both pointers reference live stack values.
        if unsafe { esp_idf_sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        let day = u8::try_from(tm.tm_wday).ok()?;
        let hour = u8::try_from(tm.tm_hour).ok()?;
        let minute = u8::try_from(tm.tm_min).ok()?;
        WeekMinute::from_parts(day, hour, minute)
    }

    #[cfg(not(target_os = "espidf"))]
    fn week_minute(&self) -> Option<WeekMinute> {
        self.wall_secs()?;
        Some(WeekMinute::from_datetime(&chrono::Local::now()))
    }

    fn unix_secs(&self) -> Option<u64> {
        self.wall_secs().and_then(|s| u64::try_from(s).ok())
    }
}

/// Install the POSIX TZ rule used by `localtime_r`.
#[cfg(target_os = "espidf")]
pub fn apply_timezone(tz: &str) {
    // SAFETY: called once from `main` before any other task reads the
    // environment.
    unsafe {
        std::env::set_var("TZ", tz);
        esp_idf_sys::tzset();
    }
    log::info!("Time: timezone set to {}", tz);
}
