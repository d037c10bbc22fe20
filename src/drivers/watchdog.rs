//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API to reset the device if the control loop
//! stalls for longer than [`WATCHDOG_TIMEOUT_MS`].
//!
//! The control loop must call `feed()` on every iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

pub const WATCHDOG_TIMEOUT_MS: u32 = 30_000;

pub struct Watchdog {
    subscribed: bool,
    feeds: u64,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Initialise and subscribe the current task to the TWDT.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        // SAFETY: plain FFI calls on the current task; cfg outlives the call.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: WATCHDOG_TIMEOUT_MS,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                warn!("TWDT reconfigure returned {} (may already be configured)", ret);
            }

            let ret = esp_task_wdt_add(core::ptr::null_mut());
            let subscribed = ret == ESP_OK;
            if subscribed {
                info!("Watchdog: subscribed ({} ms timeout, panic on trigger)", WATCHDOG_TIMEOUT_MS);
            } else {
                warn!("Watchdog: failed to subscribe ({})", ret);
            }

            Self { subscribed, feeds: 0 }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("Watchdog(sim): {} ms timeout, no-op", WATCHDOG_TIMEOUT_MS);
        Self { subscribed: true, feeds: 0 }
    }

    /// Feed the watchdog.
    pub fn feed(&mut self) {
        if !self.subscribed {
            return;
        }
        #[cfg(target_os = "espidf")]
        // SAFETY: the current task is subscribed.
        unsafe {
            esp_task_wdt_reset();
        }
        self.feeds = self.feeds.wrapping_add(1);
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn feed_count(&self) -> u64 {
        self.feeds
    }
}
