//! Siren relay driver.
//!
//! A dumb actuator: the [`SirenSequencer`](crate::siren::SirenSequencer)
//! decides when to switch, this driver only owns the pin.
//!
//! ## Dual-target design
//!
//! Generic over [`embedded_hal::digital::OutputPin`].  On ESP-IDF the pin
//! is an `esp_idf_hal` `PinDriver` on [`RELAY_GPIO`](crate::pins::RELAY_GPIO);
//! on host/test it is a [`SimRelayPin`] that tracks the level in memory.
//!
//! The output is forced LOW at construction and on [`RelayDriver::release`],
//! so a reboot mid-blast never leaves the siren sounding.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::{info, warn};

use crate::app::ports::RelayPort;

pub struct RelayDriver<P: OutputPin> {
    pin: P,
    on: bool,
    switch_count: u32,
}

impl<P: OutputPin> RelayDriver<P> {
    pub fn new(pin: P) -> Self {
        let mut driver = Self { pin, on: true, switch_count: 0 };
        driver.release();
        driver.switch_count = 0;
        info!("Relay: initialised LOW");
        driver
    }

    /// Force the output LOW regardless of the tracked level.
    pub fn release(&mut self) {
        if let Err(e) = self.pin.set_low() {
            warn!("Relay: set_low failed: {:?}", e);
        }
        self.on = false;
    }

    /// Number of edges driven since boot.
    pub fn switch_count(&self) -> u32 {
        self.switch_count
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<P: OutputPin> RelayPort for RelayDriver<P> {
    fn set_relay(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        match result {
            Ok(()) => {
                self.on = on;
                self.switch_count = self.switch_count.wrapping_add(1);
            }
            Err(e) => {
                warn!("Relay: switching {} failed: {:?}", if on { "on" } else { "off" }, e);
                if on {
                    // Leave the tracked level off so the next edge retries.
                    self.on = false;
                } else {
                    self.release();
                }
            }
        }
    }

    fn is_relay_on(&self) -> bool {
        self.on
    }
}

// ── Simulation pin ───────────────────────────────────────────

/// In-memory output pin for host builds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimRelayPin {
    pub high: bool,
}

impl ErrorType for SimRelayPin {
    type Error = Infallible;
}

impl OutputPin for SimRelayPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}
