//! Non-blocking siren pulse sequencer.
//!
//! A two-phase oscillator (relay on for `blast_length`, off for
//! `blast_pause`) driven purely by timestamp comparison.  Each
//! [`SirenSequencer::update`] call performs at most one relay edge and
//! returns immediately.

use log::{debug, info};

use crate::app::ports::RelayPort;
use crate::clock::{self, Tick};

#[derive(Debug, Clone)]
pub struct SirenSequencer {
    active: bool,
    blasts_remaining: u8,
    relay_on: bool,
    last_action: Tick,
    blast_length_ms: u32,
    blast_pause_ms: u32,
}

impl SirenSequencer {
    pub fn new(blast_length_ms: u32, blast_pause_ms: u32) -> Self {
        Self {
            active: false,
            blasts_remaining: 0,
            relay_on: false,
            last_action: 0,
            blast_length_ms,
            blast_pause_ms,
        }
    }

    /// Queue `blasts` pulses.  Ignored while a sequence is running or for zero blasts.
    pub fn start(&mut self, blasts: u8, now: Tick) -> bool {
        if self.active || blasts == 0 {
            debug!("siren: start({blasts}) ignored");
            return false;
        }
        self.active = true;
        self.blasts_remaining = blasts;
        self.relay_on = false;
        // Backdate so the first pulse begins on the next update.
        self.last_action = now.wrapping_sub(self.blast_pause_ms);
        info!("siren: {blasts} blast(s)");
        true
    }

    pub fn update(&mut self, now: Tick, relay: &mut impl RelayPort) {
        if !self.active {
            return;
        }
        let since = clock::elapsed(self.last_action, now);

        if self.relay_on {
            if since >= self.blast_length_ms {
                relay.set_relay(false);
                self.relay_on = false;
                self.last_action = now;
                self.blasts_remaining = self.blasts_remaining.saturating_sub(1);
                if self.blasts_remaining == 0 {
                    self.active = false;
                    debug!("siren: sequence complete");
                }
            }
        } else if self.blasts_remaining > 0 {
            if since >= self.blast_pause_ms {
                relay.set_relay(true);
                self.relay_on = true;
                self.last_action = now;
            }
        } else {
            self.active = false;
        }
    }

    /// Silence immediately and drop any pending blasts.
    pub fn stop(&mut self, relay: &mut impl RelayPort) {
        relay.set_relay(false);
        if self.active {
            info!("siren: stopped with {} blast(s) pending", self.blasts_remaining);
        }
        self.active = false;
        self.relay_on = false;
        self.blasts_remaining = 0;
    }

    /// Change pulse timing.  Takes effect from the next edge.
    pub fn set_timing(&mut self, blast_length_ms: u32, blast_pause_ms: u32) {
        self.blast_length_ms = blast_length_ms;
        self.blast_pause_ms = blast_pause_ms;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_relay_on(&self) -> bool {
        self.relay_on
    }

    pub fn blasts_remaining(&self) -> u8 {
        self.blasts_remaining
    }
}
