//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the match-control rules: it owns the match timer,
//! the siren sequencer and the schedule table, applies validated commands
//! serially, and decides when the siren sounds.  All interaction with
//! hardware, storage and observers happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod persistence;
pub mod ports;
pub mod service;
