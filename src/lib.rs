//! Court timer firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod pins;
pub mod rpc;
pub mod scheduler;
pub mod siren;
pub mod timer;

// The ESP-IDF halves of these are cfg-gated inside; the host halves are
// simulation backends.
pub mod adapters;
pub mod drivers;
