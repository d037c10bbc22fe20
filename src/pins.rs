//! GPIO pin assignments for the court timer board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Siren relay (active HIGH, driven through a transistor stage)
// ---------------------------------------------------------------------------

/// Digital output: HIGH = siren sounding.
pub const RELAY_GPIO: i32 = 26;
