//! Monotonic millisecond tick arithmetic.
//!
//! The firmware clock is a free-running `u32` millisecond counter that
//! wraps roughly every 49.7 days.  Every duration in the core is computed
//! through [`elapsed`], so a single wrap between two samples is harmless.
//! Callers must sample at least once per wrap period.

/// Millisecond timestamp from the monotonic clock source.
pub type Tick = u32;

/// Largest representable tick before the counter wraps back to zero.
pub const MAX_TICK: Tick = Tick::MAX;

/// Milliseconds elapsed from `start` to `now`, tolerating one wrap.
///
/// Equivalent to `now - start` when `now >= start`, otherwise
/// `(MAX_TICK - start) + now + 1`.  Two's-complement subtraction gives
/// exactly that result.
#[inline]
pub fn elapsed(start: Tick, now: Tick) -> u32 {
    now.wrapping_sub(start)
}

/// Time left of `duration` after `start`, clamped at zero.
#[inline]
pub fn remaining(duration: u32, start: Tick, now: Tick) -> u32 {
    duration.saturating_sub(elapsed(start, now))
}

/// Start timestamp such that `consumed` milliseconds have already elapsed at `now`.
#[inline]
pub fn rebase(now: Tick, consumed: u32) -> Tick {
    now.wrapping_sub(consumed)
}
