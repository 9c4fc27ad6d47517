//! [`FrameClock`] – turns wall-clock frame instants into simulation `dt`.

use std::time::Instant;

/// Largest `dt` handed to the engine by default, seconds. A stall longer than
/// this (debugger, suspended laptop) advances the simulation by this much
/// only.
pub const DEFAULT_MAX_DT: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    max_dt: f64,
}

impl FrameClock {
    /// `max_dt` values that are not positive and finite fall back to
    /// [`DEFAULT_MAX_DT`].
    pub fn new(max_dt: f64) -> Self {
        let max_dt = if max_dt.is_finite() && max_dt > 0.0 {
            max_dt
        } else {
            DEFAULT_MAX_DT
        };
        Self { last: None, max_dt }
    }

    pub fn max_dt(&self) -> f64 {
        self.max_dt
    }

    /// Seconds since the previous frame, capped at `max_dt`. The first frame
    /// after construction or [`reset`][Self::reset] yields `0`.
    pub fn dt_at(&mut self, now: Instant) -> f64 {
        let dt = match self.last {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f64(),
            None => 0.0,
        };
        self.last = Some(now);
        dt.min(self.max_dt)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DT)
    }
}
