//! Simulated beamline device with constant-speed kinematics.
//!
//! A device does not run on a timer.  It records where a move started, where
//! it is going, how fast it travels, and *when* the move began; the current
//! position is recomputed from those four values every time somebody asks.
//! That makes a query at any instant physically consistent (the value never
//! jumps faster than the configured speed) without any background thread.

use std::time::Instant;

/// One named axis or sensor: a value moving toward a target at constant
/// speed.
///
/// All time arithmetic uses [`Instant`]s passed in by the caller, so tests
/// drive the kinematics with synthetic clocks instead of sleeping.
#[derive(Debug, Clone, Copy)]
pub struct Device {
    /// Value at the moment the current move began.
    start: f64,
    /// Value the device is moving toward.
    target: f64,
    /// Travel speed in value units per second.  Positive and finite; the
    /// registry validates specs before constructing devices.
    speed: f64,
    /// When the current move began.
    move_started: Instant,
}

impl Device {
    /// Creates a device resting at `initial` (target equals start, so it is
    /// immediately in position).
    pub fn new(initial: f64, speed: f64, now: Instant) -> Self {
        Self {
            start: initial,
            target: initial,
            speed,
            move_started: now,
        }
    }

    /// Returns the value the device is currently moving toward.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Returns the travel speed in value units per second.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Returns the total duration of the current move in seconds
    /// (`|target - start| / speed`), counted from `move_started`.
    pub fn settle_time_secs(&self) -> f64 {
        (self.target - self.start).abs() / self.speed
    }

    /// Computes the interpolated position at `now`.
    ///
    /// The value advances from `start` toward `target` at `speed` and stays
    /// exactly at `target` once the settle time has elapsed, so
    /// [`Device::in_position`] can use plain float equality.  A `now`
    /// earlier than the move start saturates to zero elapsed time.  Pure:
    /// no side effects.
    pub fn value_at(&self, now: Instant) -> f64 {
        let dv = self.target - self.start;
        if dv == 0.0 {
            return self.start;
        }
        let elapsed = now.saturating_duration_since(self.move_started).as_secs_f64();
        let travel = dv.abs() / self.speed;
        if elapsed >= travel {
            return self.target;
        }
        let raw = self.start + dv.signum() * elapsed * self.speed;
        // Rounding in `elapsed * speed` must not let the value poke past
        // the target before the settle branch above takes over.
        raw.clamp(self.start.min(self.target), self.start.max(self.target))
    }

    /// Starts a move toward `target`.
    ///
    /// The current interpolated value becomes the new start, so retargeting
    /// a device mid-motion never makes the reported position jump.
    pub fn move_to(&mut self, target: f64, now: Instant) {
        self.start = self.value_at(now);
        self.target = target;
        self.move_started = now;
    }

    /// Returns `true` once the interpolated value has reached the target.
    pub fn in_position(&self, now: Instant) -> bool {
        self.value_at(now) == self.target
    }
}
