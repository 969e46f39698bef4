use std::time::{Duration, Instant};

use crate::shared::constants::frame_interval;

/// Throttles a loop to a target frame rate by sleeping the shortfall.
///
/// Slow iterations are never compensated for; the next frame simply starts
/// late.
#[derive(Clone, Copy, Debug)]
pub struct FramePacer {
    interval: Duration,
}

impl FramePacer {
    pub fn new(fps: f64) -> Self {
        Self {
            interval: frame_interval(fps),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left in the current slot after `elapsed` has already passed.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.interval
            .checked_sub(elapsed)
            .filter(|left| !left.is_zero())
    }

    /// Sleeps until one interval has passed since `started`.
    pub fn pace(&self, started: Instant) {
        if let Some(left) = self.remaining(started.elapsed()) {
            std::thread::sleep(left);
        }
    }
}
