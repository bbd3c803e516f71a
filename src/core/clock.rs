//! Time source for scheduling and playback progress

use crate::utils::dates::utc_now_secs;

/// Wall-clock source in fractional Unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// System UTC clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        utc_now_secs()
    }
}

#[cfg(test)]
pub use manual::ManualClock;
