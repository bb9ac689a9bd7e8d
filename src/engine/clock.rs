//! Engine time source.
//!
//! Ages and timeouts are measured in milliseconds on a monotonic clock that
//! starts at zero when the engine starts. Tracker operations take explicit
//! timestamps, so tests drive time directly and never touch this clock.

use std::time::Instant;

use crate::core::Timestamp;

/// Monotonic millisecond clock.
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the engine started.
    pub fn now(&self) -> Timestamp {
        let ms = self.origin.elapsed().as_millis();
        Timestamp::new(u64::try_from(ms).unwrap_or(u64::MAX))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
