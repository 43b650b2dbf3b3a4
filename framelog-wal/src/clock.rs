//! Record timestamps.

use chrono::Utc;

/// Microsecond timestamp source that never goes backwards.
///
/// Wall-clock steps backwards (NTP adjustments, manual changes) are absorbed
/// by repeating the last issued value.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    last: u64,
}

impl Clock {
    /// Creates a clock whose first timestamp is at least `floor`.
    pub fn starting_at(floor: u64) -> Self {
        Self { last: floor }
    }

    /// Returns the next timestamp in microseconds since the Unix epoch.
    pub fn now(&mut self) -> u64 {
        let wall = u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0);
        self.last = self.last.max(wall);
        self.last
    }

    /// Returns the last timestamp issued (or the seed).
    pub fn last(&self) -> u64 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_current() {
        let mut clock = Clock::default();
        let before = Utc::now().timestamp_micros() as u64;
        let ts = clock.now();
        let after = Utc::now().timestamp_micros() as u64;
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_clock_never_decreases() {
        let mut clock = Clock::default();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let ts = clock.now();
            assert!(ts >= prev);
            prev = ts;
        }
    }

    #[test]
    fn test_clock_respects_floor() {
        let future = u64::MAX - 1;
        let mut clock = Clock::starting_at(future);
        assert_eq!(clock.now(), future);
        assert_eq!(clock.last(), future);
    }
}
