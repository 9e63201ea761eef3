use std::time::Instant;

use crate::types::PlaybackState;

/// Drift-free playback position estimate between discrete bus updates.
///
/// Players only report their position on change events, never
/// continuously. The tracker keeps the last reported value together with
/// the instant it was captured; reads extrapolate from that baseline with
/// elapsed wall-clock time and the playback rate while the player is
/// playing, and return the raw value verbatim otherwise.
///
/// The baseline moves only on explicit [`reset`](Self::reset) calls: the
/// initial property fetch, the position re-fetch that follows every
/// reconciled change payload, and seek notifications. Reads never mutate
/// it.
#[derive(Debug, Clone)]
pub(crate) struct PositionTracker {
    raw_micros: i64,
    updated_at: Instant,
}

impl PositionTracker {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            raw_micros: 0,
            updated_at: now,
        }
    }

    /// Re-baseline to a freshly reported position.
    pub(crate) fn reset(&mut self, raw_micros: i64, now: Instant) {
        self.raw_micros = raw_micros;
        self.updated_at = now;
    }

    /// Position estimate at `now`, in microseconds.
    pub(crate) fn position_at(&self, now: Instant, state: PlaybackState, rate: f64) -> i64 {
        if state != PlaybackState::Playing {
            return self.raw_micros;
        }

        let elapsed = now.saturating_duration_since(self.updated_at);
        let played_micros = elapsed.as_micros() as f64 * rate;
        self.raw_micros + played_micros as i64
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn advancing_extrapolates_with_rate() {
        let t0 = Instant::now();
        let mut tracker = PositionTracker::new(t0);
        tracker.reset(1_230_000, t0);

        let t1 = t0 + Duration::from_millis(2_000);
        assert_eq!(tracker.position_at(t1, PlaybackState::Playing, 1.0), 3_230_000);
        assert_eq!(tracker.position_at(t1, PlaybackState::Playing, 2.0), 5_230_000);
    }

    #[test]
    fn stationary_returns_raw_value() {
        let t0 = Instant::now();
        let mut tracker = PositionTracker::new(t0);
        tracker.reset(5_000_000, t0);

        let t1 = t0 + Duration::from_secs(60);
        assert_eq!(tracker.position_at(t1, PlaybackState::Paused, 1.0), 5_000_000);
        assert_eq!(tracker.position_at(t1, PlaybackState::Stopped, 1.0), 5_000_000);
    }

    #[test]
    fn reset_moves_the_baseline() {
        let t0 = Instant::now();
        let mut tracker = PositionTracker::new(t0);
        tracker.reset(1_000_000, t0);

        let t1 = t0 + Duration::from_secs(10);
        tracker.reset(9_000_000, t1);

        assert_eq!(tracker.position_at(t1, PlaybackState::Playing, 1.0), 9_000_000);
        let t2 = t1 + Duration::from_secs(1);
        assert_eq!(tracker.position_at(t2, PlaybackState::Playing, 1.0), 10_000_000);
    }

    #[test]
    fn reads_before_the_baseline_do_not_rewind() {
        let t1 = Instant::now() + Duration::from_secs(5);
        let mut tracker = PositionTracker::new(t1);
        tracker.reset(2_000_000, t1);

        // a read racing the reset clamps elapsed time at zero
        assert_eq!(
            tracker.position_at(Instant::now(), PlaybackState::Playing, 1.0),
            2_000_000
        );
    }
}
