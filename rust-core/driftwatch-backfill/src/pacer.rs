// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Emission pacing.
//!
//! Fixed-phase cadence on a monotonic clock. Emissions are allowed at
//! `run_start + k × interval`. A fast bucket waits for the next boundary; a
//! slow bucket skips the boundaries it overran instead of bursting to catch
//! up, so the run neither drifts late nor speeds up.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// What one pacing step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaceOutcome {
    /// Time spent blocked
    pub waited: Duration,
    /// Interval boundaries skipped because the bucket overran
    pub skipped: u32,
}

/// Cadence state: the next permissible emission time
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    deadline: Instant,
}

impl Pacer {
    /// Start the cadence now
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    /// Start the cadence at `start`
    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            deadline: start + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Earliest time the next emission may happen
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Block until the next emission is allowed, then move the deadline on
    pub async fn pace(&mut self) -> PaceOutcome {
        if !self.is_enabled() {
            return PaceOutcome {
                waited: Duration::ZERO,
                skipped: 0,
            };
        }

        let now = Instant::now();
        let waited = self.deadline.saturating_duration_since(now);
        if now < self.deadline {
            tokio::time::sleep_until(self.deadline).await;
        }
        let skipped = self.advance(now);
        if skipped > 0 {
            debug!(skipped, "bucket overran the emission interval");
        }
        PaceOutcome { waited, skipped }
    }

    /// Move the deadline to the first boundary strictly after
    /// `max(now, deadline)`. Returns the number of boundaries skipped.
    fn advance(&mut self, now: Instant) -> u32 {
        let reference = now.max(self.deadline);
        let mut skipped = 0;
        self.deadline += self.interval;
        while self.deadline <= reference {
            self.deadline += self.interval;
            skipped += 1;
        }
        skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    /// Paused-clock timers fire on millisecond ticks
    fn assert_near(actual: Duration, expected: Duration) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff <= Duration::from_millis(2),
            "{:?} is not within 2ms of {:?}",
            actual,
            expected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_bucket_waits_for_boundary() {
        let start = Instant::now();
        let mut pacer = Pacer::starting_at(SECOND, start);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let outcome = pacer.pace().await;

        assert_near(outcome.waited, Duration::from_millis(900));
        assert_eq!(outcome.skipped, 0);
        assert_near(start.elapsed(), SECOND);
        assert_eq!(pacer.deadline(), start + 2 * SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_bucket_snaps_to_next_boundary() {
        let start = Instant::now();
        let mut pacer = Pacer::starting_at(SECOND, start);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let outcome = pacer.pace().await;

        // no wait, no burst: the next emission is at 3s, not 2s
        assert_eq!(outcome.waited, Duration::ZERO);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(pacer.deadline(), start + 3 * SECOND);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let outcome = pacer.pace().await;
        assert_near(outcome.waited, Duration::from_millis(400));
        assert_near(start.elapsed(), 3 * SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_ending_on_boundary() {
        let start = Instant::now();
        let mut pacer = Pacer::starting_at(SECOND, start);

        tokio::time::sleep(SECOND).await;
        let outcome = pacer.pace().await;
        assert_near(outcome.waited, Duration::ZERO);
        assert_eq!(pacer.deadline(), start + 2 * SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_drift_over_many_buckets() {
        let start = Instant::now();
        let mut pacer = Pacer::starting_at(SECOND, start);

        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(300)).await;
            pacer.pace().await;
        }
        assert_near(start.elapsed(), 10 * SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_waits() {
        let start = Instant::now();
        let mut pacer = Pacer::starting_at(Duration::ZERO, start);
        assert!(!pacer.is_enabled());

        for _ in 0..5 {
            let outcome = pacer.pace().await;
            assert_eq!(outcome.waited, Duration::ZERO);
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
