// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retrying wrapper for metrics sinks.
//
// Wraps any `MetricsSink` and retries transient failures with exponential
// backoff. Non-transient failures pass straight through. Operation counts
// are collected alongside, the way the storage metrics wrapper does it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::SinkError;
use crate::record::MetricsRecord;
use crate::sink::MetricsSink;

/// Backoff schedule for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `base × 2^attempt`,
    /// capped at `max_backoff`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Accumulated statistics for a retrying sink.
///
/// All counters are monotonically increasing for the lifetime of the
/// [`RetryingSink`] that owns them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Records written successfully.
    pub appends: u64,
    /// Retries performed after transient failures.
    pub retries: u64,
    /// Operations that finally failed.
    pub failures: u64,
}

/// A sink wrapper that retries transient failures.
pub struct RetryingSink<S: MetricsSink> {
    inner: S,
    policy: RetryPolicy,
    stats: Arc<RwLock<SinkStats>>,
}

impl<S: MetricsSink> RetryingSink<S> {
    /// Wrap `inner` with the given retry policy.
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            stats: Arc::new(RwLock::new(SinkStats::default())),
        }
    }

    /// Return a snapshot of the current statistics.
    pub async fn stats(&self) -> SinkStats {
        self.stats.read().await.clone()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Return a reference to the inner sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn record_failure(&self) {
        self.stats.write().await.failures += 1;
    }
}

#[async_trait]
impl<S: MetricsSink> MetricsSink for RetryingSink<S> {
    async fn append(&self, record: &MetricsRecord) -> Result<(), SinkError> {
        let mut attempt = 0;
        loop {
            match self.inner.append(record).await {
                Ok(()) => {
                    self.stats.write().await.appends += 1;
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        sink = self.inner.name(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient append failure, retrying"
                    );
                    self.stats.write().await.retries += 1;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    self.record_failure().await;
                    return Err(SinkError::RetriesExhausted {
                        attempts: attempt + 1,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    self.record_failure().await;
                    return Err(e);
                }
            }
        }
    }

    async fn verify_schema(&self) -> Result<(), SinkError> {
        let mut attempt = 0;
        loop {
            match self.inner.verify_schema().await {
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        sink = self.inner.name(),
                        attempt = attempt + 1,
                        error = %e,
                        "transient schema check failure, retrying"
                    );
                    self.stats.write().await.retries += 1;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    return Err(SinkError::RetriesExhausted {
                        attempts: attempt + 1,
                        last: Box::new(e),
                    });
                }
                other => return other,
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySink;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` appends with the error built by `make`
    struct FlakySink {
        failures: u32,
        calls: AtomicU32,
        make: fn() -> SinkError,
        inner: InMemorySink,
    }

    impl FlakySink {
        fn new(failures: u32, make: fn() -> SinkError) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                make,
                inner: InMemorySink::new(),
            }
        }
    }

    #[async_trait]
    impl MetricsSink for FlakySink {
        async fn append(&self, record: &MetricsRecord) -> Result<(), SinkError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err((self.make)());
            }
            self.inner.append(record).await
        }

        async fn verify_schema(&self) -> Result<(), SinkError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn transient() -> SinkError {
        SinkError::Transient("connection reset".to_string())
    }

    fn mismatch() -> SinkError {
        SinkError::SchemaMismatch {
            expected: "timestamp".to_string(),
            found: "id".to_string(),
        }
    }

    fn record() -> MetricsRecord {
        MetricsRecord {
            timestamp: Utc::now(),
            prediction_drift: 0.1,
            num_drifted_cols: 1,
            share_missing_values: 0.0,
            mean_absolute_error: 0.5,
            root_mean_squared_error: 0.7,
            r2_score: 0.8,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(250),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.backoff(0), Duration::from_millis(100));
        assert_eq!(p.backoff(1), Duration::from_millis(200));
        assert_eq!(p.backoff(2), Duration::from_millis(250));
        assert_eq!(p.backoff(40), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let sink = RetryingSink::new(FlakySink::new(2, transient), policy());
        let start = tokio::time::Instant::now();

        sink.append(&record()).await.unwrap();

        assert_eq!(sink.inner().inner.len().await, 1);
        let stats = sink.stats().await;
        assert_eq!(stats.appends, 1);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.failures, 0);
        // 100ms + 200ms of backoff
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(310));
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalates_after_retry_budget() {
        let sink = RetryingSink::new(FlakySink::new(4, transient), policy());

        let err = sink.append(&record()).await.unwrap_err();

        assert!(matches!(err, SinkError::RetriesExhausted { attempts: 4, .. }));
        assert!(sink.inner().inner.is_empty().await);
        let stats = sink.stats().await;
        assert_eq!(stats.retries, 3);
        assert_eq!(stats.failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schema_mismatch_is_not_retried() {
        let sink = RetryingSink::new(FlakySink::new(1, mismatch), policy());

        let err = sink.append(&record()).await.unwrap_err();

        assert!(matches!(err, SinkError::SchemaMismatch { .. }));
        assert_eq!(sink.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.stats().await.retries, 0);
    }

    #[tokio::test]
    async fn test_passthrough_name_and_schema() {
        let sink = RetryingSink::new(InMemorySink::new(), RetryPolicy::default());
        assert_eq!(sink.name(), "in-memory");
        sink.verify_schema().await.unwrap();
    }
}
