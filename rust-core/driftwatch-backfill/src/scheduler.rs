// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Backfill scheduler.
//!
//! Walks the bucket plan in order: slice, score, evaluate, persist, pace.
//! The first failure aborts the run, so the persisted records always form a
//! gap-free prefix of the plan.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use driftwatch_drift::{DefaultDriftTest, DriftTest, MetricsEngine};
use driftwatch_frame::TimeRange;
use driftwatch_sink::{MetricsRecord, MetricsSink};
use prometheus::Registry;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ConfigError;
use crate::context::MonitoringContext;
use crate::error::BackfillError;
use crate::pacer::Pacer;
use crate::plan::BucketPlan;
use crate::telemetry::SchedulerMetrics;

/// Totals for a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub buckets: usize,
    pub rows: usize,
    pub elapsed: Duration,
    /// Start of the first and last persisted bucket
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

/// Drives one backfill run against a sink
pub struct Scheduler<S: MetricsSink, T: DriftTest = DefaultDriftTest> {
    context: Arc<MonitoringContext>,
    engine: MetricsEngine<T>,
    sink: S,
    plan: BucketPlan,
    interval: Duration,
    metrics: Option<SchedulerMetrics>,
}

impl<S: MetricsSink, T: DriftTest> Scheduler<S, T> {
    pub fn new(
        context: Arc<MonitoringContext>,
        engine: MetricsEngine<T>,
        sink: S,
        plan: BucketPlan,
        interval: Duration,
    ) -> Self {
        Self {
            context,
            engine,
            sink,
            plan,
            interval,
            metrics: None,
        }
    }

    /// Export per-bucket gauges and run counters to `registry`
    pub fn with_metrics(mut self, registry: &Registry) -> Result<Self, ConfigError> {
        self.metrics = Some(SchedulerMetrics::register(registry)?);
        Ok(self)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn plan(&self) -> &BucketPlan {
        &self.plan
    }

    pub fn metrics(&self) -> Option<&SchedulerMetrics> {
        self.metrics.as_ref()
    }

    /// Process every bucket in order
    pub async fn run(&self) -> Result<RunSummary, BackfillError> {
        let started = Instant::now();
        let mut pacer = Pacer::starting_at(self.interval, started);
        let mut summary = RunSummary {
            buckets: 0,
            rows: 0,
            elapsed: Duration::ZERO,
            first: None,
            last: None,
        };

        info!(
            buckets = self.plan.len(),
            interval_ms = self.interval.as_millis() as u64,
            sink = self.sink.name(),
            "starting backfill"
        );

        let total = self.plan.len();
        for (index, range) in self.plan.iter().enumerate() {
            let rows = self.process(range).await?;

            summary.buckets += 1;
            summary.rows += rows;
            summary.first.get_or_insert(range.start);
            summary.last = Some(range.start);

            if index + 1 < total {
                pacer.pace().await;
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            buckets = summary.buckets,
            rows = summary.rows,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "backfill complete"
        );
        Ok(summary)
    }

    /// Score, evaluate and persist one bucket. Returns its row count.
    async fn process(&self, range: &TimeRange) -> Result<usize, BackfillError> {
        let bucket = range.start;
        let context = &self.context;

        let mut window = context
            .data()
            .slice_time(range)
            .map_err(|e| BackfillError::Computation {
                bucket,
                source: e.into(),
            })?;
        if context.fill_missing_with_zero() {
            let filled = window.fill_missing_with_zero();
            if filled > 0 {
                debug!(%bucket, filled, "replaced missing cells with zero");
            }
        }

        let scored = context
            .predictor()
            .predict(&window)
            .map_err(|e| BackfillError::from_model(bucket, e))?;
        let metrics = self
            .engine
            .evaluate(context.reference(), &scored)
            .map_err(|e| BackfillError::from_drift(bucket, e))?;
        if metrics.missing_prediction_share > 0.0 {
            warn!(
                %bucket,
                share = metrics.missing_prediction_share,
                "model produced missing predictions"
            );
        }

        let record = MetricsRecord::from_metrics(bucket, &metrics);
        self.sink
            .append(&record)
            .await
            .map_err(|e| BackfillError::from_sink(Some(bucket), e))?;

        if let Some(exported) = &self.metrics {
            exported.observe(&record, metrics.rows);
        }
        info!(
            "Data sent for: {} | Number of rows sent: {}",
            bucket, metrics.rows
        );
        Ok(metrics.rows)
    }
}
