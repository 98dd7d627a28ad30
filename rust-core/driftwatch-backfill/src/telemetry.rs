// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Prometheus view of the most recent bucket.

use driftwatch_sink::MetricsRecord;
use prometheus::{Counter, Gauge, Registry};

/// Gauges mirror the last persisted record; counters accumulate over the run
#[derive(Debug, Clone)]
pub struct SchedulerMetrics {
    prediction_drift: Gauge,
    drifted_columns: Gauge,
    missing_share: Gauge,
    mean_absolute_error: Gauge,
    root_mean_squared_error: Gauge,
    r2_score: Gauge,
    buckets: Counter,
    rows: Counter,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge, prometheus::Error> {
    let gauge = Gauge::new(format!("driftwatch_{}", name), help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter, prometheus::Error> {
    let counter = Counter::new(format!("driftwatch_{}", name), help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl SchedulerMetrics {
    /// Register every series in `registry`
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            prediction_drift: gauge(
                registry,
                "prediction_drift",
                "Drift score of the prediction column in the last bucket",
            )?,
            drifted_columns: gauge(
                registry,
                "drifted_columns",
                "Drifted columns in the last bucket",
            )?,
            missing_share: gauge(
                registry,
                "missing_prediction_share",
                "Share of missing predictions in the last bucket",
            )?,
            mean_absolute_error: gauge(
                registry,
                "mean_absolute_error",
                "Mean absolute error of the last bucket",
            )?,
            root_mean_squared_error: gauge(
                registry,
                "root_mean_squared_error",
                "Root mean squared error of the last bucket",
            )?,
            r2_score: gauge(registry, "r2_score", "R² of the last bucket")?,
            buckets: counter(
                registry,
                "buckets_persisted_total",
                "Buckets written to the metrics store",
            )?,
            rows: counter(registry, "rows_scored_total", "Rows scored across all buckets")?,
        })
    }

    /// Record one persisted bucket
    pub fn observe(&self, record: &MetricsRecord, rows: usize) {
        self.prediction_drift.set(record.prediction_drift);
        self.drifted_columns.set(record.num_drifted_cols as f64);
        self.missing_share.set(record.share_missing_values);
        self.mean_absolute_error.set(record.mean_absolute_error);
        self.root_mean_squared_error
            .set(record.root_mean_squared_error);
        self.r2_score.set(record.r2_score);
        self.buckets.inc();
        self.rows.inc_by(rows as f64);
    }

    pub fn buckets(&self) -> f64 {
        self.buckets.get()
    }

    pub fn rows(&self) -> f64 {
        self.rows.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record() -> MetricsRecord {
        MetricsRecord {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            prediction_drift: 0.25,
            num_drifted_cols: 3,
            share_missing_values: 0.0,
            mean_absolute_error: 1.5,
            root_mean_squared_error: 2.0,
            r2_score: 0.9,
        }
    }

    #[test]
    fn test_observe() {
        let registry = Registry::new();
        let metrics = SchedulerMetrics::register(&registry).unwrap();

        metrics.observe(&record(), 24);
        metrics.observe(&record(), 23);

        assert_eq!(metrics.buckets(), 2.0);
        assert_eq!(metrics.rows(), 47.0);

        assert_eq!(metrics.drifted_columns.get(), 3.0);
        assert_eq!(registry.gather().len(), 8);
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        SchedulerMetrics::register(&registry).unwrap();
        assert!(SchedulerMetrics::register(&registry).is_err());
    }
}
