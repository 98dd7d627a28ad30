// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The metrics record and the table shape it is written to.

use chrono::{DateTime, Utc};
use driftwatch_drift::BucketMetrics;
use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// Expected table columns and their SQL types, in table order.
///
/// Types are spelled as `information_schema.columns.data_type` reports them.
pub const COLUMNS: [(&str, &str); 7] = [
    ("timestamp", "timestamp without time zone"),
    ("prediction_drift", "double precision"),
    ("num_drifted_cols", "integer"),
    ("share_missing_values", "double precision"),
    ("mean_absolute_error", "double precision"),
    ("root_mean_squared_error", "double precision"),
    ("r2_score", "double precision"),
];

/// One row per processed bucket. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsRecord {
    /// Bucket start
    pub timestamp: DateTime<Utc>,
    pub prediction_drift: f64,
    pub num_drifted_cols: usize,
    pub share_missing_values: f64,
    pub mean_absolute_error: f64,
    pub root_mean_squared_error: f64,
    pub r2_score: f64,
}

impl MetricsRecord {
    /// Stamp bucket metrics with the bucket start
    pub fn from_metrics(timestamp: DateTime<Utc>, metrics: &BucketMetrics) -> Self {
        Self {
            timestamp,
            prediction_drift: metrics.prediction_drift_score,
            num_drifted_cols: metrics.drifted_column_count,
            share_missing_values: metrics.missing_prediction_share,
            mean_absolute_error: metrics.mean_absolute_error,
            root_mean_squared_error: metrics.root_mean_squared_error,
            r2_score: metrics.r2_score,
        }
    }

    /// Single-line JSON rendering
    pub fn to_json_line(&self) -> Result<String, SinkError> {
        serde_json::to_string(self).map_err(|e| SinkError::InvalidRecord(e.to_string()))
    }
}

/// Accept only plain SQL identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
///
/// Table names are interpolated into DDL, so nothing else is allowed.
pub fn validate_table_name(name: &str) -> Result<(), SinkError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SinkError::InvalidRecord(format!(
            "invalid table name: {:?}",
            name
        )))
    }
}
