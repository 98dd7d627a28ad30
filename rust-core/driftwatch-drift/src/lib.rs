// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! driftwatch drift & quality metrics
//!
//! Compares a scored window against a fixed reference snapshot. Produces the
//! prediction drift score, the number of drifted columns, the share of
//! missing predictions and regression quality against ground truth.
//! Evaluation is a pure function of its inputs.

mod calculator;
mod quality;

use driftwatch_frame::{Column, ColumnKind, Frame, FrameError, ReferenceSnapshot, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

pub use calculator::{
    chi_square, chi_square_sf, jensen_shannon, ks_p_value, ks_statistic, wasserstein_distance,
    wasserstein_normed, ColumnStats,
};
pub use quality::RegressionQuality;

/// Drift evaluation errors
#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Current window is empty: drift and regression metrics are undefined")]
    EmptyWindow,

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column {column} has no observed values")]
    NoObservations { column: String },

    #[error("Test {test} cannot be applied to {kind} column {column}")]
    IncompatibleTest {
        column: String,
        test: StatTest,
        kind: ColumnKind,
    },

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Per-column two-sample tests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatTest {
    /// Two-sample Kolmogorov–Smirnov; drift decided on the p-value
    KolmogorovSmirnov,
    /// Wasserstein-1 distance normed by the reference standard deviation
    Wasserstein,
    /// Chi-square goodness of fit; drift decided on the p-value
    ChiSquare,
    /// Jensen–Shannon distance over category frequencies
    JensenShannon,
}

impl StatTest {
    pub fn applies_to(self, kind: ColumnKind) -> bool {
        match self {
            StatTest::KolmogorovSmirnov | StatTest::Wasserstein => kind == ColumnKind::Numeric,
            StatTest::ChiSquare | StatTest::JensenShannon => kind == ColumnKind::Categorical,
        }
    }
}

impl std::fmt::Display for StatTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatTest::KolmogorovSmirnov => write!(f, "ks"),
            StatTest::Wasserstein => write!(f, "wasserstein"),
            StatTest::ChiSquare => write!(f, "chisquare"),
            StatTest::JensenShannon => write!(f, "jensenshannon"),
        }
    }
}

/// Threshold configuration for drift detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriftThresholds {
    /// KS drift when the p-value falls below this
    pub ks_p_value: f64,
    /// Wasserstein drift when the normed distance reaches this
    pub wasserstein: f64,
    /// Chi-square drift when the p-value falls below this
    pub chi_square_p_value: f64,
    /// Jensen–Shannon drift when the distance reaches this
    pub jensen_shannon: f64,
    /// Reference samples larger than this switch to distance-based tests
    pub large_sample_cutoff: usize,
    /// Force a test for specific columns
    pub column_tests: HashMap<String, StatTest>,
}

impl Default for DriftThresholds {
    fn default() -> Self {
        Self {
            ks_p_value: 0.05,
            wasserstein: 0.1,
            chi_square_p_value: 0.05,
            jensen_shannon: 0.1,
            large_sample_cutoff: 1000,
            column_tests: HashMap::new(),
        }
    }
}

impl DriftThresholds {
    /// Test used for a column with `reference_size` observed reference values
    pub fn select(&self, column: &str, kind: ColumnKind, reference_size: usize) -> StatTest {
        if let Some(test) = self.column_tests.get(column) {
            return *test;
        }
        let large = reference_size > self.large_sample_cutoff;
        match (kind, large) {
            (ColumnKind::Numeric, false) => StatTest::KolmogorovSmirnov,
            (ColumnKind::Numeric, true) => StatTest::Wasserstein,
            (ColumnKind::Categorical, false) => StatTest::ChiSquare,
            (ColumnKind::Categorical, true) => StatTest::JensenShannon,
        }
    }
}

/// Outcome of one per-column test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDrift {
    pub column: String,
    pub test: StatTest,
    /// 0 when the samples are identical, larger means more divergence
    pub statistic: f64,
    pub p_value: Option<f64>,
    pub threshold: f64,
    pub drifted: bool,
}

/// Per-column results across a schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetDrift {
    pub columns: Vec<ColumnDrift>,
    /// Number of drifted columns
    pub count: usize,
    /// `count` over the number of tested columns
    pub share: f64,
}

impl DatasetDrift {
    pub fn from_columns(columns: Vec<ColumnDrift>) -> Self {
        let count = columns.iter().filter(|c| c.drifted).count();
        let share = if columns.is_empty() {
            0.0
        } else {
            count as f64 / columns.len() as f64
        };
        Self {
            columns,
            count,
            share,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDrift> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Observed (non-missing) values of one column
#[derive(Debug, Clone)]
pub enum Sample<'a> {
    Numeric(Vec<f64>),
    Categorical(Vec<&'a str>),
}

impl<'a> Sample<'a> {
    /// Observed values of `column`, dropping missing cells
    pub fn from_column(column: &'a Column) -> Self {
        match column {
            Column::Numeric(v) => {
                Sample::Numeric(v.iter().flatten().copied().filter(|x| !x.is_nan()).collect())
            }
            Column::Categorical(v) => {
                Sample::Categorical(v.iter().flatten().map(String::as_str).collect())
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Sample::Numeric(v) => v.len(),
            Sample::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Sample::Numeric(_) => ColumnKind::Numeric,
            Sample::Categorical(_) => ColumnKind::Categorical,
        }
    }
}

/// A two-sample drift test over single columns and whole schemas.
///
/// Conforming tests report a statistic that is 0 for identical samples,
/// grows with divergence and is deterministic.
pub trait DriftTest: Send + Sync {
    /// Test one column
    fn column_drift(
        &self,
        column: &str,
        reference: &Sample<'_>,
        current: &Sample<'_>,
    ) -> Result<ColumnDrift, DriftError>;

    /// Test every drift column of `schema`
    fn dataset_drift(
        &self,
        reference: &Frame,
        current: &Frame,
        schema: &Schema,
    ) -> Result<DatasetDrift, DriftError> {
        let mut columns = Vec::new();
        for (name, kind) in schema.drift_columns() {
            let reference_sample = sample(reference, name, kind)?;
            let current_sample = sample(current, name, kind)?;
            columns.push(self.column_drift(name, &reference_sample, &current_sample)?);
        }
        Ok(DatasetDrift::from_columns(columns))
    }
}

fn sample<'a>(frame: &'a Frame, name: &str, kind: ColumnKind) -> Result<Sample<'a>, DriftError> {
    let column = frame
        .column(name)
        .ok_or_else(|| DriftError::MissingColumn(name.to_string()))?;
    if column.kind() != kind {
        return Err(FrameError::WrongKind {
            column: name.to_string(),
            expected: kind,
        }
        .into());
    }
    Ok(Sample::from_column(column))
}

/// KS / Wasserstein for numeric columns, chi-square / Jensen–Shannon for
/// categorical ones, switching on reference sample size
#[derive(Debug, Clone, Default)]
pub struct DefaultDriftTest {
    pub thresholds: DriftThresholds,
}

impl DefaultDriftTest {
    pub fn new(thresholds: DriftThresholds) -> Self {
        Self { thresholds }
    }
}

impl DriftTest for DefaultDriftTest {
    fn column_drift(
        &self,
        column: &str,
        reference: &Sample<'_>,
        current: &Sample<'_>,
    ) -> Result<ColumnDrift, DriftError> {
        for s in [reference, current] {
            if s.is_empty() {
                return Err(DriftError::NoObservations {
                    column: column.to_string(),
                });
            }
        }

        let kind = reference.kind();
        let test = self.thresholds.select(column, kind, reference.len());
        let t = &self.thresholds;

        let (statistic, p_value, threshold, drifted) = match (test, reference, current) {
            (StatTest::KolmogorovSmirnov, Sample::Numeric(r), Sample::Numeric(c)) => {
                let d = ks_statistic(r, c);
                let p = ks_p_value(d, r.len(), c.len());
                (d, Some(p), t.ks_p_value, p < t.ks_p_value)
            }
            (StatTest::Wasserstein, Sample::Numeric(r), Sample::Numeric(c)) => {
                let w = wasserstein_normed(r, c);
                (w, None, t.wasserstein, w >= t.wasserstein)
            }
            (StatTest::ChiSquare, Sample::Categorical(r), Sample::Categorical(c)) => {
                let (stat, p) = chi_square(r, c);
                (stat, Some(p), t.chi_square_p_value, p < t.chi_square_p_value)
            }
            (StatTest::JensenShannon, Sample::Categorical(r), Sample::Categorical(c)) => {
                let js = jensen_shannon(r, c);
                (js, None, t.jensen_shannon, js >= t.jensen_shannon)
            }
            _ => {
                return Err(DriftError::IncompatibleTest {
                    column: column.to_string(),
                    test,
                    kind: current.kind(),
                })
            }
        };

        Ok(ColumnDrift {
            column: column.to_string(),
            test,
            statistic,
            p_value,
            threshold,
            drifted,
        })
    }
}

/// Metrics for one window, before a timestamp is attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketMetrics {
    pub rows: usize,
    pub prediction_drift_score: f64,
    pub drifted_column_count: usize,
    pub drifted_column_share: f64,
    pub missing_prediction_share: f64,
    pub mean_absolute_error: f64,
    pub root_mean_squared_error: f64,
    pub r2_score: f64,
    /// Per-column test results behind the counts
    pub columns: Vec<ColumnDrift>,
}

/// Drift & quality metrics engine
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine<T: DriftTest = DefaultDriftTest> {
    drift_test: T,
}

impl MetricsEngine<DefaultDriftTest> {
    /// Engine using the default test selection
    pub fn new(thresholds: DriftThresholds) -> Self {
        Self::with_test(DefaultDriftTest::new(thresholds))
    }
}

impl<T: DriftTest> MetricsEngine<T> {
    pub fn with_test(drift_test: T) -> Self {
        Self { drift_test }
    }

    pub fn drift_test(&self) -> &T {
        &self.drift_test
    }

    /// Evaluate a scored window against the reference.
    ///
    /// An empty window is an error, never a row of zeros.
    pub fn evaluate(
        &self,
        reference: &ReferenceSnapshot,
        current: &Frame,
    ) -> Result<BucketMetrics, DriftError> {
        if current.is_empty() {
            return Err(DriftError::EmptyWindow);
        }
        let schema = reference.schema();
        for name in schema
            .features()
            .chain([schema.prediction.as_str(), schema.target.as_str()])
        {
            if !current.has_column(name) {
                return Err(DriftError::MissingColumn(name.to_string()));
            }
        }

        let dataset = self
            .drift_test
            .dataset_drift(reference.frame(), current, schema)?;
        for column in dataset.columns.iter().filter(|c| c.drifted) {
            debug!(
                column = %column.column,
                test = %column.test,
                statistic = column.statistic,
                threshold = column.threshold,
                "column drifted"
            );
        }
        let prediction_drift_score = dataset
            .column(&schema.prediction)
            .map(|c| c.statistic)
            .ok_or_else(|| DriftError::MissingColumn(schema.prediction.clone()))?;

        let predictions = current.numeric(&schema.prediction)?;
        let missing = current
            .column(&schema.prediction)
            .map(Column::missing_count)
            .unwrap_or(0);
        let missing_prediction_share = missing as f64 / current.len() as f64;

        let truth = current.numeric(&schema.target)?;
        let quality = RegressionQuality::compute(truth, predictions).ok_or_else(|| {
            DriftError::NoObservations {
                column: schema.target.clone(),
            }
        })?;

        Ok(BucketMetrics {
            rows: current.len(),
            prediction_drift_score,
            drifted_column_count: dataset.count,
            drifted_column_share: dataset.share,
            missing_prediction_share,
            mean_absolute_error: quality.mean_absolute_error,
            root_mean_squared_error: quality.root_mean_squared_error,
            r2_score: quality.r2_score,
            columns: dataset.columns,
        })
    }
}
