// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! driftwatch tabular data
//!
//! Declared schema, column-oriented frames, half-open time ranges and the
//! CSV loader that feeds the backfill pipeline. Frames are cheap to slice by
//! time and keep rows in source order.

pub mod csv;
mod window;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

pub use csv::CsvSource;
pub use window::TimeRange;

/// Frame and schema errors
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column {column} is not {expected}")]
    WrongKind { column: String, expected: ColumnKind },

    #[error("Column {column} has {found} rows, frame has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column in schema: {0}")]
    DuplicateColumn(String),

    #[error("Frame has no timestamp column")]
    NoTimestamps,

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: String,
        message: String,
    },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Statistical kind of a column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Declared column layout shared by reference and current data.
///
/// Fixed for the lifetime of a run. The prediction column is always numeric
/// and is not a model feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    /// Numeric feature columns, in model order
    pub numerical: Vec<String>,
    /// Categorical feature columns, in model order
    pub categorical: Vec<String>,
    /// Column holding model output
    pub prediction: String,
    /// Ground-truth column the predictions are scored against
    pub target: String,
    /// Row timestamp column
    pub timestamp: String,
}

impl Default for Schema {
    /// Hourly weather observations predicting `temperature_2m`.
    fn default() -> Self {
        let numerical = [
            "dew_point_2m",
            "pressure_msl",
            "surface_pressure",
            "cloud_cover",
            "cloud_cover_low",
            "cloud_cover_mid",
            "cloud_cover_high",
            "visibility",
            "weather_code",
            "precipitation",
            "rain",
            "snowfall",
            "wind_speed_10m",
            "wind_gusts_10m",
            "wind_direction_10m",
            "vapour_pressure_deficit",
            "et0_fao_evapotranspiration",
        ];

        Self {
            numerical: numerical.iter().map(|c| c.to_string()).collect(),
            categorical: vec!["evapotranspiration".to_string()],
            prediction: "prediction".to_string(),
            target: "temperature_2m".to_string(),
            timestamp: "date".to_string(),
        }
    }
}

impl Schema {
    /// Build and validate a schema
    pub fn new(
        numerical: Vec<String>,
        categorical: Vec<String>,
        prediction: impl Into<String>,
        target: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Result<Self, FrameError> {
        let schema = Self {
            numerical,
            categorical,
            prediction: prediction.into(),
            target: target.into(),
            timestamp: timestamp.into(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Reject duplicate names across all roles
    pub fn validate(&self) -> Result<(), FrameError> {
        let mut seen = HashSet::new();
        let all = self
            .numerical
            .iter()
            .chain(self.categorical.iter())
            .chain([&self.prediction, &self.target, &self.timestamp]);
        for name in all {
            if !seen.insert(name.as_str()) {
                return Err(FrameError::DuplicateColumn(name.clone()));
            }
        }
        Ok(())
    }

    /// Model feature columns: numeric first, then categorical
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.numerical
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
    }

    /// Columns tested for drift, with the kind used for the test.
    ///
    /// Numeric, then categorical, then the prediction column.
    pub fn drift_columns(&self) -> Vec<(&str, ColumnKind)> {
        self.numerical
            .iter()
            .map(|c| (c.as_str(), ColumnKind::Numeric))
            .chain(
                self.categorical
                    .iter()
                    .map(|c| (c.as_str(), ColumnKind::Categorical)),
            )
            .chain(std::iter::once((
                self.prediction.as_str(),
                ColumnKind::Numeric,
            )))
            .collect()
    }

    /// Kind of a named column, if the schema declares it
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        if self.categorical.iter().any(|c| c == name) {
            Some(ColumnKind::Categorical)
        } else if self.numerical.iter().any(|c| c == name)
            || name == self.prediction
            || name == self.target
        {
            Some(ColumnKind::Numeric)
        } else {
            None
        }
    }
}

/// Single spelling for a category label.
///
/// Labels that read as finite numbers are rewritten in shortest form, so
/// `"0"`, `"0.0"` and `"0.00"` are one category. Other labels pass through.
pub fn canonical_category(label: &str) -> String {
    match label.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => {
            // -0.0 and 0.0 are the same category
            let value = if value == 0.0 { 0.0 } else { value };
            format!("{}", value)
        }
        _ => label.to_string(),
    }
}

/// A single column of values; `None` marks a missing cell
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Numeric(_) => ColumnKind::Numeric,
            Column::Categorical(_) => ColumnKind::Categorical,
        }
    }

    /// Number of missing cells. NaN counts as missing.
    pub fn missing_count(&self) -> usize {
        match self {
            Column::Numeric(v) => v
                .iter()
                .filter(|cell| !matches!(cell, Some(x) if !x.is_nan()))
                .count(),
            Column::Categorical(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(rows.iter().map(|&i| v[i]).collect()),
            Column::Categorical(v) => {
                Column::Categorical(rows.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    fn fill_zero(&mut self) -> usize {
        let mut filled = 0;
        match self {
            Column::Numeric(v) => {
                for cell in v.iter_mut() {
                    if !matches!(cell, Some(x) if !x.is_nan()) {
                        *cell = Some(0.0);
                        filled += 1;
                    }
                }
            }
            Column::Categorical(v) => {
                for cell in v.iter_mut().filter(|c| c.is_none()) {
                    *cell = Some(canonical_category("0"));
                    filled += 1;
                }
            }
        }
        filled
    }

    fn canonicalize(&mut self) {
        if let Column::Categorical(v) = self {
            for label in v.iter_mut().flatten() {
                *label = canonical_category(label);
            }
        }
    }
}

/// Column-oriented table with optional row timestamps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    len: usize,
    timestamps: Option<Vec<DateTime<Utc>>>,
    columns: BTreeMap<String, Column>,
}

impl Frame {
    /// Create an empty frame with `len` rows and no columns
    pub fn new(len: usize) -> Self {
        Self {
            len,
            timestamps: None,
            columns: BTreeMap::new(),
        }
    }

    /// Create a frame whose row count is given by its timestamps
    pub fn with_timestamps(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self {
            len: timestamps.len(),
            timestamps: Some(timestamps),
            columns: BTreeMap::new(),
        }
    }

    /// Insert or replace a column. Category labels are stored in
    /// [`canonical_category`] form.
    pub fn insert(&mut self, name: impl Into<String>, mut column: Column) -> Result<(), FrameError> {
        let name = name.into();
        if column.len() != self.len {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: self.len,
                found: column.len(),
            });
        }
        column.canonicalize();
        self.columns.insert(name, column);
        Ok(())
    }

    /// Builder form of [`Frame::insert`]
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self, FrameError> {
        self.insert(name, column)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn timestamps(&self) -> Option<&[DateTime<Utc>]> {
        self.timestamps.as_deref()
    }

    /// Borrow a numeric column
    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>], FrameError> {
        match self.columns.get(name) {
            Some(Column::Numeric(v)) => Ok(v),
            Some(Column::Categorical(_)) => Err(FrameError::WrongKind {
                column: name.to_string(),
                expected: ColumnKind::Numeric,
            }),
            None => Err(FrameError::MissingColumn(name.to_string())),
        }
    }

    /// Borrow a categorical column
    pub fn categorical(&self, name: &str) -> Result<&[Option<String>], FrameError> {
        match self.columns.get(name) {
            Some(Column::Categorical(v)) => Ok(v),
            Some(Column::Numeric(_)) => Err(FrameError::WrongKind {
                column: name.to_string(),
                expected: ColumnKind::Categorical,
            }),
            None => Err(FrameError::MissingColumn(name.to_string())),
        }
    }

    /// Fail on the first name that is not a column of this frame
    pub fn require_columns<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), FrameError> {
        for name in names {
            if !self.has_column(name) {
                return Err(FrameError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// Rows at the given indices, in the order given
    pub fn take_rows(&self, rows: &[usize]) -> Frame {
        Frame {
            len: rows.len(),
            timestamps: self
                .timestamps
                .as_ref()
                .map(|ts| rows.iter().map(|&i| ts[i]).collect()),
            columns: self
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.take(rows)))
                .collect(),
        }
    }

    /// Rows whose timestamp falls in `range`, in source order
    pub fn slice_time(&self, range: &TimeRange) -> Result<Frame, FrameError> {
        let timestamps = self.timestamps.as_ref().ok_or(FrameError::NoTimestamps)?;
        let rows: Vec<usize> = timestamps
            .iter()
            .enumerate()
            .filter(|(_, t)| range.contains(t))
            .map(|(i, _)| i)
            .collect();
        Ok(self.take_rows(&rows))
    }

    /// Replace every missing cell with zero (`"0"` for categorical cells).
    ///
    /// Lossy: rows with genuinely missing data are scored as if the value
    /// were zero. Returns the number of cells filled.
    pub fn fill_missing_with_zero(&mut self) -> usize {
        self.columns.values_mut().map(Column::fill_zero).sum()
    }
}

/// Immutable baseline that every bucket is compared against
#[derive(Debug, Clone)]
pub struct ReferenceSnapshot {
    schema: Arc<Schema>,
    frame: Arc<Frame>,
}

impl ReferenceSnapshot {
    /// Wrap a frame that carries every feature and the prediction column
    pub fn new(schema: Arc<Schema>, frame: Frame) -> Result<Self, FrameError> {
        schema.validate()?;
        for (name, kind) in schema.drift_columns() {
            let found = frame
                .column(name)
                .map(Column::kind)
                .ok_or_else(|| FrameError::MissingColumn(name.to_string()))?;
            if found != kind {
                return Err(FrameError::WrongKind {
                    column: name.to_string(),
                    expected: kind,
                });
            }
        }
        Ok(Self {
            schema,
            frame: Arc::new(frame),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }
}
