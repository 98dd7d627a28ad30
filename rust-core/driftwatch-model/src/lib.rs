// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! driftwatch model adapter
//!
//! Loads a pre-trained regression model from a JSON artifact and applies it
//! to the feature columns of a frame, one prediction per row, in row order.

mod artifact;
mod predictor;

use driftwatch_frame::FrameError;
use thiserror::Error;

pub use artifact::{ForestModel, LinearModel, ModelArtifact, ModelSpec, Node, Tree};
pub use predictor::Predictor;

/// Model loading and scoring errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("I/O error reading model: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("Model feature {0} is not a schema feature")]
    UnknownFeature(String),

    #[error("Schema feature {0} is not consumed by the model")]
    UnusedFeature(String),

    #[error("Window is missing feature column {0}")]
    MissingFeature(String),

    #[error("Missing value in {column} at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Cannot encode category '{value}' of {column}")]
    UnencodableCategory { column: String, value: String },

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

impl ModelError {
    /// Whether the error is a model/schema mismatch rather than a problem
    /// with one particular window's data
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ModelError::Io(_)
                | ModelError::Parse(_)
                | ModelError::InvalidArtifact(_)
                | ModelError::UnknownFeature(_)
                | ModelError::UnusedFeature(_)
                | ModelError::MissingFeature(_)
                | ModelError::UnencodableCategory { .. }
        )
    }
}

/// A fitted regression model over a fixed, ordered feature vector
pub trait Regressor: Send + Sync {
    /// Feature names, in the order `predict_row` expects them
    fn features(&self) -> &[String];

    /// Predict one row
    fn predict_row(&self, row: &[f64]) -> f64;

    /// Predict a batch of rows
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Short name for logs
    fn name(&self) -> &str;
}
