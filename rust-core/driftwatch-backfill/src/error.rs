// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Backfill error taxonomy.
//!
//! Every variant is fatal to the run. The variant decides the exit code and
//! the `kind` label in the failure message.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use driftwatch_drift::DriftError;
use driftwatch_frame::FrameError;
use driftwatch_model::ModelError;
use driftwatch_sink::SinkError;
use thiserror::Error;

use crate::config::ConfigError;

/// Why a bucket could not be scored or evaluated
#[derive(Error, Debug)]
pub enum ComputationError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Drift(#[from] DriftError),
}

/// Fatal backfill errors
#[derive(Error, Debug)]
pub enum BackfillError {
    #[error("configuration error{}: {source}", at(.bucket))]
    Configuration {
        /// Set when a bucket revealed the problem
        bucket: Option<DateTime<Utc>>,
        #[source]
        source: ConfigError,
    },

    #[error("computation failed for bucket {bucket}: {source}")]
    Computation {
        bucket: DateTime<Utc>,
        #[source]
        source: ComputationError,
    },

    #[error("metrics store unavailable{}: {source}", at(.bucket))]
    TransientStore {
        bucket: Option<DateTime<Utc>>,
        #[source]
        source: SinkError,
    },

    #[error("metrics store schema mismatch: {source}")]
    SchemaMismatch {
        bucket: Option<DateTime<Utc>>,
        #[source]
        source: SinkError,
    },

    #[error("metrics store failure{}: {source}", at(.bucket))]
    Store {
        bucket: Option<DateTime<Utc>>,
        #[source]
        source: SinkError,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn at(bucket: &Option<DateTime<Utc>>) -> String {
    bucket
        .map(|b| format!(" at bucket {}", b))
        .unwrap_or_default()
}

impl From<ConfigError> for BackfillError {
    fn from(source: ConfigError) -> Self {
        BackfillError::Configuration {
            bucket: None,
            source,
        }
    }
}

impl BackfillError {
    /// Classify a sink failure
    pub fn from_sink(bucket: Option<DateTime<Utc>>, source: SinkError) -> Self {
        match source {
            SinkError::Transient(_) | SinkError::RetriesExhausted { .. } => {
                BackfillError::TransientStore { bucket, source }
            }
            SinkError::SchemaMismatch { .. } => BackfillError::SchemaMismatch { bucket, source },
            _ => BackfillError::Store { bucket, source },
        }
    }

    /// Classify a per-bucket model failure. A model that does not fit the
    /// data is a configuration problem, whichever bucket reveals it.
    pub fn from_model(bucket: DateTime<Utc>, source: ModelError) -> Self {
        if source.is_configuration() {
            BackfillError::Configuration {
                bucket: Some(bucket),
                source: ConfigError::Model(source),
            }
        } else {
            BackfillError::Computation {
                bucket,
                source: source.into(),
            }
        }
    }

    /// Classify a per-bucket metrics failure
    pub fn from_drift(bucket: DateTime<Utc>, source: DriftError) -> Self {
        match source {
            DriftError::MissingColumn(_) | DriftError::IncompatibleTest { .. } => {
                BackfillError::Configuration {
                    bucket: Some(bucket),
                    source: ConfigError::Drift(source),
                }
            }
            _ => BackfillError::Computation {
                bucket,
                source: source.into(),
            },
        }
    }

    /// Split a load failure into I/O and configuration
    pub fn from_frame(path: impl Into<PathBuf>, source: FrameError) -> Self {
        match source {
            FrameError::Io(source) => BackfillError::Io {
                path: path.into(),
                source,
            },
            other => ConfigError::Frame(other).into(),
        }
    }

    /// Stable label for logs and failure messages
    pub fn kind(&self) -> &'static str {
        match self {
            BackfillError::Configuration { .. } => "configuration",
            BackfillError::Computation { .. } => "computation",
            BackfillError::TransientStore { .. } => "transient_store",
            BackfillError::SchemaMismatch { .. } => "schema_mismatch",
            BackfillError::Store { .. } => "store",
            BackfillError::Io { .. } => "io",
        }
    }

    /// Bucket being processed when the error occurred, if any
    pub fn bucket(&self) -> Option<DateTime<Utc>> {
        match self {
            BackfillError::Computation { bucket, .. } => Some(*bucket),
            BackfillError::Configuration { bucket, .. }
            | BackfillError::TransientStore { bucket, .. }
            | BackfillError::SchemaMismatch { bucket, .. }
            | BackfillError::Store { bucket, .. } => *bucket,
            BackfillError::Io { .. } => None,
        }
    }

    /// Process exit code: 2 for configuration, 1 for everything else
    pub fn exit_code(&self) -> u8 {
        match self {
            BackfillError::Configuration { .. } => 2,
            _ => 1,
        }
    }
}
