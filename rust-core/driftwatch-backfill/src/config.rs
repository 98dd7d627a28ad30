// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Backfill configuration.
//!
//! Defaults reproduce the weather-forecast deployment:
//! - one bucket per day from 2025-01-01 through 2025-12-31
//! - at most one metrics row per second
//! - a local PostgreSQL database `test`, table `metrics`

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use driftwatch_drift::{DriftError, DriftThresholds};
use driftwatch_frame::{FrameError, Schema};
use driftwatch_model::ModelError;
use driftwatch_sink::{validate_table_name, RetryPolicy};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

/// Environment variable overriding `store.password`
pub const PASSWORD_ENV: &str = "DRIFTWATCH_STORE_PASSWORD";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    Frame(#[from] FrameError),

    #[error("Model does not fit the data: {0}")]
    Model(#[from] ModelError),

    #[error("Data does not fit the schema: {0}")]
    Drift(#[from] DriftError),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Metrics store connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub table: String,
    /// Retries after a transient failure
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "test".to_string(),
            table: "metrics".to_string(),
            max_retries: 3,
            base_backoff_ms: 200,
            max_backoff_ms: 5000,
            connect_timeout_secs: 10,
        }
    }
}

impl StoreConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.dbname)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Configuration for one backfill run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackfillConfig {
    /// Minimum spacing between two persisted buckets; 0 disables pacing
    pub min_emit_interval_seconds: f64,
    /// First day (inclusive)
    pub backfill_start_date: NaiveDate,
    /// Last day (inclusive)
    pub backfill_end_date: NaiveDate,
    pub store: StoreConfig,
    pub schema: Schema,
    pub thresholds: DriftThresholds,
    /// Replace missing cells with zero before scoring. Lossy.
    pub fill_missing_with_zero: bool,
    pub reference_path: PathBuf,
    pub data_path: PathBuf,
    pub model_path: PathBuf,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            min_emit_interval_seconds: 1.0,
            backfill_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            backfill_end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default(),
            store: StoreConfig::default(),
            schema: Schema::default(),
            thresholds: DriftThresholds::default(),
            fill_missing_with_zero: true,
            reference_path: PathBuf::from("data/reference.csv"),
            data_path: PathBuf::from("data/weather.csv"),
            model_path: PathBuf::from("models/model.json"),
        }
    }
}

impl BackfillConfig {
    /// Parse a JSON config; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Apply environment overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides from `lookup`
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(password) = lookup(PASSWORD_ENV) {
            self.store.password = password;
        }
    }

    /// Reject settings the run cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.host.trim().is_empty() {
            return Err(ConfigError::Invalid("store.host is empty".to_string()));
        }
        if self.store.port == 0 {
            return Err(ConfigError::Invalid("store.port must be non-zero".to_string()));
        }
        validate_table_name(&self.store.table).map_err(|_| {
            ConfigError::Invalid(format!(
                "store.table {:?} is not a plain identifier",
                self.store.table
            ))
        })?;
        if self.store.base_backoff_ms > self.store.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "store.base_backoff_ms exceeds store.max_backoff_ms".to_string(),
            ));
        }
        if self.backfill_end_date < self.backfill_start_date {
            return Err(ConfigError::Invalid(format!(
                "backfill_end_date {} is before backfill_start_date {}",
                self.backfill_end_date, self.backfill_start_date
            )));
        }
        if !self.min_emit_interval_seconds.is_finite() || self.min_emit_interval_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_emit_interval_seconds must be a non-negative number, got {}",
                self.min_emit_interval_seconds
            )));
        }
        self.schema.validate()?;
        Ok(())
    }

    /// Number of daily buckets, both end dates included
    pub fn bucket_count(&self) -> usize {
        let days = (self.backfill_end_date - self.backfill_start_date).num_days() + 1;
        usize::try_from(days).unwrap_or(0)
    }

    /// Emission interval; only meaningful after `validate`
    pub fn min_emit_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.min_emit_interval_seconds).unwrap_or(Duration::ZERO)
    }
}
