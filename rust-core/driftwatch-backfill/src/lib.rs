// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Paced monitoring backfill.
//!
//! Replays a historical dataset one day at a time: each day is scored by the
//! model, compared against the reference snapshot, and written to the metrics
//! store as a single record, no faster than the configured emission interval.

pub mod config;
pub mod context;
pub mod error;
pub mod pacer;
pub mod plan;
pub mod scheduler;
pub mod telemetry;

pub use config::{BackfillConfig, ConfigError, StoreConfig, PASSWORD_ENV};
pub use context::MonitoringContext;
pub use error::{BackfillError, ComputationError};
pub use pacer::{PaceOutcome, Pacer};
pub use plan::BucketPlan;
pub use scheduler::{RunSummary, Scheduler};
pub use telemetry::SchedulerMetrics;
