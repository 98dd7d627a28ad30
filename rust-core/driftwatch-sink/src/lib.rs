// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// driftwatch metrics sinks
//
// Append-only persistence of one metrics record per processed bucket. The
// `MetricsSink` trait is the contract the backfill scheduler writes through;
// the concrete sinks can be swapped without touching the scheduler.
//
// # Modules
//
// - [`sink`] -- The `MetricsSink` trait.
// - [`error`] -- The `SinkError` enum and its transient/fatal split.
// - [`record`] -- The `MetricsRecord` row and the expected table shape.
// - [`memory`] -- An in-memory sink for tests and dry runs.
// - [`retry`] -- A wrapper that retries transient failures with backoff.
// - `postgres` -- The PostgreSQL sink (feature `postgres`).

pub mod error;
pub mod memory;
pub mod record;
pub mod retry;
pub mod sink;

// Optional persistent sinks, feature-gated to keep the default build lean.
#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::SinkError;
pub use memory::InMemorySink;
pub use record::{validate_table_name, MetricsRecord, COLUMNS};
pub use retry::{RetryPolicy, RetryingSink, SinkStats};
pub use sink::MetricsSink;

#[cfg(feature = "postgres")]
pub use postgres::PostgresSink;
