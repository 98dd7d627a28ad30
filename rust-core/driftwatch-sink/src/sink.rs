// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core sink trait.
//
// A sink accepts metrics records in the order the scheduler produces them.
// Sinks are expected to be thread-safe (`Send + Sync`) and fully
// asynchronous.

use async_trait::async_trait;

use crate::error::SinkError;
use crate::record::MetricsRecord;

/// An append-only destination for metrics records.
///
/// Implementations never update or delete a record once written, and add no
/// uniqueness constraint of their own.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Persist one record.
    ///
    /// On error nothing is written for this record.
    async fn append(&self, record: &MetricsRecord) -> Result<(), SinkError>;

    /// Check that the destination has the expected shape.
    ///
    /// Returns `SinkError::SchemaMismatch` when it does not.
    async fn verify_schema(&self) -> Result<(), SinkError>;

    /// A human-readable name for this sink, used in logging.
    fn name(&self) -> &str;
}
