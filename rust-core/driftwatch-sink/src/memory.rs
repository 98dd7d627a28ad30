// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory metrics sink.
//
// Keeps records in arrival order in a `Vec` behind a tokio `RwLock`. Used by
// tests and by dry runs of the backfill binary.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SinkError;
use crate::record::MetricsRecord;
use crate::sink::MetricsSink;

/// An in-memory sink. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    records: Arc<RwLock<Vec<MetricsRecord>>>,
}

impl InMemorySink {
    /// Create a new, empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record written so far, in write order.
    pub async fn records(&self) -> Vec<MetricsRecord> {
        self.records.read().await.clone()
    }

    /// Return the number of records written.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Return true if nothing has been written.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Drop every record.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl MetricsSink for InMemorySink {
    async fn append(&self, record: &MetricsRecord) -> Result<(), SinkError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn verify_schema(&self) -> Result<(), SinkError> {
        // Records are stored as typed values; there is no external shape.
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
