// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sink error types.
//
// Only `Transient` is worth retrying. Everything else means the store or the
// record is wrong and retrying would write nothing new.

use thiserror::Error;

/// Errors that can occur when writing metrics records.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Connectivity loss or pool timeout.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// The destination table does not have the expected columns.
    #[error("schema mismatch: expected [{expected}], found [{found}]")]
    SchemaMismatch {
        /// Expected `name type` pairs.
        expected: String,
        /// Actual `name type` pairs.
        found: String,
    },

    /// Any other statement failure.
    #[error("database error: {0}")]
    Database(String),

    /// The record cannot be represented in the store.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Transient failures persisted past the retry budget.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Total attempts made, including the first.
        attempts: u32,
        /// The final transient error.
        #[source]
        last: Box<SinkError>,
    },
}

impl SinkError {
    /// Whether the operation may succeed if tried again.
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(SinkError::Transient("reset".to_string()).is_transient());
        assert!(!SinkError::Database("syntax".to_string()).is_transient());
        assert!(!SinkError::SchemaMismatch {
            expected: "a".to_string(),
            found: "b".to_string(),
        }
        .is_transient());
        assert!(!SinkError::RetriesExhausted {
            attempts: 4,
            last: Box::new(SinkError::Transient("reset".to_string())),
        }
        .is_transient());
    }

    #[test]
    fn test_retries_exhausted_display() {
        let err = SinkError::RetriesExhausted {
            attempts: 4,
            last: Box::new(SinkError::Transient("pool timed out".to_string())),
        };
        let text = err.to_string();
        assert!(text.contains("4 attempts"));
        assert!(text.contains("pool timed out"));
    }

    #[test]
    fn test_schema_mismatch_display() {
        let err = SinkError::SchemaMismatch {
            expected: "timestamp timestamp".to_string(),
            found: "id integer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "schema mismatch: expected [timestamp timestamp], found [id integer]"
        );
    }
}
