// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PostgreSQL metrics sink.
//
// Writes one row per record into a plain table through a single sqlx pool
// that is opened once and reused for the whole run. Enabled with the
// `postgres` feature.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info};

use crate::error::SinkError;
use crate::record::{validate_table_name, MetricsRecord, COLUMNS};
use crate::sink::MetricsSink;

/// A sink writing to a PostgreSQL table.
#[derive(Debug, Clone)]
pub struct PostgresSink {
    pool: PgPool,
    table: String,
}

impl PostgresSink {
    /// Open a pool to the database described by `options`.
    pub async fn connect(
        options: PgConnectOptions,
        table: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, SinkError> {
        let table = table.into();
        validate_table_name(&table)?;
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(connect_timeout)
            .connect_with(options)
            .await?;
        info!(table = %table, "connected to metrics store");
        Ok(Self { pool, table })
    }

    /// Use an existing pool.
    pub fn from_pool(pool: PgPool, table: impl Into<String>) -> Result<Self, SinkError> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the metrics table if it does not exist.
    ///
    /// With `reset` the table is dropped first, discarding every record.
    pub async fn prepare(&self, reset: bool) -> Result<(), SinkError> {
        if reset {
            sqlx::query(&drop_table_sql(&self.table))
                .execute(&self.pool)
                .await?;
            info!(table = %self.table, "dropped metrics table");
        }
        sqlx::query(&create_table_sql(&self.table))
            .execute(&self.pool)
            .await?;
        debug!(table = %self.table, "metrics table ready");
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for PostgresSink {
    async fn append(&self, record: &MetricsRecord) -> Result<(), SinkError> {
        let drifted = i32::try_from(record.num_drifted_cols)
            .map_err(|e| SinkError::InvalidRecord(format!("num_drifted_cols: {}", e)))?;

        sqlx::query(&insert_sql(&self.table))
            .bind(record.timestamp.naive_utc())
            .bind(record.prediction_drift)
            .bind(drifted)
            .bind(record.share_missing_values)
            .bind(record.mean_absolute_error)
            .bind(record.root_mean_squared_error)
            .bind(record.r2_score)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn verify_schema(&self) -> Result<(), SinkError> {
        let found: Vec<(String, String)> = sqlx::query_as(
            "SELECT column_name::text, data_type::text \
             FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(&self.table)
        .fetch_all(&self.pool)
        .await?;

        let expected = describe(COLUMNS.iter().copied());
        let found = describe(found.iter().map(|(n, t)| (n.as_str(), t.as_str())));
        if expected != found {
            return Err(SinkError::SchemaMismatch { expected, found });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

impl From<sqlx::Error> for SinkError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => SinkError::Transient(err.to_string()),
            sqlx::Error::Database(db) if db.code().is_some_and(|c| is_transient_state(&c)) => {
                SinkError::Transient(err.to_string())
            }
            _ => SinkError::Database(err.to_string()),
        }
    }
}

/// SQLSTATE class 08 (connection exception) and server shutdown codes
fn is_transient_state(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03" | "40001" | "40P01")
}

fn describe<'a>(columns: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    columns
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect::<Vec<_>>()
        .join(", ")
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table,
        describe(COLUMNS.iter().copied())
    )
}

fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", table)
}

fn insert_sql(table: &str) -> String {
    let names: Vec<&str> = COLUMNS.iter().map(|(n, _)| *n).collect();
    let params: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        params.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql() {
        assert_eq!(
            create_table_sql("metrics"),
            "CREATE TABLE IF NOT EXISTS metrics (timestamp timestamp without time zone, \
             prediction_drift double precision, num_drifted_cols integer, \
             share_missing_values double precision, mean_absolute_error double precision, \
             root_mean_squared_error double precision, r2_score double precision)"
        );
        assert_eq!(drop_table_sql("metrics"), "DROP TABLE IF EXISTS metrics");
    }

    #[test]
    fn test_insert_sql_binds_every_column() {
        assert_eq!(
            insert_sql("metrics"),
            "INSERT INTO metrics (timestamp, prediction_drift, num_drifted_cols, \
             share_missing_values, mean_absolute_error, root_mean_squared_error, r2_score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
    }

    #[test]
    fn test_connection_failures_are_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(SinkError::from(sqlx::Error::Io(io)).is_transient());
        assert!(SinkError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert!(SinkError::from(sqlx::Error::PoolClosed).is_transient());
        assert!(!SinkError::from(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_transient_sqlstates() {
        assert!(is_transient_state("08006"));
        assert!(is_transient_state("57P01"));
        assert!(!is_transient_state("42P01"));
        assert!(!is_transient_state("23505"));
    }

    #[tokio::test]
    async fn test_from_pool_rejects_bad_table() {
        let options = PgConnectOptions::new().host("127.0.0.1");
        let pool = PgPoolOptions::new().connect_lazy_with(options);
        assert!(PostgresSink::from_pool(pool, "bad name").is_err());
    }
}
