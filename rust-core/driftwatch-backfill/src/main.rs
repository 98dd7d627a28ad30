// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! driftwatch-backfill: replay a year of data into the metrics store.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use driftwatch_backfill::{
    BackfillConfig, BackfillError, BucketPlan, ConfigError, MonitoringContext, RunSummary,
    Scheduler,
};
use driftwatch_drift::MetricsEngine;
use driftwatch_sink::{InMemorySink, MetricsSink, PostgresSink, RetryingSink};
use tracing::{error, info};

/// Paced day-by-day drift and quality backfill
#[derive(Parser, Debug)]
#[command(name = "driftwatch-backfill", version, about)]
struct Cli {
    /// JSON config file, merged over the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// First day to process (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day to process, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Minimum seconds between two persisted buckets; 0 disables pacing
    #[arg(long)]
    interval_secs: Option<f64>,

    /// Reference CSV
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Historical data CSV
    #[arg(long)]
    data: Option<PathBuf>,

    /// Model artifact (JSON)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Drop and recreate the metrics table first
    #[arg(long)]
    reset_table: bool,

    /// Keep records in memory and print them as JSON lines
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn load_config(&self) -> Result<BackfillConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => BackfillConfig::from_path(path)?,
            None => BackfillConfig::default(),
        };
        config.apply_env();

        if let Some(start) = self.start {
            config.backfill_start_date = start;
        }
        if let Some(end) = self.end {
            config.backfill_end_date = end;
        }
        if let Some(interval) = self.interval_secs {
            config.min_emit_interval_seconds = interval;
        }
        if let Some(path) = &self.reference {
            config.reference_path = path.clone();
        }
        if let Some(path) = &self.data {
            config.data_path = path.clone();
        }
        if let Some(path) = &self.model {
            config.model_path = path.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

async fn run_with<S: MetricsSink>(
    context: Arc<MonitoringContext>,
    config: &BackfillConfig,
    sink: S,
) -> Result<(RunSummary, S), BackfillError> {
    let plan = BucketPlan::daily(config.backfill_start_date, config.backfill_end_date)?;
    let scheduler = Scheduler::new(
        context,
        MetricsEngine::new(config.thresholds.clone()),
        sink,
        plan,
        config.min_emit_interval(),
    );
    let summary = scheduler.run().await?;
    Ok((summary, scheduler.into_sink()))
}

async fn run(cli: Cli) -> Result<RunSummary, BackfillError> {
    let config = cli.load_config()?;
    let context = Arc::new(MonitoringContext::load(&config).await?);

    if cli.dry_run {
        let (summary, sink) = run_with(context, &config, InMemorySink::new()).await?;
        for record in sink.records().await {
            let line = record
                .to_json_line()
                .map_err(|e| BackfillError::from_sink(Some(record.timestamp), e))?;
            println!("{}", line);
        }
        return Ok(summary);
    }

    let store = &config.store;
    let postgres = PostgresSink::connect(
        store.connect_options(),
        store.table.clone(),
        store.connect_timeout(),
    )
    .await
    .map_err(|e| BackfillError::from_sink(None, e))?;
    postgres
        .prepare(cli.reset_table)
        .await
        .map_err(|e| BackfillError::from_sink(None, e))?;

    let sink = RetryingSink::new(postgres, store.retry_policy());
    sink.verify_schema()
        .await
        .map_err(|e| BackfillError::from_sink(None, e))?;

    let (summary, sink) = run_with(context, &config, sink).await?;
    let stats = sink.stats().await;
    info!(
        appends = stats.appends,
        retries = stats.retries,
        failures = stats.failures,
        "metrics store statistics"
    );
    Ok(summary)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(summary) => {
            info!(
                buckets = summary.buckets,
                rows = summary.rows,
                elapsed_secs = summary.elapsed.as_secs_f64(),
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            let bucket = e.bucket().map(|b| b.to_string());
            error!(
                kind = e.kind(),
                bucket = bucket.as_deref().unwrap_or("-"),
                "backfill aborted: {}",
                e
            );
            ExitCode::from(e.exit_code())
        }
    }
}
