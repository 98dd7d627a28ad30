// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Daily bucket plan.
//!
//! Splits an inclusive range of calendar days into consecutive one-day
//! [`TimeRange`]s starting at midnight UTC.

use chrono::{Duration, NaiveDate};
use driftwatch_frame::TimeRange;

use crate::config::ConfigError;

/// Ordered, gap-free daily buckets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPlan {
    buckets: Vec<TimeRange>,
}

impl BucketPlan {
    /// One bucket per day from `first` through `last`
    pub fn daily(first: NaiveDate, last: NaiveDate) -> Result<Self, ConfigError> {
        if last < first {
            return Err(ConfigError::Invalid(format!(
                "last day {} is before first day {}",
                last, first
            )));
        }

        let days = (last - first).num_days() + 1;
        let start = first.and_time(chrono::NaiveTime::MIN).and_utc();
        let buckets = (0..days)
            .map(|i| TimeRange::starting_at(start + Duration::days(i), Duration::days(1)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { buckets })
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimeRange> {
        self.buckets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeRange> {
        self.buckets.iter()
    }
}
