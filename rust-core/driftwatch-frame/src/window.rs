// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Half-open time ranges used to cut windows out of a frame.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::FrameError;

/// Time range `[start, end)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    /// Start time (inclusive)
    pub start: DateTime<Utc>,
    /// End time (exclusive)
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, FrameError> {
        if start >= end {
            return Err(FrameError::InvalidTimeRange(
                "start must be before end".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Range of `length` starting at `start`
    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Result<Self, FrameError> {
        Self::new(start, start + length)
    }

    /// Check if a timestamp is within the range
    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        *time >= self.start && *time < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
