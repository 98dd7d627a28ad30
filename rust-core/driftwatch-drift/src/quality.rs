// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Regression quality against ground truth.

use serde::{Deserialize, Serialize};

/// Error scalars for one window of predictions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegressionQuality {
    /// Rows with both a target and a prediction
    pub observations: usize,
    pub mean_absolute_error: f64,
    pub root_mean_squared_error: f64,
    /// Coefficient of determination. With a constant target this is 1.0
    /// for a perfect fit and 0.0 otherwise.
    pub r2_score: f64,
}

impl RegressionQuality {
    /// Compute over rows where both values are present and finite.
    ///
    /// Returns `None` when no such row exists.
    pub fn compute(truth: &[Option<f64>], predictions: &[Option<f64>]) -> Option<Self> {
        let pairs: Vec<(f64, f64)> = truth
            .iter()
            .zip(predictions)
            .filter_map(|(t, p)| match (t, p) {
                (Some(t), Some(p)) if t.is_finite() && p.is_finite() => Some((*t, *p)),
                _ => None,
            })
            .collect();
        if pairs.is_empty() {
            return None;
        }

        let n = pairs.len() as f64;
        let mean_truth = pairs.iter().map(|(t, _)| t).sum::<f64>() / n;
        let abs_sum: f64 = pairs.iter().map(|(t, p)| (t - p).abs()).sum();
        let ss_res: f64 = pairs.iter().map(|(t, p)| (t - p).powi(2)).sum();
        let ss_tot: f64 = pairs.iter().map(|(t, _)| (t - mean_truth).powi(2)).sum();

        let r2_score = if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };

        Some(Self {
            observations: pairs.len(),
            mean_absolute_error: abs_sum / n,
            root_mean_squared_error: (ss_res / n).sqrt(),
            r2_score,
        })
    }
}
