// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Property-based tests for drift statistics

use driftwatch_drift::{
    chi_square, jensen_shannon, ks_p_value, ks_statistic, wasserstein_distance,
    wasserstein_normed, DefaultDriftTest, DriftTest, RegressionQuality, Sample,
};
use proptest::prelude::*;

/// Generate finite sample values
fn arb_sample() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e3..1.0e3f64, 1..200)
}

/// Generate category labels from a small alphabet
fn arb_categories() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-e]", 1..200)
}

proptest! {
    #[test]
    fn test_identical_samples_have_zero_statistic(values in arb_sample()) {
        prop_assert_eq!(ks_statistic(&values, &values), 0.0);
        prop_assert_eq!(wasserstein_distance(&values, &values), 0.0);
        prop_assert_eq!(wasserstein_normed(&values, &values), 0.0);
    }

    #[test]
    fn test_ks_is_bounded_and_symmetric(a in arb_sample(), b in arb_sample()) {
        let d = ks_statistic(&a, &b);
        prop_assert!((0.0..=1.0).contains(&d));
        prop_assert!((d - ks_statistic(&b, &a)).abs() < 1e-12);

        let p = ks_p_value(d, a.len(), b.len());
        prop_assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_wasserstein_of_a_shift(values in arb_sample(), shift in -50.0..50.0f64) {
        let shifted: Vec<f64> = values.iter().map(|v| v + shift).collect();
        let distance = wasserstein_distance(&values, &shifted);
        prop_assert!((distance - shift.abs()).abs() < 1e-6);
    }

    #[test]
    fn test_category_statistics(a in arb_categories(), b in arb_categories()) {
        let a: Vec<&str> = a.iter().map(String::as_str).collect();
        let b: Vec<&str> = b.iter().map(String::as_str).collect();

        let js = jensen_shannon(&a, &b);
        prop_assert!((0.0..=1.0 + 1e-12).contains(&js));
        prop_assert!(jensen_shannon(&a, &a).abs() < 1e-12);

        let (statistic, p) = chi_square(&a, &b);
        prop_assert!(statistic >= 0.0);
        prop_assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_default_test_never_flags_identical_columns(values in arb_sample()) {
        let test = DefaultDriftTest::default();
        let sample = Sample::Numeric(values);
        let drift = test.column_drift("x", &sample, &sample).unwrap();
        prop_assert!(!drift.drifted);
        prop_assert_eq!(drift.statistic, 0.0);
    }

    #[test]
    fn test_rmse_dominates_mae(truth in arb_sample(), noise in arb_sample()) {
        let truth: Vec<Option<f64>> = truth.into_iter().map(Some).collect();
        let predictions: Vec<Option<f64>> = truth
            .iter()
            .zip(noise.iter().cycle())
            .map(|(t, n)| t.map(|t| t + n))
            .collect();

        let q = RegressionQuality::compute(&truth, &predictions).unwrap();
        prop_assert!(q.root_mean_squared_error + 1e-9 >= q.mean_absolute_error);
        prop_assert!(q.r2_score <= 1.0);
        prop_assert_eq!(q.observations, truth.len());
    }
}
