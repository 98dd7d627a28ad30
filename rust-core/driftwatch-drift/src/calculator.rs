// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Two-sample statistics
//!
//! Distances and tests between a reference sample and a current sample.
//! Every statistic here is 0 for identical samples and grows as the samples
//! diverge. Callers pass samples with missing values already removed.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Floor for the reference standard deviation when norming Wasserstein distance
const MIN_NORM: f64 = 0.001;

/// Two-sample Kolmogorov–Smirnov statistic `D = sup |F_ref - F_cur|`
pub fn ks_statistic(reference: &[f64], current: &[f64]) -> f64 {
    if reference.is_empty() || current.is_empty() {
        return 0.0;
    }
    let a = sorted(reference);
    let b = sorted(current);
    let (n, m) = (a.len() as f64, b.len() as f64);

    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    d
}

/// Asymptotic p-value of a two-sample KS statistic
pub fn ks_p_value(d: f64, n: usize, m: usize) -> f64 {
    if n == 0 || m == 0 {
        return 1.0;
    }
    let ne = (n * m) as f64 / (n + m) as f64;
    let sqrt_ne = ne.sqrt();
    kolmogorov_q((sqrt_ne + 0.12 + 0.11 / sqrt_ne) * d)
}

/// Survival function of the Kolmogorov distribution
fn kolmogorov_q(lambda: f64) -> f64 {
    const EPS_TERM: f64 = 0.001;
    const EPS_SUM: f64 = 1.0e-8;

    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0;
    for j in 1..=100 {
        let j = j as f64;
        let term = fac * (a2 * j * j).exp();
        sum += term;
        if term.abs() <= EPS_TERM * previous || term.abs() <= EPS_SUM * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        previous = term.abs();
    }
    // Series fails to converge only for tiny lambda, where Q -> 1
    1.0
}

/// Wasserstein-1 distance between two empirical distributions
pub fn wasserstein_distance(reference: &[f64], current: &[f64]) -> f64 {
    if reference.is_empty() || current.is_empty() {
        return 0.0;
    }
    let a = sorted(reference);
    let b = sorted(current);
    let mut all: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    all.sort_by(f64::total_cmp);

    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut distance = 0.0;
    for pair in all.windows(2) {
        while i < a.len() && a[i] <= pair[0] {
            i += 1;
        }
        while j < b.len() && b[j] <= pair[0] {
            j += 1;
        }
        let gap = pair[1] - pair[0];
        distance += (i as f64 / n - j as f64 / m).abs() * gap;
    }
    distance
}

/// Wasserstein distance in units of the reference standard deviation
pub fn wasserstein_normed(reference: &[f64], current: &[f64]) -> f64 {
    let norm = ColumnStats::compute(reference).std_dev.max(MIN_NORM);
    wasserstein_distance(reference, current) / norm
}

/// Category frequencies, keyed in sorted order
pub fn category_counts<'a>(values: impl IntoIterator<Item = &'a str>) -> BTreeMap<&'a str, usize> {
    let mut counts = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
}

/// Chi-square goodness of fit of current counts against reference proportions.
///
/// Returns `(statistic, p_value)`. A category present in the current sample
/// but absent from the reference makes the statistic infinite.
pub fn chi_square(reference: &[&str], current: &[&str]) -> (f64, f64) {
    if reference.is_empty() || current.is_empty() {
        return (0.0, 1.0);
    }
    let ref_counts = category_counts(reference.iter().copied());
    let cur_counts = category_counts(current.iter().copied());
    let scale = current.len() as f64 / reference.len() as f64;

    let mut categories: Vec<&str> = ref_counts.keys().copied().collect();
    categories.extend(cur_counts.keys().filter(|k| !ref_counts.contains_key(*k)));

    let mut statistic = 0.0;
    for category in &categories {
        let expected = *ref_counts.get(category).unwrap_or(&0) as f64 * scale;
        let observed = *cur_counts.get(category).unwrap_or(&0) as f64;
        if expected == 0.0 {
            return (f64::INFINITY, 0.0);
        }
        statistic += (observed - expected).powi(2) / expected;
    }

    let dof = categories.len().saturating_sub(1);
    if dof == 0 {
        return (0.0, 1.0);
    }
    (statistic, chi_square_sf(statistic, dof as f64))
}

/// Jensen–Shannon distance (base 2) between category distributions.
///
/// 0 for identical distributions, 1 for disjoint support.
pub fn jensen_shannon(reference: &[&str], current: &[&str]) -> f64 {
    if reference.is_empty() || current.is_empty() {
        return 0.0;
    }
    let ref_counts = category_counts(reference.iter().copied());
    let cur_counts = category_counts(current.iter().copied());
    let (n, m) = (reference.len() as f64, current.len() as f64);

    let mut keys: Vec<&str> = ref_counts.keys().copied().collect();
    keys.extend(cur_counts.keys().filter(|k| !ref_counts.contains_key(*k)));

    let mut divergence = 0.0;
    for key in keys {
        let p = *ref_counts.get(key).unwrap_or(&0) as f64 / n;
        let q = *cur_counts.get(key).unwrap_or(&0) as f64 / m;
        let mid = (p + q) / 2.0;
        if p > 0.0 {
            divergence += 0.5 * p * (p / mid).log2();
        }
        if q > 0.0 {
            divergence += 0.5 * q * (q / mid).log2();
        }
    }
    divergence.max(0.0).sqrt().min(1.0)
}

/// Upper tail probability of the chi-square distribution.
///
/// A non-positive `dof` carries no evidence and yields 1.
pub fn chi_square_sf(statistic: f64, dof: f64) -> f64 {
    if statistic <= 0.0 {
        return 1.0;
    }
    if !statistic.is_finite() {
        return 0.0;
    }
    match ChiSquared::new(dof) {
        Ok(distribution) => distribution.sf(statistic).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Summary statistics for a numeric sample
#[derive(Debug, Clone)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    /// Population statistics over the finite values of `data`
    pub fn compute(data: &[f64]) -> Self {
        let valid: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();

        if valid.is_empty() {
            return Self {
                count: 0,
                mean: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let mean = valid.iter().sum::<f64>() / valid.len() as f64;
        let variance: f64 =
            valid.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / valid.len() as f64;

        Self {
            count: valid.len(),
            mean,
            std_dev: variance.sqrt(),
            min: valid.iter().copied().fold(f64::INFINITY, f64::min),
            max: valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_ks_identical_samples() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let d = ks_statistic(&a, &a);
        assert_eq!(d, 0.0);
        assert_eq!(ks_p_value(d, a.len(), a.len()), 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let a: Vec<f64> = (0..50).map(|x| x as f64).collect();
        let b: Vec<f64> = (100..150).map(|x| x as f64).collect();
        let d = ks_statistic(&a, &b);
        assert_eq!(d, 1.0);
        assert!(ks_p_value(d, 50, 50) < 1e-6);
    }

    #[test]
    fn test_ks_known_value() {
        // F_a jumps at 1,2,3,4; F_b at 3,4,5,6 -> max gap 0.5 at x in [2,3)
        let d = ks_statistic(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0, 5.0, 6.0]);
        assert!(approx(d, 0.5, 1e-12));
    }

    #[test]
    fn test_ks_ties_across_samples() {
        let d = ks_statistic(&[5.0; 100], &[5.0; 50]);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_ks_p_value_monotone() {
        let p_small = ks_p_value(0.1, 100, 100);
        let p_large = ks_p_value(0.3, 100, 100);
        assert!(p_small > p_large);
        assert!((0.0..=1.0).contains(&p_small));
    }

    #[test]
    fn test_wasserstein_shift() {
        let a = [0.0, 1.0, 2.0];
        let b = [1.0, 2.0, 3.0];
        assert!(approx(wasserstein_distance(&a, &b), 1.0, 1e-12));
        assert_eq!(wasserstein_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_wasserstein_unequal_sizes() {
        // point mass at 0 vs half at 0, half at 2
        assert!(approx(wasserstein_distance(&[0.0], &[0.0, 2.0]), 1.0, 1e-12));
    }

    #[test]
    fn test_wasserstein_normed_constant_reference() {
        assert_eq!(wasserstein_normed(&[5.0; 10], &[5.0; 4]), 0.0);
        // std 0 -> floor of 0.001
        assert!(approx(wasserstein_normed(&[5.0; 10], &[6.0; 4]), 1000.0, 1e-6));
    }

    #[test]
    fn test_chi_square_identical_proportions() {
        let reference = ["a", "a", "b", "b"];
        let current = ["a", "b"];
        let (stat, p) = chi_square(&reference, &current);
        assert_eq!(stat, 0.0);
        assert!(approx(p, 1.0, 1e-12));
    }

    #[test]
    fn test_chi_square_new_category() {
        let (stat, p) = chi_square(&["a", "a"], &["a", "z"]);
        assert!(stat.is_infinite());
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_chi_square_single_category() {
        assert_eq!(chi_square(&["a"; 5], &["a"; 3]), (0.0, 1.0));
    }

    #[test]
    fn test_chi_square_sf_known_values() {
        // chi2(1) at 3.841 -> 0.05; chi2(2) sf(x) = exp(-x/2)
        assert!(approx(chi_square_sf(3.841_458_820_694_124, 1.0), 0.05, 1e-6));
        assert!(approx(chi_square_sf(4.0, 2.0), (-2.0f64).exp(), 1e-9));
        assert!(approx(chi_square_sf(20.0, 10.0), 0.029_252_688_076_961, 1e-7));
        assert_eq!(chi_square_sf(0.0, 3.0), 1.0);
        assert_eq!(chi_square_sf(f64::INFINITY, 3.0), 0.0);
        assert_eq!(chi_square_sf(5.0, 0.0), 1.0);
    }

    #[test]
    fn test_jensen_shannon_bounds() {
        assert_eq!(jensen_shannon(&["a", "b"], &["b", "a"]), 0.0);
        assert!(approx(jensen_shannon(&["a", "a"], &["b"]), 1.0, 1e-12));

        let partial = jensen_shannon(&["a", "b"], &["a", "a"]);
        assert!(partial > 0.0 && partial < 1.0);
    }

    #[test]
    fn test_column_stats() {
        let stats = ColumnStats::compute(&[1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN]);

        assert_eq!(stats.count, 5);
        assert!((stats.mean - 3.0).abs() < 1e-10);
        assert!((stats.std_dev - 2.0f64.sqrt()).abs() < 1e-10);
        assert!((stats.min - 1.0).abs() < 1e-10);
        assert!((stats.max - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_column_stats_empty() {
        let stats = ColumnStats::compute(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.std_dev, 0.0);
    }
}
