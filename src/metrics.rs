//! Clustering diagnostics.
//!
//! | Metric | Range | Best | Needs ground truth |
//! |--------|-------|------|--------------------|
//! | [`silhouette_score`] | [-1, 1] | 1 | no |
//! | [`ari`] | [-1, 1] | 1 | compares two labelings |
//!
//! The silhouette is the usual way to pick `k` for a universe without known
//! sectors; ARI measures how stable assignments are across seeds or date
//! ranges (labels are compared up to permutation).
//!
//! # References
//!
//! - Rousseeuw (1987). "Silhouettes: a graphical aid to the interpretation
//!   and validation of cluster analysis"
//! - Hubert & Arabie (1985). "Comparing partitions" (ARI)

use std::collections::HashMap;

use ndarray::{ArrayView2, Axis};

use crate::error::{Error, Result};

/// Per-point silhouette coefficients.
///
/// ```text
/// s(i) = (b(i) - a(i)) / max(a(i), b(i))
/// ```
///
/// `a(i)` is the mean distance from `i` to the rest of its cluster, `b(i)` the
/// smallest mean distance to another cluster. Points in singleton clusters
/// score 0.
///
/// Requires between 2 and `n - 1` distinct labels.
pub fn silhouette_samples(data: ArrayView2<'_, f64>, labels: &[usize]) -> Result<Vec<f64>> {
    let n = data.nrows();
    if n == 0 {
        return Err(Error::EmptyInput);
    }
    if labels.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: labels.len(),
        });
    }

    let k = labels.iter().max().map_or(0, |&m| m + 1);
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    let n_labels = sizes.iter().filter(|&&s| s > 0).count();
    if n_labels < 2 || n_labels > n - 1 {
        return Err(Error::invalid(
            "labels",
            format!("silhouette needs 2..={} clusters, got {n_labels}", n - 1),
        ));
    }

    let rows: Vec<_> = data.axis_iter(Axis(0)).collect();
    let mut scores = Vec::with_capacity(n);
    for i in 0..n {
        let own = labels[i];
        if sizes[own] == 1 {
            scores.push(0.0);
            continue;
        }

        let mut sums = vec![0.0f64; k];
        for j in 0..n {
            if i != j {
                let d: f64 = rows[i]
                    .iter()
                    .zip(rows[j].iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                sums[labels[j]] += d;
            }
        }

        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        scores.push(if denom > 0.0 { (b - a) / denom } else { 0.0 });
    }

    Ok(scores)
}

/// Mean silhouette coefficient over all points.
///
/// ```rust
/// use cohort::metrics::silhouette_score;
/// use ndarray::array;
///
/// let data = array![[0.0, 0.0], [0.0, 1.0], [10.0, 0.0], [10.0, 1.0]];
/// let s = silhouette_score(data.view(), &[0, 0, 1, 1]).unwrap();
/// assert!(s > 0.9);
/// ```
pub fn silhouette_score(data: ArrayView2<'_, f64>, labels: &[usize]) -> Result<f64> {
    let samples = silhouette_samples(data, labels)?;
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Adjusted Rand Index between two clusterings.
///
/// ARI measures similarity between two clusterings, adjusted for chance.
/// Range [-1, 1] where 1 is perfect agreement and 0 is random.
///
/// ```rust
/// use cohort::metrics::ari;
///
/// let first = [0, 0, 1, 1];
/// let second = [1, 1, 0, 0];
/// assert!((ari(&first, &second) - 1.0).abs() < 0.01);
/// ```
pub fn ari(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let (joint, n) = build_contingency_table(pred, truth);

    // Row sums (a_i) and column sums (b_j)
    let mut row_sums = HashMap::new();
    let mut col_sums = HashMap::new();

    for (&(p, t), &count) in &joint {
        *row_sums.entry(p).or_insert(0usize) += count;
        *col_sums.entry(t).or_insert(0usize) += count;
    }

    let sum_comb_ij: f64 = joint.values().map(|&c| comb2(c) as f64).sum();
    let sum_comb_a: f64 = row_sums.values().map(|&a| comb2(a) as f64).sum();
    let sum_comb_b: f64 = col_sums.values().map(|&b| comb2(b) as f64).sum();

    let comb_n = comb2(n) as f64;
    if comb_n == 0.0 {
        return 1.0;
    }

    // ARI = (index - expected) / (max - expected)
    let expected = sum_comb_a * sum_comb_b / comb_n;
    let max_index = (sum_comb_a + sum_comb_b) / 2.0;

    let denom = max_index - expected;
    if denom.abs() < 1e-10 {
        return 1.0;
    }

    (sum_comb_ij - expected) / denom
}

/// Member count per cluster id in `[0, k)`.
pub fn cluster_sizes(labels: &[usize], k: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; k];
    for &l in labels {
        if l < k {
            sizes[l] += 1;
        }
    }
    sizes
}

fn build_contingency_table(
    pred: &[usize],
    truth: &[usize],
) -> (HashMap<(usize, usize), usize>, usize) {
    let mut table = HashMap::new();
    for (&p, &t) in pred.iter().zip(truth.iter()) {
        *table.entry((p, t)).or_insert(0) += 1;
    }
    (table, pred.len())
}

fn comb2(n: usize) -> usize {
    if n < 2 {
        0
    } else {
        n * (n - 1) / 2
    }
}
