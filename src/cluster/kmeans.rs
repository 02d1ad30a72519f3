//! K-means clustering.
//!
//! Partitions data into k clusters by minimizing **within-cluster sum of squares**
//! (inertia):
//!
//! ```text
//! inertia = Σₖ Σᵢ∈Cₖ ||xᵢ - μₖ||²
//! ```
//!
//! # Lloyd's Algorithm
//!
//! 1. **Init**: k-means++ seeding
//! 2. **Assign**: each point → nearest centroid (ties → lowest centroid index)
//! 3. **Update**: each centroid → mean of its points
//! 4. Repeat until membership is stable, the largest centroid shift drops
//!    below `tol`, or `max_iter` is reached
//!
//! Inertia is non-increasing across Assign steps: Update can only lower each
//! point's distance to its own centroid, and the next Assign can only lower it
//! further by switching to a closer one.
//!
//! ## K-means++ Initialization
//!
//! 1. Choose first centroid uniformly at random
//! 2. Choose next centroid with probability proportional to D(x)²
//!    (squared distance to nearest existing centroid)
//!
//! Points already sitting on a chosen centroid have D(x)² = 0 and are never
//! drawn while any point has positive D(x)². If every point coincides with a
//! chosen centroid (fewer distinct points than k), the next seed is drawn
//! uniformly.
//!
//! [`Kmeans::with_local_trials`] switches to greedy k-means++: each step draws
//! several candidates and keeps the one that lowers the total D² the most.
//!
//! ## Empty Clusters
//!
//! A centroid left with no points after Assign is moved onto the point that is
//! currently farthest from its own centroid. That point then forms a singleton
//! on the next Assign, so cluster counts stay stable across restarts. When no
//! point has positive distance (all points coincide with centroids) the
//! cluster stays empty and its centroid is the seed point it started from.
//!
//! # Restarts
//!
//! Lloyd finds a local optimum only. `n_init` independent runs are made and
//! the one with the lowest inertia wins (ties → earliest run). Each run gets
//! its own `StdRng` seeded from the caller's random source before any run
//! starts, so the result does not depend on whether runs execute on the
//! rayon pool or sequentially.

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::traits::Clustering;
use crate::error::{Diagnostic, Error, Result};
use crate::features::check_finite;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// K-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Maximum iterations per run.
    max_iter: usize,
    /// Convergence tolerance on the largest centroid displacement.
    tol: f64,
    /// Number of independent runs.
    n_init: usize,
    /// Random seed.
    seed: Option<u64>,
    /// Candidates drawn per k-means++ step.
    local_trials: usize,
    /// Run restarts on the rayon pool.
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    parallel: bool,
}

/// Why a single run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No point changed cluster between two Assign steps.
    Stable,
    /// Largest centroid displacement fell below the tolerance.
    CentroidShift,
    /// `max_iter` reached first.
    IterationCap,
}

/// Result of the winning run.
#[derive(Debug, Clone, PartialEq)]
pub struct KmeansFit {
    labels: Vec<usize>,
    centroids: Array2<f64>,
    inertia: f64,
    n_iter: usize,
    stop: StopReason,
    run: usize,
    empty_clusters: Vec<usize>,
    inertia_history: Vec<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl Kmeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 1000,
            tol: 1e-4,
            n_init: 10,
            seed: None,
            local_trials: 1,
            parallel: true,
        }
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set number of independent runs.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set or clear the random seed.
    pub fn with_seed_opt(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Candidates drawn per k-means++ step. Each candidate is sampled with
    /// probability proportional to D(x)² and the one giving the lowest total
    /// D² is kept. The default `1` is textbook k-means++.
    pub fn with_local_trials(mut self, trials: usize) -> Self {
        self.local_trials = trials;
        self
    }

    /// Run restarts in parallel (only effective with the `parallel` feature).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check parameters against an input of `n` points.
    pub fn validate(&self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if self.k == 0 || self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        if self.max_iter == 0 {
            return Err(Error::invalid("max_iter", "must be at least 1"));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(Error::invalid("tol", format!("must be positive, got {}", self.tol)));
        }
        if self.n_init == 0 {
            return Err(Error::invalid("n_init", "must be at least 1"));
        }
        if self.local_trials == 0 {
            return Err(Error::invalid("local_trials", "must be at least 1"));
        }
        Ok(())
    }

    /// Fit using the configured seed, or OS entropy when none is set.
    pub fn fit(&self, data: ArrayView2<'_, f64>) -> Result<KmeansFit> {
        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        self.fit_with_rng(data, &mut rng)
    }

    /// Fit drawing all randomness from `rng`.
    ///
    /// One `u64` is taken from `rng` per run to seed that run's generator.
    pub fn fit_with_rng<R: Rng + ?Sized>(
        &self,
        data: ArrayView2<'_, f64>,
        rng: &mut R,
    ) -> Result<KmeansFit> {
        check_finite(data)?;
        self.validate(data.nrows())?;

        let seeds: Vec<u64> = (0..self.n_init).map(|_| rng.random::<u64>()).collect();
        let runs = self.run_all(data, &seeds);

        let mut best: Option<KmeansFit> = None;
        for fit in runs {
            debug!(
                run = fit.run,
                inertia = fit.inertia,
                n_iter = fit.n_iter,
                stop = ?fit.stop,
                "k-means run finished"
            );
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        let mut best = best.ok_or(Error::EmptyInput)?;

        let distinct = count_distinct_rows(data);
        if distinct < self.k {
            warn!(distinct, k = self.k, "fewer distinct points than clusters");
            best.diagnostics.push(Diagnostic::FewerDistinctPointsThanK {
                distinct,
                k: self.k,
            });
        }
        if !best.empty_clusters.is_empty() {
            warn!(clusters = ?best.empty_clusters, "winning run has empty clusters");
            best.diagnostics.push(Diagnostic::EmptyClusters {
                clusters: best.empty_clusters.clone(),
            });
        }
        if best.stop == StopReason::IterationCap {
            warn!(max_iter = self.max_iter, "k-means hit the iteration cap");
            best.diagnostics.push(Diagnostic::IterationCapReached {
                max_iter: self.max_iter,
            });
        }

        info!(
            k = self.k,
            runs = self.n_init,
            run = best.run,
            inertia = best.inertia,
            "k-means fitted"
        );
        Ok(best)
    }

    /// Inertia of the best run for each k, for elbow plots.
    pub fn inertia_sweep(
        &self,
        data: ArrayView2<'_, f64>,
        ks: impl IntoIterator<Item = usize>,
    ) -> Result<Vec<(usize, f64)>> {
        ks.into_iter()
            .map(|k| {
                let mut model = self.clone();
                model.k = k;
                model.fit(data).map(|fit| (k, fit.inertia))
            })
            .collect()
    }

    fn run_all(&self, data: ArrayView2<'_, f64>, seeds: &[u64]) -> Vec<KmeansFit> {
        #[cfg(feature = "parallel")]
        {
            if self.parallel && seeds.len() > 1 {
                return seeds
                    .par_iter()
                    .enumerate()
                    .map(|(run, &seed)| self.run_once(data, run, &mut StdRng::seed_from_u64(seed)))
                    .collect();
            }
        }

        seeds
            .iter()
            .enumerate()
            .map(|(run, &seed)| self.run_once(data, run, &mut StdRng::seed_from_u64(seed)))
            .collect()
    }

    /// One Init→Converge cycle.
    fn run_once(&self, data: ArrayView2<'_, f64>, run: usize, rng: &mut impl Rng) -> KmeansFit {
        let n = data.nrows();
        let mut centroids = self.init_centroids(data, rng);
        let mut origins = centroids.clone();
        let mut labels = vec![usize::MAX; n];
        let mut dist = vec![0.0f64; n];
        let mut history = Vec::new();
        let mut stop = StopReason::IterationCap;
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;

            let changed = assign(data, &centroids, &mut labels, &mut dist);
            history.push(dist.iter().sum::<f64>());
            if changed == 0 {
                stop = StopReason::Stable;
                break;
            }

            let new_centroids = self.update(data, &labels, &mut dist, &mut origins);
            let shift = max_shift(&centroids, &new_centroids);
            centroids = new_centroids;

            if shift < self.tol {
                stop = StopReason::CentroidShift;
                break;
            }
        }

        // Labels must describe the returned centroids.
        if stop != StopReason::Stable {
            assign(data, &centroids, &mut labels, &mut dist);
            history.push(dist.iter().sum::<f64>());
        }

        let mut counts = vec![0usize; self.k];
        for &l in &labels {
            counts[l] += 1;
        }
        let empty_clusters = (0..self.k).filter(|&c| counts[c] == 0).collect();

        KmeansFit {
            labels,
            centroids,
            inertia: history.last().copied().unwrap_or(0.0),
            n_iter,
            stop,
            run,
            empty_clusters,
            inertia_history: history,
            diagnostics: Vec::new(),
        }
    }

    /// Initialize centroids using k-means++.
    fn init_centroids(&self, data: ArrayView2<'_, f64>, rng: &mut impl Rng) -> Array2<f64> {
        let n = data.nrows();
        let mut centroids = Array2::zeros((self.k, data.ncols()));

        // First centroid: random point
        let first = rng.random_range(0..n);
        centroids.row_mut(0).assign(&data.row(first));

        // closest[j] = squared distance from point j to its nearest chosen centroid
        let mut closest: Vec<f64> = data
            .axis_iter(Axis(0))
            .map(|p| squared_distance(&p, &data.row(first)))
            .collect();

        for i in 1..self.k {
            let total: f64 = closest.iter().sum();
            if total <= 0.0 {
                let idx = rng.random_range(0..n);
                centroids.row_mut(i).assign(&data.row(idx));
                continue;
            }

            let mut best: Option<(usize, f64, Vec<f64>)> = None;
            for _ in 0..self.local_trials {
                let candidate = sample_weighted(&closest, total, rng);
                let chosen = data.row(candidate);
                let updated: Vec<f64> = data
                    .axis_iter(Axis(0))
                    .zip(&closest)
                    .map(|(p, &c)| c.min(squared_distance(&p, &chosen)))
                    .collect();
                let potential: f64 = updated.iter().sum();
                if best.as_ref().map_or(true, |b| potential < b.1) {
                    best = Some((candidate, potential, updated));
                }
            }

            if let Some((selected, _, updated)) = best {
                centroids.row_mut(i).assign(&data.row(selected));
                closest = updated;
            }
        }

        centroids
    }

    /// Means of assigned points; empty clusters are reseeded.
    ///
    /// `dist` holds each point's squared distance to its own centroid and is
    /// zeroed for points that become a reseeded centroid. `origins` holds the
    /// point each cluster was last seeded from.
    fn update(
        &self,
        data: ArrayView2<'_, f64>,
        labels: &[usize],
        dist: &mut [f64],
        origins: &mut Array2<f64>,
    ) -> Array2<f64> {
        let mut sums = Array2::<f64>::zeros((self.k, data.ncols()));
        let mut counts = vec![0usize; self.k];

        for (point, &k) in data.axis_iter(Axis(0)).zip(labels) {
            let mut row = sums.row_mut(k);
            row += &point;
            counts[k] += 1;
        }

        for k in 0..self.k {
            if counts[k] > 0 {
                let mut row = sums.row_mut(k);
                row /= counts[k] as f64;
                continue;
            }

            // Farthest point from its own centroid, lowest index on ties.
            let (far, far_dist) = dist
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |acc, (i, d)| if d > acc.1 { (i, d) } else { acc });

            if far_dist > 0.0 {
                debug!(cluster = k, point = far, "reseeding empty cluster");
                sums.row_mut(k).assign(&data.row(far));
                origins.row_mut(k).assign(&data.row(far));
                dist[far] = 0.0;
            } else {
                sums.row_mut(k).assign(&origins.row(k));
            }
        }

        sums
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, data: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        self.fit(data).map(KmeansFit::into_labels)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

impl KmeansFit {
    /// Cluster id per input row, each in `[0, k)`.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Consume the fit, keeping only the labels.
    pub fn into_labels(self) -> Vec<usize> {
        self.labels
    }

    /// Final centroids, one row per cluster. An empty cluster keeps its seed point.
    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    /// Sum of squared distances from each point to its centroid.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Iterations run by the winning run.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Why the winning run stopped.
    pub fn stop_reason(&self) -> StopReason {
        self.stop
    }

    /// False when the winning run hit the iteration cap.
    pub fn converged(&self) -> bool {
        self.stop != StopReason::IterationCap
    }

    /// Index of the winning run among the restarts.
    pub fn run(&self) -> usize {
        self.run
    }

    /// Clusters with no members.
    pub fn empty_clusters(&self) -> &[usize] {
        &self.empty_clusters
    }

    /// Inertia after each Assign step of the winning run.
    pub fn inertia_history(&self) -> &[f64] {
        &self.inertia_history
    }

    /// Non-fatal conditions seen during the fit.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Member count per cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        crate::metrics::cluster_sizes(&self.labels, self.k())
    }

    /// Assign new points to the nearest centroid.
    pub fn predict(&self, data: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        check_finite(data)?;
        if data.ncols() != self.centroids.ncols() {
            return Err(Error::DimensionMismatch {
                expected: self.centroids.ncols(),
                found: data.ncols(),
            });
        }
        Ok(data
            .axis_iter(Axis(0))
            .map(|p| nearest(&p, &self.centroids).0)
            .collect())
    }
}

/// Assign every point to its nearest centroid. Returns how many labels changed.
fn assign(
    data: ArrayView2<'_, f64>,
    centroids: &Array2<f64>,
    labels: &mut [usize],
    dist: &mut [f64],
) -> usize {
    let mut changed = 0;
    for (i, point) in data.axis_iter(Axis(0)).enumerate() {
        let (best, d) = nearest(&point, centroids);
        if labels[i] != best {
            labels[i] = best;
            changed += 1;
        }
        dist[i] = d;
    }
    changed
}

/// Nearest centroid and squared distance; ties go to the lowest index.
fn nearest(point: &ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best_cluster = 0;
    let mut best_dist = f64::INFINITY;
    for (k, c) in centroids.axis_iter(Axis(0)).enumerate() {
        let d = squared_distance(point, &c);
        if d < best_dist {
            best_dist = d;
            best_cluster = k;
        }
    }
    (best_cluster, best_dist)
}

/// Compute squared Euclidean distance.
fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn max_shift(old: &Array2<f64>, new: &Array2<f64>) -> f64 {
    old.axis_iter(Axis(0))
        .zip(new.axis_iter(Axis(0)))
        .map(|(a, b)| squared_distance(&a, &b).sqrt())
        .fold(0.0, f64::max)
}

/// Index drawn with probability proportional to `weights`. Zero-weight
/// entries are never returned.
fn sample_weighted(weights: &[f64], total: f64, rng: &mut impl Rng) -> usize {
    let threshold = rng.random::<f64>() * total;
    let mut cumsum = 0.0;
    let mut last_positive = 0;
    for (j, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumsum += w;
        last_positive = j;
        if cumsum > threshold {
            return j;
        }
    }
    last_positive
}

fn count_distinct_rows(data: ArrayView2<'_, f64>) -> usize {
    data.axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .map(|&v| if v == 0.0 { 0u64 } else { v.to_bits() })
                .collect::<Vec<u64>>()
        })
        .collect::<HashSet<_>>()
        .len()
}
