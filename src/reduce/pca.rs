//! Principal component analysis.
//!
//! # Method
//!
//! With `X` the column-centered `n × d` input and `X = U Σ Vᵀ` its thin SVD,
//! the principal directions are the columns of `V` ordered by descending
//! singular value, and the scores are `X V`. The SVD is computed directly on
//! `X` with `faer`, so no Gram matrix is formed.
//!
//! Price panels are usually wide: a few dozen symbols against several hundred
//! trading days. The thin SVD then has `n` directions at most.
//!
//! # Signs
//!
//! Each component is flipped so that its largest-magnitude loading is
//! positive. Without this, the 2-D picture could mirror between runs.
//!
//! # Rank deficiency
//!
//! When fewer than `n_components` directions carry variance (for example
//! `d < 2`, or all rows identical), the missing components are zero vectors
//! and the corresponding score columns are zero.

use faer::Mat;
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use tracing::debug;

use crate::error::{Error, Result};
use crate::features::check_finite;

/// PCA configuration.
#[derive(Debug, Clone)]
pub struct Pca {
    n_components: usize,
}

impl Default for Pca {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Pca {
    /// Keep `n_components` leading components.
    pub fn new(n_components: usize) -> Self {
        Self { n_components }
    }

    /// Number of components kept.
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Fit the model.
    pub fn fit(&self, data: ArrayView2<'_, f64>) -> Result<PcaModel> {
        if self.n_components == 0 {
            return Err(Error::invalid("n_components", "must be at least 1"));
        }
        check_finite(data)?;

        let (n, d) = data.dim();
        let mean = data
            .mean_axis(Axis(0))
            .ok_or(Error::EmptyInput)?;
        let centered = &data - &mean;

        let scale = data.iter().map(|x| x * x).sum::<f64>();
        let directions = right_singular_vectors(&centered);
        // σᵢ² = ‖X vᵢ‖², in the order faer returns (non-increasing).
        let sigma_sq: Array1<f64> = directions
            .columns()
            .into_iter()
            .map(|v| {
                let proj = centered.dot(&v);
                proj.dot(&proj)
            })
            .collect();

        let cutoff = rank_cutoff(&sigma_sq, scale, n, d);
        let rank = sigma_sq.iter().filter(|&&l| l > cutoff).count();
        let kept = self.n_components.min(rank);

        let mut components = Array2::zeros((self.n_components, d));
        let mut singular_values = Array1::zeros(self.n_components);
        for i in 0..kept {
            let mut comp = directions.column(i).to_owned();
            flip_sign(&mut comp);
            components.row_mut(i).assign(&comp);
            singular_values[i] = sigma_sq[i].sqrt();
        }

        let denom = (n.saturating_sub(1)).max(1) as f64;
        let explained_variance = singular_values.mapv(|s| s * s / denom);
        let total_variance: f64 = sigma_sq.iter().take(rank).sum::<f64>() / denom;
        let explained_variance_ratio = if total_variance > 0.0 {
            &explained_variance / total_variance
        } else {
            Array1::zeros(self.n_components)
        };

        debug!(
            rows = n,
            cols = d,
            rank,
            ratio = ?explained_variance_ratio.to_vec(),
            "fitted pca"
        );

        Ok(PcaModel {
            mean,
            components,
            singular_values,
            explained_variance,
            explained_variance_ratio,
            rank,
        })
    }

    /// Fit and project the same data.
    pub fn fit_transform(&self, data: ArrayView2<'_, f64>) -> Result<(PcaModel, Array2<f64>)> {
        let model = self.fit(data)?;
        let scores = model.transform(data)?;
        Ok((model, scores))
    }
}

/// A fitted projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaModel {
    mean: Array1<f64>,
    components: Array2<f64>,
    singular_values: Array1<f64>,
    explained_variance: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
    rank: usize,
}

impl PcaModel {
    /// Column means subtracted before projection.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Components as rows (`n_components × d`), unit length or zero.
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    /// Singular values of the centered input, per component.
    pub fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    /// Variance captured per component (`σ² / (n - 1)`).
    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    /// Share of total variance captured per component.
    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    /// Numerical rank of the centered input.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Project rows onto the components.
    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.mean.len() {
            return Err(Error::DimensionMismatch {
                expected: self.mean.len(),
                found: data.ncols(),
            });
        }
        Ok((&data - &self.mean).dot(&self.components.t()))
    }

    /// Map scores back to the input space.
    pub fn inverse_transform(&self, scores: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if scores.ncols() != self.components.nrows() {
            return Err(Error::DimensionMismatch {
                expected: self.components.nrows(),
                found: scores.ncols(),
            });
        }
        Ok(scores.dot(&self.components) + &self.mean)
    }

    /// Keep only the leading `k` components.
    pub fn truncate(&self, k: usize) -> PcaModel {
        let k = k.min(self.components.nrows());
        PcaModel {
            mean: self.mean.clone(),
            components: self.components.slice(s![..k, ..]).to_owned(),
            singular_values: self.singular_values.slice(s![..k]).to_owned(),
            explained_variance: self.explained_variance.slice(s![..k]).to_owned(),
            explained_variance_ratio: self.explained_variance_ratio.slice(s![..k]).to_owned(),
            rank: self.rank,
        }
    }
}

/// Right singular vectors of `x` as columns (`d × min(n, d)`).
fn right_singular_vectors(x: &Array2<f64>) -> Array2<f64> {
    let (n, d) = x.dim();
    let mat = Mat::<f64>::from_fn(n, d, |i, j| x[[i, j]]);
    let svd = mat.thin_svd();
    let v = svd.v();
    Array2::from_shape_fn((v.nrows(), v.ncols()), |(i, j)| v[(i, j)])
}

/// Squared singular values below this are rounding noise. Scaled by the
/// larger of the top value and the squared Frobenius norm of the raw input,
/// so that an all-identical input (centered to ~1e-16) has rank 0.
fn rank_cutoff(sigma_sq: &Array1<f64>, scale: f64, n: usize, d: usize) -> f64 {
    let top = sigma_sq.iter().copied().fold(0.0, f64::max);
    top.max(scale) * n.max(d) as f64 * 16.0 * f64::EPSILON
}

fn flip_sign(v: &mut Array1<f64>) {
    let mut best = 0.0f64;
    let mut sign = 1.0;
    for &x in v.iter() {
        if x.abs() > best {
            best = x.abs();
            sign = x.signum();
        }
    }
    if sign < 0.0 {
        v.mapv_inplace(|x| -x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < tol, "{x} vs {y}");
        }
    }

    #[test]
    fn test_line_has_one_component() {
        // Points on the line y = 2x: all variance on one axis.
        let data = array![[0.0, 0.0], [1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let model = Pca::new(2).fit(data.view()).unwrap();

        assert_eq!(model.rank(), 1);
        assert!((model.singular_values()[0] - 5.0).abs() < 1e-12);
        assert!((model.explained_variance()[0] - 25.0 / 3.0).abs() < 1e-12);
        assert!((model.explained_variance_ratio()[0] - 1.0).abs() < 1e-12);
        assert_eq!(model.components().row(1).to_vec(), vec![0.0, 0.0]);

        let c = model.components().row(0);
        let norm = 5f64.sqrt();
        assert!((c[0] - 1.0 / norm).abs() < 1e-12);
        assert!((c[1] - 2.0 / norm).abs() < 1e-12);
    }

    #[test]
    fn test_round_trip_tall() {
        let data = array![
            [2.5, 2.4, 0.5],
            [0.5, 0.7, -1.2],
            [2.2, 2.9, 0.3],
            [1.9, 2.2, 1.1],
            [3.1, 3.0, -0.4],
            [2.3, 2.7, 0.9]
        ];
        let model = Pca::new(3).fit(data.view()).unwrap();
        let scores = model.transform(data.view()).unwrap();
        let back = model.inverse_transform(scores.view()).unwrap();

        assert_eq!(model.rank(), 3);
        assert_close(&back, &data, 1e-9);
    }

    #[test]
    fn test_round_trip_wide() {
        // Fewer rows than columns; centered rank is n - 1.
        let data = array![
            [0.1, -0.3, 0.2, 0.0, 0.5, -0.1],
            [0.4, 0.1, -0.2, 0.3, -0.1, 0.2],
            [-0.2, 0.2, 0.1, -0.4, 0.0, 0.3]
        ];
        let model = Pca::new(2).fit(data.view()).unwrap();
        let scores = model.transform(data.view()).unwrap();
        let back = model.inverse_transform(scores.view()).unwrap();

        assert_eq!(model.rank(), 2);
        assert_close(&back, &data, 1e-9);
    }

    #[test]
    fn test_wide_variance_matches_centered_total() {
        let data = array![
            [0.3, -0.1, 0.4, 0.2, -0.5, 0.1, 0.0, 0.6],
            [-0.2, 0.5, 0.1, -0.3, 0.2, 0.4, -0.1, 0.0],
            [0.1, 0.1, -0.6, 0.5, 0.3, -0.2, 0.2, -0.4],
            [0.0, -0.3, 0.2, 0.1, 0.4, -0.5, 0.3, 0.1]
        ];
        let model = Pca::new(4).fit(data.view()).unwrap();
        let mean = data.mean_axis(Axis(0)).unwrap();
        let total = (&data - &mean).iter().map(|x| x * x).sum::<f64>() / 3.0;

        assert_eq!(model.rank(), 3);
        assert!((model.explained_variance().sum() - total).abs() < 1e-9);
        assert!((model.explained_variance_ratio().sum() - 1.0).abs() < 1e-9);
        assert_eq!(model.singular_values()[3], 0.0);
    }

    #[test]
    fn test_components_orthonormal() {
        let data = array![
            [1.0, 0.0, 2.0, -1.0],
            [0.0, 1.0, -1.0, 2.0],
            [3.0, 1.0, 0.0, 0.5],
            [-1.0, 2.0, 1.0, 1.0],
            [0.5, -0.5, 0.5, -0.5]
        ];
        let model = Pca::new(3).fit(data.view()).unwrap();
        let gram = model.components().dot(&model.components().t());

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-9);
            }
        }
        let ev = model.explained_variance();
        assert!(ev[0] >= ev[1] && ev[1] >= ev[2]);
    }

    #[test]
    fn test_single_column_pads_with_zeros() {
        let data = array![[1.0], [2.0], [4.0]];
        let (model, scores) = Pca::new(2).fit_transform(data.view()).unwrap();

        assert_eq!(scores.dim(), (3, 2));
        assert!(scores.column(1).iter().all(|&v| v == 0.0));
        assert_eq!(model.rank(), 1);
    }

    #[test]
    fn test_identical_rows_project_to_origin() {
        let data = array![[0.6, 0.8], [0.6, 0.8], [0.6, 0.8]];
        let (model, scores) = Pca::new(2).fit_transform(data.view()).unwrap();

        assert_eq!(model.rank(), 0);
        assert!(scores.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_components_rejected() {
        let data = array![[1.0, 2.0]];
        let err = Pca::new(0).fit(data.view()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "n_components", .. }));
    }

    #[test]
    fn test_transform_dimension_checked() {
        let model = Pca::new(1).fit(array![[1.0, 2.0], [2.0, 1.0]].view()).unwrap();
        let err = model.transform(array![[1.0, 2.0, 3.0]].view()).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, found: 3 }));
    }

    #[test]
    fn test_truncate() {
        let data = array![[1.0, 0.0, 2.0], [0.0, 1.0, -1.0], [3.0, 1.0, 0.0], [-1.0, 2.0, 1.0]];
        let model = Pca::new(3).fit(data.view()).unwrap();
        let two = model.truncate(2);
        assert_eq!(two.components().nrows(), 2);
        assert_eq!(two.transform(data.view()).unwrap().ncols(), 2);
    }
}
