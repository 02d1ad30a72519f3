//! Row-wise L2 normalization.
//!
//! Movement vectors of a $400 stock and a $20 stock differ mostly in scale.
//! Rescaling every row to unit length leaves only the *shape* of the daily
//! movement pattern, so Euclidean distance between rows tracks correlation
//! rather than price level.

use ndarray::{Array2, ArrayView2, Axis};
use tracing::warn;

use crate::error::Diagnostic;
use crate::features::Dataset;

/// Rescales each row to unit Euclidean norm.
///
/// A row with zero norm (flat history, or fully imputed) stays the zero
/// vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    /// Create a normalizer.
    pub fn new() -> Self {
        Self
    }

    /// Normalize a matrix, returning the indices of zero-norm rows.
    pub fn transform(&self, data: ArrayView2<'_, f64>) -> (Array2<f64>, Vec<usize>) {
        let mut out = data.to_owned();
        let mut zero_rows = Vec::new();

        for (i, mut row) in out.axis_iter_mut(Axis(0)).enumerate() {
            // Divide by the largest magnitude first so squaring cannot
            // overflow or underflow.
            let peak = row.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            if peak == 0.0 {
                zero_rows.push(i);
                continue;
            }
            row.mapv_inplace(|v| v / peak);
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            row.mapv_inplace(|v| v / norm);
        }

        (out, zero_rows)
    }

    /// Normalize a dataset, keeping the symbol order.
    pub fn transform_dataset(&self, data: &Dataset) -> (Dataset, Option<Diagnostic>) {
        let (matrix, zero_rows) = self.transform(data.matrix());
        let diagnostic = (!zero_rows.is_empty()).then(|| {
            let symbols: Vec<&str> = zero_rows.iter().map(|&i| data.symbols()[i].as_str()).collect();
            warn!(?symbols, "zero-norm movement vectors left as zero");
            Diagnostic::ZeroNormRows { rows: zero_rows }
        });
        (data.with_matrix(matrix), diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    #[test]
    fn test_unit_norm() {
        let data = array![[3.0, 4.0], [0.0, -2.0]];
        let (out, zero) = Normalizer::new().transform(data.view());

        assert!(zero.is_empty());
        assert!((out[[0, 0]] - 0.6).abs() < 1e-12);
        assert!((out[[0, 1]] - 0.8).abs() < 1e-12);
        assert!((out[[1, 1]] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_row_stays_zero() {
        let data = array![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];
        let (out, zero) = Normalizer::new().transform(data.view());

        assert_eq!(zero, vec![0]);
        assert!(out.row(0).iter().all(|&v| v == 0.0));
        assert!(out.row(0).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_extreme_magnitudes() {
        let data = array![[1e-170, 0.0], [3e200, 4e200], [5e-324, -5e-324]];
        let (out, zero) = Normalizer::new().transform(data.view());

        assert!(zero.is_empty());
        assert_eq!(out.row(0).to_vec(), vec![1.0, 0.0]);
        assert!((out[[1, 0]] - 0.6).abs() < 1e-12);
        assert!((out[[1, 1]] - 0.8).abs() < 1e-12);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!((out[[2, 0]] - h).abs() < 1e-12);
        assert!((out[[2, 1]] + h).abs() < 1e-12);
    }

    #[test]
    fn test_dataset_diagnostic() {
        let ds = Dataset::new(
            vec!["FLAT".into(), "MOVER".into()],
            array![[0.0, 0.0], [1.0, -1.0]],
        )
        .unwrap();

        let (normed, diag) = Normalizer::new().transform_dataset(&ds);

        assert_eq!(normed.symbols(), ds.symbols());
        assert_eq!(diag, Some(Diagnostic::ZeroNormRows { rows: vec![0] }));
    }

    proptest! {
        #[test]
        fn prop_rows_unit_or_zero(
            rows in prop::collection::vec(
                (prop::collection::vec(-1.0f64..1.0, 5), -300i32..=300),
                1..20,
            )
        ) {
            let n = rows.len();
            let flat: Vec<f64> = rows
                .into_iter()
                .flat_map(|(row, exp)| row.into_iter().map(move |v| v * 10f64.powi(exp)))
                .collect();
            let data = Array2::from_shape_vec((n, 5), flat).unwrap();

            let (out, zero) = Normalizer::new().transform(data.view());

            for (i, row) in out.axis_iter(Axis(0)).enumerate() {
                let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                if zero.contains(&i) {
                    prop_assert_eq!(norm, 0.0);
                } else {
                    prop_assert!((norm - 1.0).abs() < 1e-9);
                }
            }
        }
    }
}
