//! Daily movement features.
//!
//! Each symbol is described by its sequence of `close - open` deltas over the
//! common date index. Missing sessions become `0.0`: the day is kept so that
//! column `j` still means the same trading day for every symbol.

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2};
use tracing::{info, warn};

use crate::error::{Diagnostic, Error, Result};
use crate::market::PriceTable;

/// Symbols paired 1:1 with the rows of a feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    symbols: Vec<String>,
    matrix: Array2<f64>,
}

impl Dataset {
    /// Pair symbols with matrix rows.
    ///
    /// Fails when the counts differ, when a symbol repeats, when the matrix is
    /// empty, or when it holds a non-finite value.
    pub fn new(symbols: Vec<String>, matrix: Array2<f64>) -> Result<Self> {
        if symbols.len() != matrix.nrows() {
            return Err(Error::DimensionMismatch {
                expected: symbols.len(),
                found: matrix.nrows(),
            });
        }
        let mut seen = HashSet::with_capacity(symbols.len());
        for symbol in &symbols {
            if !seen.insert(symbol.as_str()) {
                return Err(Error::invalid("symbols", format!("duplicate symbol {symbol}")));
            }
        }
        check_finite(matrix.view())?;
        Ok(Self { symbols, matrix })
    }

    /// Symbols in row order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Feature matrix, one row per symbol.
    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    /// Feature vector of one symbol.
    pub fn row(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.matrix.row(idx)
    }

    /// Feature vector by symbol name.
    pub fn get(&self, symbol: &str) -> Option<ArrayView1<'_, f64>> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.matrix.row(i))
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True when no symbols are present.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Feature vector length.
    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    /// Replace the matrix, keeping the symbol order.
    pub(crate) fn with_matrix(&self, matrix: Array2<f64>) -> Self {
        debug_assert_eq!(matrix.nrows(), self.symbols.len());
        Self {
            symbols: self.symbols.clone(),
            matrix,
        }
    }

    /// Split into symbols and matrix.
    pub fn into_parts(self) -> (Vec<String>, Array2<f64>) {
        (self.symbols, self.matrix)
    }
}

/// Turns an aligned price table into movement feature vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Create a builder.
    pub fn new() -> Self {
        Self
    }

    /// Compute `close - open` for every symbol and day.
    ///
    /// Returns the dataset and, when any cell was missing, an
    /// [`Diagnostic::ImputedCells`] entry.
    pub fn build(&self, table: &PriceTable) -> Result<(Dataset, Option<Diagnostic>)> {
        let (n, d) = (table.n_symbols(), table.n_days());
        if n == 0 || d == 0 {
            return Err(Error::EmptyInput);
        }

        let mut imputed = 0usize;
        let matrix = Array2::from_shape_fn((n, d), |(i, j)| match table.cell(i, j) {
            Some(session) => session.movement(),
            None => {
                imputed += 1;
                0.0
            }
        });

        info!(symbols = n, days = d, "built movement matrix");
        let diagnostic = (imputed > 0).then(|| {
            warn!(cells = imputed, "missing sessions found, filling with zero movement");
            Diagnostic::ImputedCells { count: imputed }
        });

        Ok((Dataset::new(table.symbols().to_vec(), matrix)?, diagnostic))
    }
}

pub(crate) fn check_finite(data: ArrayView2<'_, f64>) -> Result<()> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(Error::EmptyInput);
    }
    match data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), _)) => Err(Error::NonFinite { row, col }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{FillPolicy, PriceBar, PriceSeries};
    use chrono::NaiveDate;
    use ndarray::array;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 6, day).unwrap()
    }

    #[test]
    fn test_movement_is_close_minus_open() {
        let s = PriceSeries::new(
            "KO",
            vec![
                PriceBar::new(d(1), 40.0, 41.0, 39.5, 40.5),
                PriceBar::new(d(2), 40.5, 40.6, 39.0, 39.2),
            ],
        );
        let table = PriceTable::align(vec![s], FillPolicy::Missing).unwrap();

        let (ds, diag) = FeatureBuilder::new().build(&table).unwrap();

        assert!(diag.is_none());
        assert!((ds.row(0)[0] - 0.5).abs() < 1e-12);
        assert!((ds.row(0)[1] + 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_missing_cells_zero_filled_not_dropped() {
        let a = PriceSeries::new(
            "A",
            vec![
                PriceBar::new(d(1), 1.0, 2.0, 1.0, 2.0),
                PriceBar::new(d(2), 2.0, 2.0, 1.0, 1.0),
                PriceBar::new(d(3), 1.0, 3.0, 1.0, 3.0),
            ],
        );
        let b = PriceSeries::new("B", vec![PriceBar::new(d(3), 5.0, 6.0, 5.0, 6.0)]);
        let table = PriceTable::align(vec![a, b], FillPolicy::Missing).unwrap();

        let (ds, diag) = FeatureBuilder::new().build(&table).unwrap();

        assert_eq!(ds.dim(), 3);
        assert_eq!(ds.get("B").unwrap().to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(diag, Some(Diagnostic::ImputedCells { count: 2 }));
    }

    #[test]
    fn test_dataset_rejects_nan() {
        let err = Dataset::new(vec!["X".into()], array![[1.0, f64::NAN]]).unwrap_err();
        assert_eq!(err, Error::NonFinite { row: 0, col: 1 });
    }

    #[test]
    fn test_dataset_rejects_duplicate_symbol() {
        let err = Dataset::new(
            vec!["A".into(), "A".into(), "B".into()],
            array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "symbols", .. }));
    }

    #[test]
    fn test_dataset_rejects_row_count_mismatch() {
        let err = Dataset::new(vec!["X".into(), "Y".into()], array![[1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }
}
