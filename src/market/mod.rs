//! Price series and the date-aligned table the feature stage consumes.
//!
//! Upstream data sources hand over one [`PriceSeries`] per symbol. Series are
//! usually ragged: a listing may start late, a halt removes a day, a provider
//! drops a bar. [`PriceTable::align`] puts every symbol on one common date
//! index so that column `j` means the same trading day for every row.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use cohort::market::{FillPolicy, PriceBar, PriceSeries, PriceTable};
//!
//! let d = |day| NaiveDate::from_ymd_opt(2017, 1, day).unwrap();
//! let aapl = PriceSeries::new("AAPL", vec![
//!     PriceBar::new(d(3), 115.8, 116.3, 114.8, 116.1),
//!     PriceBar::new(d(4), 115.9, 116.5, 115.8, 116.0),
//! ]);
//! let ibm = PriceSeries::new("IBM", vec![PriceBar::new(d(4), 167.8, 169.9, 167.5, 169.3)]);
//!
//! let table = PriceTable::align(vec![aapl, ibm], FillPolicy::Missing).unwrap();
//! assert_eq!(table.n_days(), 2);
//! assert!(table.cell(1, 0).is_none()); // IBM has no bar on the 3rd
//! ```

#[cfg(feature = "cli")]
pub mod csv;
mod universe;

pub use universe::{default_universe, Company};

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// One daily OHLC record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading day.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Session high.
    pub high: f64,
    /// Session low.
    pub low: f64,
    /// Closing price.
    pub close: f64,
}

impl PriceBar {
    /// Create a bar.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
        }
    }

    /// The (open, close) pair the feature stage reads.
    pub fn session(&self) -> Session {
        Session {
            open: self.open,
            close: self.close,
        }
    }
}

/// Open and close of one symbol on one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opening price.
    pub open: f64,
    /// Closing price.
    pub close: f64,
}

impl Session {
    /// Daily movement: close minus open.
    pub fn movement(&self) -> f64 {
        self.close - self.open
    }
}

/// Date-ascending bars for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Ticker or other unique identifier.
    pub symbol: String,
    /// Daily bars.
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Create a series.
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// True when the series holds no bars.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// How gaps in a ragged series are reconciled onto the common index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Leave gaps as missing cells; the feature stage imputes zero movement.
    #[default]
    Missing,
    /// Repeat the last seen session. Gaps before a symbol's first bar stay missing.
    ForwardFill,
}

/// Symbols × trading days matrix of optional sessions.
///
/// Row `i` belongs to `symbols()[i]`, column `j` to `dates()[j]`. The table is
/// rectangular by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
    cells: Vec<Vec<Option<Session>>>,
}

impl PriceTable {
    /// Build a table from an already-aligned matrix.
    ///
    /// Fails on duplicate symbols, on rows whose width differs from the date
    /// index, and on infinite prices. A NaN open or close marks the cell as
    /// missing.
    pub fn new(
        symbols: Vec<String>,
        dates: Vec<NaiveDate>,
        cells: Vec<Vec<Option<Session>>>,
    ) -> Result<Self> {
        if symbols.len() != cells.len() {
            return Err(Error::DimensionMismatch {
                expected: symbols.len(),
                found: cells.len(),
            });
        }
        let mut seen = HashSet::with_capacity(symbols.len());
        for symbol in &symbols {
            if !seen.insert(symbol.as_str()) {
                return Err(Error::invalid(
                    "symbols",
                    format!("duplicate symbol {symbol}"),
                ));
            }
        }

        let mut cleaned = Vec::with_capacity(cells.len());
        for (row, values) in cells.into_iter().enumerate() {
            if values.len() != dates.len() {
                return Err(Error::DimensionMismatch {
                    expected: dates.len(),
                    found: values.len(),
                });
            }
            let mut out = Vec::with_capacity(values.len());
            for (col, cell) in values.into_iter().enumerate() {
                out.push(match cell {
                    Some(s) if s.open.is_infinite() || s.close.is_infinite() => {
                        return Err(Error::NonFinite { row, col });
                    }
                    Some(s) if s.open.is_nan() || s.close.is_nan() => None,
                    other => other,
                });
            }
            cleaned.push(out);
        }

        Ok(Self {
            symbols,
            dates,
            cells: cleaned,
        })
    }

    /// Reindex ragged series onto the sorted union of their dates.
    ///
    /// Symbols with no bars at all are dropped with a warning. Bars are sorted
    /// by date first; two bars on the same day for one symbol is an error.
    pub fn align(series: Vec<PriceSeries>, fill: FillPolicy) -> Result<Self> {
        let mut kept = Vec::with_capacity(series.len());
        for s in series {
            if s.is_empty() {
                warn!(symbol = %s.symbol, "no price data, dropping symbol");
                continue;
            }
            kept.push(s);
        }
        if kept.is_empty() {
            return Err(Error::EmptyInput);
        }

        let dates: Vec<NaiveDate> = kept
            .iter()
            .flat_map(|s| s.bars.iter().map(|b| b.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut symbols = Vec::with_capacity(kept.len());
        let mut cells = Vec::with_capacity(kept.len());
        for mut s in kept {
            s.bars.sort_by_key(|b| b.date);
            if let Some(pair) = s.bars.windows(2).find(|w| w[0].date == w[1].date) {
                return Err(Error::invalid(
                    "bars",
                    format!("{} has two bars on {}", s.symbol, pair[0].date),
                ));
            }

            let mut row = Vec::with_capacity(dates.len());
            let mut bars = s.bars.iter().peekable();
            let mut last: Option<Session> = None;
            for date in &dates {
                match bars.peek() {
                    Some(bar) if bar.date == *date => {
                        let session = bar.session();
                        row.push(Some(session));
                        last = Some(session);
                        bars.next();
                    }
                    _ => row.push(match fill {
                        FillPolicy::Missing => None,
                        FillPolicy::ForwardFill => last,
                    }),
                }
            }
            symbols.push(s.symbol);
            cells.push(row);
        }

        Self::new(symbols, dates, cells)
    }

    /// Symbols in row order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Common date index in column order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of symbols (rows).
    pub fn n_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// Number of trading days (columns).
    pub fn n_days(&self) -> usize {
        self.dates.len()
    }

    /// Session for `symbol_idx` on day `day_idx`, `None` when missing.
    pub fn cell(&self, symbol_idx: usize, day_idx: usize) -> Option<Session> {
        self.cells
            .get(symbol_idx)
            .and_then(|row| row.get(day_idx))
            .copied()
            .flatten()
    }

    /// Row of sessions for one symbol.
    pub fn row(&self, symbol_idx: usize) -> &[Option<Session>] {
        &self.cells[symbol_idx]
    }

    /// Count of missing cells over the whole table.
    pub fn missing_cells(&self) -> usize {
        self.cells
            .iter()
            .map(|row| row.iter().filter(|c| c.is_none()).count())
            .sum()
    }
}
