//! Long-format CSV price loading.
//!
//! Expected header: `symbol,date,open,high,low,close`, one row per symbol and
//! day, dates as `YYYY-MM-DD`. Rows may be in any order.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use super::{PriceBar, PriceSeries};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct Row {
    symbol: String,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Read series from any reader. Symbols keep their first-seen order.
pub fn read_series<R: Read>(reader: R) -> Result<Vec<PriceSeries>> {
    let mut rdr = ::csv::ReaderBuilder::new().trim(::csv::Trim::All).from_reader(reader);
    let mut order: Vec<PriceSeries> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in rdr.deserialize::<Row>() {
        let row = record.map_err(|e| Error::Parse {
            line: e.position().map(|p| p.line() as usize).unwrap_or(0),
            message: e.to_string(),
        })?;
        let bar = PriceBar::new(row.date, row.open, row.high, row.low, row.close);
        match index.get(&row.symbol) {
            Some(&i) => order[i].bars.push(bar),
            None => {
                index.insert(row.symbol.clone(), order.len());
                order.push(PriceSeries::new(row.symbol, vec![bar]));
            }
        }
    }

    Ok(order)
}

/// Read series from a file.
pub fn read_series_path(path: impl AsRef<Path>) -> Result<Vec<PriceSeries>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_series(file)
}
