use crate::db::models::TickerSeries;
use crate::error::StockError;
use std::{fs, path::Path};
use tracing::info;

/// Sample dataset compiled into the binary.
pub const BUNDLED_TICKER_VALUES: &str = include_str!("../../data/ticker_values.json");

/// Load ticker series from a JSON file, or the bundled sample when `path` is `None`.
pub fn load(path: Option<&Path>) -> Result<Vec<TickerSeries>, StockError> {
    match path {
        Some(path) => load_from_file(path),
        None => parse(BUNDLED_TICKER_VALUES),
    }
}

pub fn load_from_file(path: &Path) -> Result<Vec<TickerSeries>, StockError> {
    let contents = fs::read_to_string(path)?;
    let series = parse(&contents)?;
    info!(path = %path.display(), count = series.len(), "ticker file loaded");
    Ok(series)
}

fn parse(contents: &str) -> Result<Vec<TickerSeries>, StockError> {
    let series: Vec<TickerSeries> = serde_json::from_str(contents)?;
    Ok(series)
}
