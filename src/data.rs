//! Price data loading for the backtest engine.

use crate::error::{BacktestError, Result};
use crate::types::PairSeries;
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{info, warn};

/// Find the price column: first header containing "close" or "price",
/// case-insensitive.
fn price_column(headers: &csv::StringRecord) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.to_ascii_lowercase();
        h.contains("close") || h.contains("price")
    })
}

/// Load one daily price series from a CSV file.
///
/// The file must have headers; the price column is the first whose name
/// contains "close" or "price" (case-insensitive). Rows whose price fails
/// to parse or is not strictly positive are skipped with a warning.
pub fn load_price_series(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    info!("loading prices from {}", path.display());

    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = price_column(&headers).ok_or_else(|| {
        BacktestError::DataError(format!(
            "no close/price column in {} (headers: {:?})",
            path.display(),
            headers
        ))
    })?;

    let mut prices = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = record.get(column).unwrap_or("");
        match field.trim().parse::<f64>() {
            Ok(price) if price.is_finite() && price > 0.0 => prices.push(price),
            _ => {
                warn!(
                    row = row + 1,
                    value = field,
                    "skipping row with unusable price"
                );
            }
        }
    }

    if prices.is_empty() {
        return Err(BacktestError::NoData);
    }

    info!(observations = prices.len(), "loaded price series");
    Ok(prices)
}

/// Align two price series into one validated [`PairSeries`].
///
/// When the series differ in length both are truncated to the shorter
/// one, dropping the excess tail.
pub fn align_pair(
    mut prices_a: Vec<f64>,
    mut prices_b: Vec<f64>,
    symbol_a: impl Into<String>,
    symbol_b: impl Into<String>,
) -> Result<PairSeries> {
    let aligned = prices_a.len().min(prices_b.len());
    if prices_a.len() != prices_b.len() {
        warn!(
            len_a = prices_a.len(),
            len_b = prices_b.len(),
            aligned,
            "price series lengths differ, truncating to shorter"
        );
        prices_a.truncate(aligned);
        prices_b.truncate(aligned);
    }

    PairSeries::new(symbol_a, symbol_b, prices_a, prices_b)
}

/// Load and align two price files into one [`PairSeries`].
pub fn load_pair(
    path_a: impl AsRef<Path>,
    path_b: impl AsRef<Path>,
    symbol_a: impl Into<String>,
    symbol_b: impl Into<String>,
) -> Result<PairSeries> {
    let prices_a = load_price_series(path_a)?;
    let prices_b = load_price_series(path_b)?;
    align_pair(prices_a, prices_b, symbol_a, symbol_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_close_column() {
        let file = csv_file("date,open,close\n2024-01-01,99.0,100.5\n2024-01-02,100.0,101.25\n");
        let prices = load_price_series(file.path()).unwrap();
        assert_eq!(prices, vec![100.5, 101.25]);
    }

    #[test]
    fn test_price_column_is_case_insensitive() {
        let file = csv_file("Date,Adj Close\n2024-01-01,50.0\n");
        let prices = load_price_series(file.path()).unwrap();
        assert_eq!(prices, vec![50.0]);
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let file = csv_file("date,price\na,100.0\nb,\nc,-5.0\nd,abc\ne,101.0\n");
        let prices = load_price_series(file.path()).unwrap();
        assert_eq!(prices, vec![100.0, 101.0]);
    }

    #[test]
    fn test_missing_price_column_errors() {
        let file = csv_file("date,open,high\n2024-01-01,1.0,2.0\n");
        assert!(matches!(
            load_price_series(file.path()),
            Err(BacktestError::DataError(_))
        ));
    }

    #[test]
    fn test_all_rows_unusable_is_no_data() {
        let file = csv_file("date,close\na,\nb,zero\n");
        assert!(matches!(
            load_price_series(file.path()),
            Err(BacktestError::NoData)
        ));
    }

    #[test]
    fn test_align_pair_truncates_to_shorter() {
        let pair = align_pair(
            vec![100.0, 101.0, 102.0],
            vec![50.0, 51.0],
            "AAA",
            "BBB",
        )
        .unwrap();
        assert_eq!(pair.len(), 2);
        assert_eq!(pair.prices_a, vec![100.0, 101.0]);
    }

    #[test]
    fn test_load_pair_truncates_to_shorter() {
        let file_a = csv_file("date,close\n1,100.0\n2,101.0\n3,102.0\n");
        let file_b = csv_file("date,close\n1,50.0\n2,51.0\n");

        let pair = load_pair(file_a.path(), file_b.path(), "AAA", "BBB").unwrap();
        assert_eq!(pair.len(), 2);
        assert_eq!(pair.prices_a, vec![100.0, 101.0]);
        assert_eq!(pair.prices_b, vec![50.0, 51.0]);
    }
}
