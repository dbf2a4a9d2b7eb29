//! CSV file market data adapter.
//!
//! Expected columns: `timestamp,open,high,low,close,volume`, with a header
//! row. The timestamp is Unix seconds or RFC 3339. Empty or unparseable
//! price fields are passed through as missing so the domain can filter the
//! bar; rows without a usable timestamp are skipped here.

use crate::domain::candle::RawCandle;
use crate::domain::error::StuntmanError;
use crate::ports::data_port::MarketDataPort;
use chrono::DateTime;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    /// `path` is either a CSV file or a directory holding `<SYMBOL>.csv`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{}.csv", symbol))
        } else {
            self.path.clone()
        }
    }
}

fn parse_timestamp(field: &str) -> Option<i64> {
    let field = field.trim();
    field
        .parse::<i64>()
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(field).ok().map(|t| t.timestamp()))
}

fn parse_price(field: Option<&str>) -> Option<f64> {
    field.and_then(|f| f.trim().parse::<f64>().ok())
}

impl MarketDataPort for CsvAdapter {
    fn fetch_candles(&self, symbol: &str) -> Result<Vec<RawCandle>, StuntmanError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| StuntmanError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();
        let mut skipped = 0usize;

        for result in rdr.records() {
            let record = result.map_err(|e| StuntmanError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let Some(timestamp) = record.get(0).and_then(parse_timestamp) else {
                skipped += 1;
                continue;
            };

            bars.push(RawCandle {
                timestamp,
                open: parse_price(record.get(1)),
                high: parse_price(record.get(2)),
                low: parse_price(record.get(3)),
                close: parse_price(record.get(4)),
                volume: parse_price(record.get(5)),
            });
        }

        if skipped > 0 {
            tracing::warn!(symbol, skipped, "rows without a usable timestamp skipped");
        }
        tracing::debug!(symbol, rows = bars.len(), path = %path.display(), "candles loaded");
        Ok(bars)
    }
}
