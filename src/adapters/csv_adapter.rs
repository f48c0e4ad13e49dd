//! CSV file market-data adapter.
//!
//! One file per instrument, `<INSTRUMENT>.csv`, with a header row:
//! `date,open,high,low,close,volume`. The first column may hold a plain date
//! (bar opens at midnight) or a `YYYY-MM-DD HH:MM:SS` timestamp.

use crate::domain::bar::PriceBar;
use crate::domain::error::RebalancerError;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{instrument}.csv"))
    }

    fn read_all(&self, instrument: &str) -> Result<Vec<PriceBar>, RebalancerError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RebalancerError::NoData {
                instrument: instrument.to_string(),
            },
            _ => RebalancerError::Data {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| RebalancerError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let row = line + 2;

            let timestamp = record.get(0).ok_or_else(|| RebalancerError::Data {
                reason: format!("{}:{row}: missing date column", path.display()),
            })?;
            let open_time = parse_timestamp(timestamp.trim()).ok_or_else(|| RebalancerError::Data {
                reason: format!("{}:{row}: invalid date '{timestamp}'", path.display()),
            })?;

            let field = |index: usize, name: &str| -> Result<f64, RebalancerError> {
                record
                    .get(index)
                    .ok_or_else(|| RebalancerError::Data {
                        reason: format!("{}:{row}: missing {name} column", path.display()),
                    })?
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| RebalancerError::Data {
                        reason: format!("{}:{row}: invalid {name} value: {e}", path.display()),
                    })
            };

            bars.push(PriceBar {
                instrument: instrument.to_string(),
                open_time,
                open: field(1, "open")?,
                high: field(2, "high")?,
                low: field(3, "low")?,
                close: field(4, "close")?,
                volume: field(5, "volume")?,
                is_finished: true,
            });
        }

        bars.sort_by_key(|b| b.open_time);
        Ok(bars)
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RebalancerError> {
        let mut bars = self.read_all(instrument)?;
        bars.retain(|b| (start_date..=end_date).contains(&b.date()));
        Ok(bars)
    }

    fn list_instruments(&self) -> Result<Vec<String>, RebalancerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| RebalancerError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RebalancerError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(id) = name.to_string_lossy().strip_suffix(".csv") {
                instruments.push(id.to_string());
            }
        }

        instruments.sort();
        Ok(instruments)
    }

    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RebalancerError> {
        let bars = match self.read_all(instrument) {
            Ok(bars) => bars,
            Err(RebalancerError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date(), last.date(), bars.len())),
            _ => None,
        })
    }
}
