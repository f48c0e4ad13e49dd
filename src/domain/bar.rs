//! Price bar representation delivered by the market-data feed.

use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub instrument: String,
    pub open_time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub is_finished: bool,
}

impl PriceBar {
    /// Finished daily bar opening at midnight, the shape the CSV feed produces.
    pub fn daily(instrument: &str, date: NaiveDate, close: f64) -> Self {
        PriceBar {
            instrument: instrument.to_string(),
            open_time: date.and_time(chrono::NaiveTime::MIN),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            is_finished: true,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.open_time.date()
    }

    /// A close the rolling windows may store: finite and strictly positive.
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> PriceBar {
        PriceBar::daily("EURUSD", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), 1.09)
    }

    #[test]
    fn daily_bar_is_finished_at_midnight() {
        let bar = sample_bar();
        assert!(bar.is_finished);
        assert_eq!(bar.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(bar.open_time.time(), chrono::NaiveTime::MIN);
    }

    #[test]
    fn valid_close() {
        assert!(sample_bar().has_valid_close());
    }

    #[test]
    fn zero_negative_and_nan_closes_are_invalid() {
        let mut bar = sample_bar();
        bar.close = 0.0;
        assert!(!bar.has_valid_close());
        bar.close = -1.0;
        assert!(!bar.has_valid_close());
        bar.close = f64::NAN;
        assert!(!bar.has_valid_close());
        bar.close = f64::INFINITY;
        assert!(!bar.has_valid_close());
    }
}
