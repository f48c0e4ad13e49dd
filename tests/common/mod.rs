#![allow(dead_code)]

use chrono::NaiveDate;
pub use rebalancer::domain::bar::PriceBar;
use rebalancer::domain::error::RebalancerError;
use rebalancer::domain::execution::OrderIntent;
use rebalancer::ports::data_port::DataPort;
use rebalancer::ports::gateway_port::OrderGateway;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::process::ExitCode;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RebalancerError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(RebalancerError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(instrument)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date() >= start_date && b.date() <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_instruments(&self) -> Result<Vec<String>, RebalancerError> {
        let mut ids: Vec<String> = self.data.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RebalancerError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(RebalancerError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(instrument) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date()).min().unwrap();
                let max = bars.iter().map(|b| b.date()).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

/// Fills every accepted order in full; rejects instruments listed in `reject`.
#[derive(Default)]
pub struct RecordingGateway {
    pub positions: HashMap<String, f64>,
    pub submitted: Vec<OrderIntent>,
    pub reject: HashSet<String>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, instrument: &str, quantity: f64) -> Self {
        self.positions.insert(instrument.to_string(), quantity);
        self
    }

    pub fn rejecting(mut self, instrument: &str) -> Self {
        self.reject.insert(instrument.to_string());
        self
    }
}

impl OrderGateway for RecordingGateway {
    fn position(&self, instrument: &str) -> f64 {
        self.positions.get(instrument).copied().unwrap_or(0.0)
    }

    fn submit(&mut self, order: &OrderIntent) -> Result<(), RebalancerError> {
        if self.reject.contains(&order.instrument) {
            return Err(RebalancerError::OrderRejected {
                instrument: order.instrument.clone(),
                reason: "instrument halted".into(),
            });
        }
        *self.positions.entry(order.instrument.clone()).or_insert(0.0) += order.signed_quantity();
        self.submitted.push(order.clone());
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(instrument: &str, date: &str, close: f64) -> PriceBar {
    PriceBar::daily(
        instrument,
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        close,
    )
}

/// One daily bar per close, starting at `start`.
pub fn bars_from_closes(instrument: &str, start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            PriceBar::daily(instrument, start + chrono::Duration::days(i as i64), close)
        })
        .collect()
}

/// Daily bars with a constant per-bar drift.
pub fn generate_bars(
    instrument: &str,
    start_date: &str,
    count: usize,
    start_price: f64,
    step: f64,
) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    let closes: Vec<f64> = (0..count).map(|i| start_price + step * i as f64).collect();
    bars_from_closes(instrument, start, &closes)
}

pub fn by_instrument(series: Vec<Vec<PriceBar>>) -> BTreeMap<String, Vec<PriceBar>> {
    series
        .into_iter()
        .filter_map(|bars| {
            let id = bars.first()?.instrument.clone();
            Some((id, bars))
        })
        .collect()
}

pub fn is_success(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
