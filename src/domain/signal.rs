//! Ranking metrics computed from rolling windows.
//!
//! TrailingReturn(span, offset) = (P[t-offset] - P[t-offset-span]) / P[t-offset-span]
//! RegressionSlope(span)        = OLS slope of ln(P) over the newest span + 1 closes
//! ExternalScalar               = value supplied by a ScalarSource
//!
//! A zero, negative or missing reference price makes the metric unavailable.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::universe::Universe;
use crate::domain::window::{PriceHistoryStore, PriceWindow};
use crate::ports::signal_port::ScalarSource;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalMetric {
    TrailingReturn { span: usize, offset: usize },
    RegressionSlope { span: usize },
    ExternalScalar,
}

impl SignalMetric {
    /// Closes a window must hold for this metric to be computable.
    pub fn required_history(&self) -> usize {
        match self {
            SignalMetric::TrailingReturn { span, offset } => span + offset + 1,
            SignalMetric::RegressionSlope { span } => span + 1,
            SignalMetric::ExternalScalar => 0,
        }
    }
}

impl fmt::Display for SignalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalMetric::TrailingReturn { span, offset: 0 } => write!(f, "RETURN({span})"),
            SignalMetric::TrailingReturn { span, offset } => {
                write!(f, "RETURN({span}, skip {offset})")
            }
            SignalMetric::RegressionSlope { span } => write!(f, "SLOPE({span})"),
            SignalMetric::ExternalScalar => write!(f, "EXTERNAL"),
        }
    }
}

/// One value per configured metric, in configuration order.
pub type SignalValue = Vec<Option<f64>>;

pub fn compute(
    metric: &SignalMetric,
    instrument: &str,
    window: &PriceWindow,
    scalars: &dyn ScalarSource,
) -> Option<f64> {
    let value = match *metric {
        SignalMetric::TrailingReturn { span, offset } => trailing_return(window, span, offset),
        SignalMetric::RegressionSlope { span } => regression_slope(window, span),
        SignalMetric::ExternalScalar => scalars.scalar(instrument),
    }?;
    value.is_finite().then_some(value)
}

pub fn trailing_return(window: &PriceWindow, span: usize, offset: usize) -> Option<f64> {
    if span == 0 {
        return None;
    }
    let current = window.back(offset)?;
    let reference = window.back(offset + span)?;
    if reference <= 0.0 {
        return None;
    }
    Some((current - reference) / reference)
}

pub fn regression_slope(window: &PriceWindow, span: usize) -> Option<f64> {
    if span == 0 {
        return None;
    }
    let n = span + 1;
    if window.len() < n {
        return None;
    }

    let mut logs = Vec::with_capacity(n);
    for offset in (0..n).rev() {
        let price = window.back(offset)?;
        if price <= 0.0 {
            return None;
        }
        logs.push(price.ln());
    }

    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = logs.iter().sum::<f64>() / n_f;
    let mut cov = 0.0;
    let mut var = 0.0;
    for (i, y) in logs.iter().enumerate() {
        let dx = i as f64 - mean_x;
        cov += dx * (y - mean_y);
        var += dx * dx;
    }
    Some(cov / var)
}

/// Instrument id -> one value per metric, for every instrument that can be ranked.
pub type SignalTable = BTreeMap<String, Vec<f64>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSummary {
    pub table: SignalTable,
    pub insufficient_history: Vec<String>,
    pub unavailable: Vec<String>,
}

/// Evaluate every metric for each tradable instrument with a full window.
///
/// Instruments with a partial window or any unavailable metric are left out
/// of the table and listed in the summary instead.
pub fn compute_signals(
    metrics: &[SignalMetric],
    universe: &Universe,
    store: &PriceHistoryStore,
    scalars: &dyn ScalarSource,
) -> SignalSummary {
    let mut summary = SignalSummary::default();

    for id in universe.tradable_ids() {
        let window = match store.snapshot(id) {
            Some(w) if w.is_full() => w,
            _ => {
                summary.insufficient_history.push(id.to_string());
                continue;
            }
        };

        let values: SignalValue = metrics
            .iter()
            .map(|m| compute(m, id, window, scalars))
            .collect();

        match values.into_iter().collect::<Option<Vec<f64>>>() {
            Some(v) => {
                summary.table.insert(id.to_string(), v);
            }
            None => summary.unavailable.push(id.to_string()),
        }
    }

    summary
}
