//! Rebalancing strategy configuration.

use crate::domain::error::RebalancerError;
use crate::domain::schedule::Periodicity;
use crate::domain::selection::{LegSize, SelectionConfig};
use crate::domain::signal::SignalMetric;

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    /// Bars per window; windows hold `lookback + 1` closes.
    pub lookback: usize,
    pub metrics: Vec<SignalMetric>,
    pub selection: SelectionConfig,
    pub gross_exposure: f64,
    pub long_share: f64,
    pub holding_horizon: u32,
    pub minimum_trade_notional: f64,
    pub periodicity: Periodicity,
    /// Size each tranche with `gross_exposure / holding_horizon`, so the
    /// overlapping book never carries more than `gross_exposure`. When off,
    /// every tranche is sized at full gross and the book is levered
    /// `holding_horizon` times.
    pub split_across_tranches: bool,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy {
            name: "Cross-sectional momentum".into(),
            lookback: 21,
            metrics: vec![SignalMetric::TrailingReturn {
                span: 21,
                offset: 0,
            }],
            selection: SelectionConfig::default(),
            gross_exposure: 1.0,
            long_share: 0.5,
            holding_horizon: 1,
            minimum_trade_notional: 0.0,
            periodicity: Periodicity::Monthly,
            split_across_tranches: true,
        }
    }
}

impl Strategy {
    pub fn window_capacity(&self) -> usize {
        self.lookback + 1
    }

    /// Gross exposure carried by one newly opened tranche.
    pub fn tranche_gross(&self) -> f64 {
        if self.split_across_tranches {
            self.gross_exposure / self.holding_horizon as f64
        } else {
            self.gross_exposure
        }
    }

    pub fn validate(&self) -> Result<(), RebalancerError> {
        if self.lookback == 0 {
            return Err(RebalancerError::invalid(
                "signal",
                "lookback",
                "lookback must be positive",
            ));
        }
        if self.metrics.is_empty() {
            return Err(RebalancerError::missing("signal", "metric"));
        }
        for metric in &self.metrics {
            match metric {
                SignalMetric::TrailingReturn { span: 0, .. }
                | SignalMetric::RegressionSlope { span: 0 } => {
                    return Err(RebalancerError::invalid(
                        "signal",
                        "window_spans",
                        "window spans must be positive",
                    ));
                }
                _ => {}
            }
            if metric.required_history() > self.window_capacity() {
                return Err(RebalancerError::invalid(
                    "signal",
                    "window_spans",
                    format!(
                        "{} needs {} closes but lookback {} keeps {}",
                        metric,
                        metric.required_history(),
                        self.lookback,
                        self.window_capacity()
                    ),
                ));
            }
        }
        match self.selection.leg_size {
            LegSize::Count(0) => {
                return Err(RebalancerError::invalid(
                    "portfolio",
                    "leg_size",
                    "leg_size must be at least 1",
                ));
            }
            LegSize::Fraction(f) if !(f > 0.0 && f <= 0.5) => {
                return Err(RebalancerError::invalid(
                    "portfolio",
                    "leg_fraction",
                    "leg_fraction must be in (0, 0.5]",
                ));
            }
            _ => {}
        }
        if !(self.gross_exposure > 0.0) || !self.gross_exposure.is_finite() {
            return Err(RebalancerError::invalid(
                "portfolio",
                "gross_exposure",
                "gross_exposure must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.long_share) {
            return Err(RebalancerError::invalid(
                "portfolio",
                "long_share",
                "long_share must be between 0 and 1",
            ));
        }
        if self.holding_horizon == 0 {
            return Err(RebalancerError::invalid(
                "portfolio",
                "holding_horizon",
                "holding_horizon must be at least 1",
            ));
        }
        if !(self.minimum_trade_notional >= 0.0) {
            return Err(RebalancerError::invalid(
                "portfolio",
                "minimum_trade_notional",
                "minimum_trade_notional must be non-negative",
            ));
        }
        Ok(())
    }
}
