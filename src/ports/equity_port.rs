//! Equity source port.

/// Supplies the account equity read once per rebalance cycle.
pub trait EquitySource {
    /// `None` when equity is unknown.
    fn current_equity(&self) -> Option<f64>;
}

impl EquitySource for f64 {
    fn current_equity(&self) -> Option<f64> {
        Some(*self)
    }
}

impl EquitySource for Option<f64> {
    fn current_equity(&self) -> Option<f64> {
        *self
    }
}
