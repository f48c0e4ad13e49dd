//! Paper account: an in-memory order gateway and equity source for replay.
//!
//! Orders fill immediately at the latest mark adjusted for slippage:
//!   buy  price = mark * (1 + slippage_pct / 100)
//!   sell price = mark * (1 - slippage_pct / 100)
//! Commission = commission_per_trade + notional * commission_pct / 100.
//! Equity = cash + sum(quantity * mark).

use chrono::NaiveDate;
use std::collections::HashMap;

use super::error::RebalancerError;
use super::execution::{OrderIntent, Side};
use super::position::Position;
use crate::ports::gateway_port::OrderGateway;

#[derive(Debug, Clone, PartialEq)]
pub struct FillConfig {
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl Default for FillConfig {
    fn default() -> Self {
        FillConfig {
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
        }
    }
}

pub fn calculate_commission(notional: f64, config: &FillConfig) -> f64 {
    config.commission_per_trade + (notional * config.commission_pct / 100.0)
}

pub fn apply_slippage(mark: f64, side: Side, slippage_pct: f64) -> f64 {
    match side {
        Side::Buy => mark * (1.0 + slippage_pct / 100.0),
        Side::Sell => mark * (1.0 - slippage_pct / 100.0),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub date: Option<NaiveDate>,
    pub instrument: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct PaperAccount {
    pub cash: f64,
    pub initial_capital: f64,
    pub config: FillConfig,
    pub positions: HashMap<String, Position>,
    pub marks: HashMap<String, f64>,
    pub fills: Vec<Fill>,
    pub equity_curve: Vec<EquityPoint>,
    clock: Option<NaiveDate>,
}

impl PaperAccount {
    pub fn new(initial_capital: f64, config: FillConfig) -> Self {
        PaperAccount {
            cash: initial_capital,
            initial_capital,
            config,
            positions: HashMap::new(),
            marks: HashMap::new(),
            fills: Vec::new(),
            equity_curve: Vec::new(),
            clock: None,
        }
    }

    pub fn set_clock(&mut self, date: NaiveDate) {
        self.clock = Some(date);
    }

    pub fn mark(&mut self, instrument: &str, price: f64) {
        if price.is_finite() && price > 0.0 {
            self.marks.insert(instrument.to_string(), price);
        }
    }

    pub fn get_position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.values().filter(|p| !p.is_flat()).count()
    }

    /// Cash plus marked value of open positions. Positions without a mark count at zero.
    pub fn equity(&self) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .filter_map(|pos| {
                self.marks
                    .get(&pos.instrument)
                    .map(|&mark| pos.market_value(mark))
            })
            .sum();
        self.cash + position_value
    }

    pub fn record_equity(&mut self, date: NaiveDate) {
        let equity = self.equity();
        self.equity_curve.push(EquityPoint { date, equity });
    }

    pub fn realized_pnl(&self) -> f64 {
        self.fills.iter().map(|f| f.realized_pnl).sum()
    }

    pub fn total_commission(&self) -> f64 {
        self.fills.iter().map(|f| f.commission).sum()
    }
}

impl OrderGateway for PaperAccount {
    fn position(&self, instrument: &str) -> f64 {
        self.positions
            .get(instrument)
            .map(|p| p.quantity)
            .unwrap_or(0.0)
    }

    fn submit(&mut self, order: &OrderIntent) -> Result<(), RebalancerError> {
        if !(order.quantity > 0.0) || !order.quantity.is_finite() {
            return Err(RebalancerError::OrderRejected {
                instrument: order.instrument.clone(),
                reason: format!("invalid quantity {}", order.quantity),
            });
        }
        let mark = *self.marks.get(&order.instrument).ok_or_else(|| {
            RebalancerError::OrderRejected {
                instrument: order.instrument.clone(),
                reason: "no market price".into(),
            }
        })?;

        let price = apply_slippage(mark, order.side, self.config.slippage_pct);
        let notional = order.quantity * price;
        let commission = calculate_commission(notional, &self.config);

        match order.side {
            Side::Buy => self.cash -= notional + commission,
            Side::Sell => self.cash += notional - commission,
        }

        let position = self
            .positions
            .entry(order.instrument.clone())
            .or_insert_with(|| Position::flat(&order.instrument));
        let realized = position.apply_fill(order.signed_quantity(), price);

        self.fills.push(Fill {
            date: self.clock,
            instrument: order.instrument.clone(),
            side: order.side,
            quantity: order.quantity,
            price,
            commission,
            realized_pnl: realized - commission,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn order(instrument: &str, side: Side, quantity: f64) -> OrderIntent {
        OrderIntent {
            instrument: instrument.to_string(),
            side,
            quantity,
            price: 0.0,
            notional: 0.0,
        }
    }

    #[test]
    fn new_account() {
        let account = PaperAccount::new(100_000.0, FillConfig::default());
        assert_relative_eq!(account.cash, 100_000.0);
        assert_relative_eq!(account.equity(), 100_000.0);
        assert!(account.positions.is_empty());
        assert!(account.fills.is_empty());
    }

    #[test]
    fn commission_and_slippage() {
        let config = FillConfig {
            commission_per_trade: 10.0,
            commission_pct: 0.1,
            slippage_pct: 0.05,
        };
        assert_relative_eq!(calculate_commission(10_000.0, &config), 20.0);
        assert_relative_eq!(apply_slippage(100.0, Side::Buy, 0.05), 100.05, epsilon = 1e-9);
        assert_relative_eq!(apply_slippage(100.0, Side::Sell, 0.05), 99.95, epsilon = 1e-9);
    }

    #[test]
    fn buy_fills_at_mark_and_keeps_equity() {
        let mut account = PaperAccount::new(10_000.0, FillConfig::default());
        account.mark("A", 50.0);
        account.submit(&order("A", Side::Buy, 100.0)).unwrap();

        assert_relative_eq!(account.cash, 5_000.0);
        assert_relative_eq!(account.position("A"), 100.0);
        assert_relative_eq!(account.equity(), 10_000.0);

        account.mark("A", 60.0);
        assert_relative_eq!(account.equity(), 11_000.0);
    }

    #[test]
    fn short_sale_credits_cash() {
        let mut account = PaperAccount::new(10_000.0, FillConfig::default());
        account.mark("B", 20.0);
        account.submit(&order("B", Side::Sell, 50.0)).unwrap();

        assert_relative_eq!(account.cash, 11_000.0);
        assert_relative_eq!(account.position("B"), -50.0);
        assert_relative_eq!(account.equity(), 10_000.0);

        account.mark("B", 18.0);
        assert_relative_eq!(account.equity(), 10_100.0);
    }

    #[test]
    fn round_trip_realizes_pnl_net_of_commission() {
        let config = FillConfig {
            commission_per_trade: 1.0,
            ..Default::default()
        };
        let mut account = PaperAccount::new(10_000.0, config);
        account.set_clock(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        account.mark("A", 10.0);
        account.submit(&order("A", Side::Buy, 10.0)).unwrap();
        account.mark("A", 12.0);
        account.submit(&order("A", Side::Sell, 10.0)).unwrap();

        assert_relative_eq!(account.position("A"), 0.0);
        assert_relative_eq!(account.realized_pnl(), 20.0 - 2.0);
        assert_relative_eq!(account.total_commission(), 2.0);
        assert_relative_eq!(account.equity(), 10_018.0);
        assert_eq!(account.fills.len(), 2);
        assert_eq!(account.fills[0].date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(account.open_position_count(), 0);
    }

    #[test]
    fn order_without_mark_is_rejected() {
        let mut account = PaperAccount::new(10_000.0, FillConfig::default());
        let err = account.submit(&order("Z", Side::Buy, 1.0)).unwrap_err();
        assert!(matches!(err, RebalancerError::OrderRejected { instrument, .. } if instrument == "Z"));
        assert!(account.fills.is_empty());
        assert_relative_eq!(account.cash, 10_000.0);
    }

    #[test]
    fn invalid_quantity_is_rejected() {
        let mut account = PaperAccount::new(10_000.0, FillConfig::default());
        account.mark("A", 10.0);
        assert!(account.submit(&order("A", Side::Buy, 0.0)).is_err());
        assert!(account.submit(&order("A", Side::Buy, f64::NAN)).is_err());
    }

    #[test]
    fn invalid_marks_are_ignored() {
        let mut account = PaperAccount::new(1_000.0, FillConfig::default());
        account.mark("A", 0.0);
        account.mark("A", f64::NAN);
        assert!(account.marks.is_empty());
    }

    #[test]
    fn record_equity_appends_point() {
        let mut account = PaperAccount::new(1_000.0, FillConfig::default());
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        account.record_equity(date);
        assert_eq!(account.equity_curve, vec![EquityPoint { date, equity: 1_000.0 }]);
    }
}
