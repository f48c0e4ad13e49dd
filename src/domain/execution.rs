//! Order sizing and the minimum-notional execution gate.
//!
//! target_qty = target_weight * equity / latest_price
//! delta      = target_qty - current_position
//! notional   = |delta| * latest_price
//!
//! No order when the price is not positive or notional < minimum_trade_notional.
//! This is the only place order intents are created.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A market order request.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub instrument: String,
    pub side: Side,
    /// Always positive.
    pub quantity: f64,
    pub price: f64,
    pub notional: f64,
}

impl OrderIntent {
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionGate {
    pub minimum_trade_notional: f64,
}

impl ExecutionGate {
    pub fn new(minimum_trade_notional: f64) -> Self {
        ExecutionGate {
            minimum_trade_notional,
        }
    }

    pub fn target_quantity(target_weight: f64, equity: f64, latest_price: f64) -> Option<f64> {
        if !(latest_price > 0.0) || !latest_price.is_finite() {
            return None;
        }
        let qty = target_weight * equity / latest_price;
        qty.is_finite().then_some(qty)
    }

    pub fn resolve(
        &self,
        instrument: &str,
        target_weight: f64,
        equity: f64,
        latest_price: f64,
        current_position: f64,
    ) -> Option<OrderIntent> {
        let target = Self::target_quantity(target_weight, equity, latest_price)?;
        self.resolve_quantity(instrument, target, latest_price, current_position)
    }

    /// Order moving `current_position` to `target_quantity`.
    ///
    /// Zero-quantity orders are never emitted: a zero delta yields `None` even
    /// when `minimum_trade_notional` is 0.
    pub fn resolve_quantity(
        &self,
        instrument: &str,
        target_quantity: f64,
        latest_price: f64,
        current_position: f64,
    ) -> Option<OrderIntent> {
        if !(latest_price > 0.0) || !latest_price.is_finite() {
            return None;
        }
        let delta = target_quantity - current_position;
        if !delta.is_finite() || delta == 0.0 {
            return None;
        }
        let quantity = delta.abs();
        let notional = quantity * latest_price;
        if notional < self.minimum_trade_notional {
            return None;
        }
        Some(OrderIntent {
            instrument: instrument.to_string(),
            side: if delta > 0.0 { Side::Buy } else { Side::Sell },
            quantity,
            price: latest_price,
            notional,
        })
    }
}
