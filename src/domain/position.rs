//! Signed position tracking for the paper account.

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub instrument: String,
    pub quantity: f64,
    pub average_price: f64,
}

impl Position {
    pub fn flat(instrument: &str) -> Self {
        Position {
            instrument: instrument.to_string(),
            quantity: 0.0,
            average_price: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0.0
    }

    /// Signed value at `price`: negative for shorts.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.average_price)
    }

    /// Apply a signed fill and return the PnL realized by the reducing part.
    ///
    /// Adding to a position moves the average price; reducing realizes PnL at
    /// the old average; crossing through zero opens the remainder at `price`.
    pub fn apply_fill(&mut self, signed_qty: f64, price: f64) -> f64 {
        if signed_qty == 0.0 {
            return 0.0;
        }

        let same_direction = self.quantity == 0.0 || self.quantity.signum() == signed_qty.signum();
        if same_direction {
            let new_qty = self.quantity + signed_qty;
            self.average_price =
                (self.quantity * self.average_price + signed_qty * price) / new_qty;
            self.quantity = new_qty;
            return 0.0;
        }

        let closing = signed_qty.abs().min(self.quantity.abs());
        let realized = closing * self.quantity.signum() * (price - self.average_price);
        let new_qty = self.quantity + signed_qty;

        if new_qty == 0.0 || new_qty.signum() == self.quantity.signum() {
            self.quantity = new_qty;
            if new_qty == 0.0 {
                self.average_price = 0.0;
            }
        } else {
            self.quantity = new_qty;
            self.average_price = price;
        }
        realized
    }
}
