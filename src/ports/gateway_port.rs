//! Order gateway port.

use crate::domain::error::RebalancerError;
use crate::domain::execution::OrderIntent;

/// Accepts market orders and reports the aggregate signed position per instrument.
pub trait OrderGateway {
    fn position(&self, instrument: &str) -> f64;

    fn submit(&mut self, order: &OrderIntent) -> Result<(), RebalancerError>;
}
