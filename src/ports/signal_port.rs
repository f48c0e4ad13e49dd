//! External per-instrument scalar source (rate differentials for carry ranking).

use std::collections::HashMap;

pub trait ScalarSource {
    fn scalar(&self, instrument: &str) -> Option<f64>;
}

/// Source with no data: every scalar is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScalars;

impl ScalarSource for NoScalars {
    fn scalar(&self, _instrument: &str) -> Option<f64> {
        None
    }
}

impl ScalarSource for HashMap<String, f64> {
    fn scalar(&self, instrument: &str) -> Option<f64> {
        self.get(instrument).copied()
    }
}
