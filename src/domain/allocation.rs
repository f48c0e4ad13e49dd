//! Equal-weight allocation across the long and short legs.
//!
//! long weight  = +gross * long_share / |long|
//! short weight = -gross * (1 - long_share) / |short|
//!
//! A lone leg keeps its own share of gross exposure; it is never scaled up.

use std::collections::BTreeMap;

use crate::domain::selection::LegSelection;

pub type TargetWeights = BTreeMap<String, f64>;

pub fn allocate(selection: &LegSelection, gross_exposure: f64, long_share: f64) -> TargetWeights {
    let mut weights = TargetWeights::new();

    if !selection.long.is_empty() {
        let w = gross_exposure * long_share / selection.long.len() as f64;
        for id in &selection.long.members {
            weights.insert(id.clone(), w);
        }
    }

    if !selection.short.is_empty() {
        let w = -gross_exposure * (1.0 - long_share) / selection.short.len() as f64;
        for id in &selection.short.members {
            weights.insert(id.clone(), w);
        }
    }

    weights
}

pub fn gross(weights: &TargetWeights) -> f64 {
    weights.values().map(|w| w.abs()).sum()
}

pub fn net(weights: &TargetWeights) -> f64 {
    weights.values().sum()
}
