//! Deterministic historical replay.
//!
//! Bars from every instrument are merged into one timeline keyed by bar open
//! time. Each timestamp batch marks the paper account, then goes through
//! [`RebalanceEngine::on_bars`] so every instrument's close is in its window
//! before ranking. Equity is recorded after each batch.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use super::bar::PriceBar;
use super::engine::{Collaborators, CycleReport, RebalanceEngine};
use super::portfolio::{EquityPoint, Fill, FillConfig, PaperAccount};
use crate::ports::signal_port::ScalarSource;

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub fill: FillConfig,
}

#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub reports: Vec<CycleReport>,
    pub equity_curve: Vec<EquityPoint>,
    pub fills: Vec<Fill>,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub timestamps: usize,
}

pub fn build_unified_timeline(
    bars_by_instrument: &BTreeMap<String, Vec<PriceBar>>,
) -> Vec<NaiveDateTime> {
    let unique: BTreeSet<NaiveDateTime> = bars_by_instrument
        .values()
        .flat_map(|bars| bars.iter().map(|bar| bar.open_time))
        .collect();
    unique.into_iter().collect()
}

fn group_by_timestamp(
    bars_by_instrument: &BTreeMap<String, Vec<PriceBar>>,
) -> BTreeMap<NaiveDateTime, Vec<PriceBar>> {
    let mut batches: BTreeMap<NaiveDateTime, Vec<PriceBar>> = BTreeMap::new();
    for bars in bars_by_instrument.values() {
        for bar in bars {
            batches.entry(bar.open_time).or_default().push(bar.clone());
        }
    }
    batches
}

pub fn replay(
    bars_by_instrument: &BTreeMap<String, Vec<PriceBar>>,
    engine: &mut RebalanceEngine,
    account: &mut PaperAccount,
    scalars: &dyn ScalarSource,
) -> ReplayResult {
    let batches = group_by_timestamp(bars_by_instrument);
    let mut reports = Vec::new();

    for (timestamp, batch) in &batches {
        for bar in batch.iter().filter(|b| b.is_finished) {
            account.mark(&bar.instrument, bar.close);
        }
        account.set_clock(timestamp.date());

        let equity = account.equity();
        let mut collaborators = Collaborators {
            gateway: &mut *account,
            equity: &equity,
            scalars,
        };
        if let Some(report) = engine.on_bars(batch, &mut collaborators) {
            reports.push(report);
        }
        account.record_equity(timestamp.date());
    }

    let final_equity = account.equity();
    info!(
        timestamps = batches.len(),
        cycles = reports.len(),
        fills = account.fills.len(),
        final_equity,
        "replay complete"
    );

    ReplayResult {
        reports,
        equity_curve: account.equity_curve.clone(),
        fills: account.fills.clone(),
        initial_capital: account.initial_capital,
        final_equity,
        timestamps: batches.len(),
    }
}
