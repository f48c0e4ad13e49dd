//! Rebalance engine: per-bar callback and the cycle pipeline.
//!
//! bar -> window append -> scheduler -> signals -> legs -> weights
//!     -> age/expire tranches -> open tranche -> gate orders per instrument
//!
//! Single-threaded and synchronous. Collaborators are borrowed per call, so
//! the engine never holds on to the gateway or data sources.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::domain::allocation::{TargetWeights, allocate};
use crate::domain::bar::PriceBar;
use crate::domain::error::RebalancerError;
use crate::domain::execution::{ExecutionGate, OrderIntent};
use crate::domain::schedule::{PeriodCalendar, RebalanceScheduler};
use crate::domain::selection::select;
use crate::domain::signal::compute_signals;
use crate::domain::strategy::Strategy;
use crate::domain::tranche::TrancheBook;
use crate::domain::universe::Universe;
use crate::domain::window::PriceHistoryStore;
use crate::ports::equity_port::EquitySource;
use crate::ports::gateway_port::OrderGateway;
use crate::ports::signal_port::ScalarSource;

/// External services consulted during a cycle.
pub struct Collaborators<'a> {
    pub gateway: &'a mut dyn OrderGateway,
    pub equity: &'a dyn EquitySource,
    pub scalars: &'a dyn ScalarSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOrder {
    pub order: OrderIntent,
    pub reason: String,
}

/// Outcome of one fired rebalance cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub date: NaiveDate,
    pub ranked: usize,
    pub long: Vec<String>,
    pub short: Vec<String>,
    pub weights: TargetWeights,
    pub opened_tranche: Option<u64>,
    pub closed_tranches: Vec<u64>,
    pub orders: Vec<OrderIntent>,
    pub suppressed: usize,
    pub rejected: Vec<RejectedOrder>,
    /// Equity was unavailable, so no tranche was opened or resized.
    pub sizing_skipped: bool,
}

impl CycleReport {
    pub fn traded_notional(&self) -> f64 {
        self.orders.iter().map(|o| o.notional).sum()
    }
}

#[derive(Debug)]
pub struct RebalanceEngine {
    strategy: Strategy,
    universe: Universe,
    store: PriceHistoryStore,
    scheduler: RebalanceScheduler,
    tranches: TrancheBook,
    gate: ExecutionGate,
    // Instruments with no live tranche whose position has not reached zero yet.
    pending_flatten: BTreeSet<String>,
    cycle: u64,
}

impl RebalanceEngine {
    pub fn new(strategy: Strategy, universe: Universe) -> Result<Self, RebalancerError> {
        strategy.validate()?;
        if universe.count() == 0 {
            return Err(RebalancerError::EmptyUniverse);
        }
        if universe.tradable_ids().next().is_none() {
            return Err(RebalancerError::invalid(
                "universe",
                "untradable",
                "no tradable instruments left",
            ));
        }

        info!(
            strategy = %strategy.name,
            instruments = universe.count(),
            lookback = strategy.lookback,
            periodicity = %strategy.periodicity,
            holding_horizon = strategy.holding_horizon,
            "rebalance engine ready"
        );

        Ok(RebalanceEngine {
            store: PriceHistoryStore::new(universe.ids(), strategy.window_capacity()),
            scheduler: RebalanceScheduler::new(strategy.periodicity),
            tranches: TrancheBook::new(strategy.holding_horizon),
            gate: ExecutionGate::new(strategy.minimum_trade_notional),
            pending_flatten: BTreeSet::new(),
            cycle: 0,
            strategy,
            universe,
        })
    }

    /// Replace the built-in periodicity with a custom calendar.
    pub fn with_calendar(mut self, calendar: Box<dyn PeriodCalendar>) -> Self {
        self.scheduler = RebalanceScheduler::with_calendar(calendar);
        self
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn store(&self) -> &PriceHistoryStore {
        &self.store
    }

    pub fn tranches(&self) -> &TrancheBook {
        &self.tranches
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Instruments still waiting for a flatten that was rejected or held back.
    pub fn pending_flatten(&self) -> &BTreeSet<String> {
        &self.pending_flatten
    }

    pub fn latest_price(&self, instrument: &str) -> Option<f64> {
        self.store.latest(instrument)
    }

    /// Store the bar's close. Returns `false` when the bar was not usable.
    pub fn ingest(&mut self, bar: &PriceBar) -> bool {
        if !bar.is_finished {
            return false;
        }
        if !bar.has_valid_close() {
            warn!(instrument = %bar.instrument, close = bar.close, "rejecting invalid close");
            return false;
        }
        if !self.store.append(&bar.instrument, bar.close) {
            debug!(instrument = %bar.instrument, "ignoring bar for instrument outside universe");
            return false;
        }
        true
    }

    /// Per-bar callback. Returns a report when the bar fired a rebalance cycle.
    pub fn on_bar(
        &mut self,
        bar: &PriceBar,
        collaborators: &mut Collaborators<'_>,
    ) -> Option<CycleReport> {
        if !self.ingest(bar) {
            return None;
        }
        if !self.scheduler.should_trigger(bar.open_time) {
            return None;
        }
        Some(self.run_cycle(bar.date(), collaborators))
    }

    /// Append a batch of bars sharing one timestamp, then evaluate the trigger once.
    pub fn on_bars(
        &mut self,
        bars: &[PriceBar],
        collaborators: &mut Collaborators<'_>,
    ) -> Option<CycleReport> {
        let mut latest = None;
        for bar in bars {
            if self.ingest(bar) {
                latest = latest.max(Some(bar.open_time));
            }
        }
        let timestamp = latest?;
        if !self.scheduler.should_trigger(timestamp) {
            return None;
        }
        Some(self.run_cycle(timestamp.date(), collaborators))
    }

    pub fn run_cycle(
        &mut self,
        date: NaiveDate,
        collaborators: &mut Collaborators<'_>,
    ) -> CycleReport {
        self.cycle += 1;
        let cycle = self.cycle;

        let summary = compute_signals(
            &self.strategy.metrics,
            &self.universe,
            &self.store,
            collaborators.scalars,
        );
        if !summary.insufficient_history.is_empty() {
            debug!(
                cycle,
                instruments = ?summary.insufficient_history,
                "excluded: window not full"
            );
        }
        if !summary.unavailable.is_empty() {
            info!(cycle, instruments = ?summary.unavailable, "excluded: signal unavailable");
        }

        let selection = select(&summary.table, &self.strategy.selection);
        let weights = allocate(
            &selection,
            self.strategy.tranche_gross(),
            self.strategy.long_share,
        );
        if selection.is_empty() {
            info!(cycle, ranked = summary.table.len(), "no legs selected, no new entries");
        }

        self.tranches.age_all();
        let closed = self.tranches.expire();

        let equity = collaborators
            .equity
            .current_equity()
            .filter(|e| e.is_finite() && *e > 0.0);

        let mut opened_tranche = None;
        match equity {
            Some(equity) if !weights.is_empty() => {
                let quantities: BTreeMap<String, f64> = weights
                    .iter()
                    .filter_map(|(id, &w)| {
                        let price = self.store.latest(id)?;
                        ExecutionGate::target_quantity(w, equity, price).map(|q| (id.clone(), q))
                    })
                    .collect();
                opened_tranche = self.tranches.open(cycle, quantities);
            }
            Some(_) => {}
            None => warn!(cycle, "equity unavailable, sizing skipped"),
        }

        let mut touched: BTreeSet<String> = closed
            .iter()
            .flat_map(|t| t.instruments().map(str::to_string))
            .collect();
        touched.extend(self.pending_flatten.iter().cloned());
        if equity.is_some() {
            touched.extend(self.tranches.instruments());
        }

        let targets = self.tranches.target_positions();
        let mut orders = Vec::new();
        let mut rejected = Vec::new();
        let mut suppressed = 0;

        for id in &touched {
            let Some(price) = self.store.latest(id) else {
                continue;
            };
            let target = targets.get(id).copied().unwrap_or(0.0);
            let current = collaborators.gateway.position(id);

            let Some(order) = self.gate.resolve_quantity(id, target, price, current) else {
                if target != current {
                    suppressed += 1;
                }
                continue;
            };

            match collaborators.gateway.submit(&order) {
                Ok(()) => orders.push(order),
                Err(e) => {
                    warn!(cycle, instrument = %id, error = %e, "order rejected");
                    rejected.push(RejectedOrder {
                        order,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.pending_flatten = touched
            .into_iter()
            .filter(|id| !targets.contains_key(id) && collaborators.gateway.position(id) != 0.0)
            .collect();
        if !self.pending_flatten.is_empty() {
            debug!(cycle, instruments = ?self.pending_flatten, "flatten carried to next cycle");
        }

        info!(
            cycle,
            %date,
            ranked = summary.table.len(),
            long = selection.long.len(),
            short = selection.short.len(),
            closed = closed.len(),
            orders = orders.len(),
            suppressed,
            "rebalance cycle complete"
        );

        CycleReport {
            cycle,
            date,
            ranked: summary.table.len(),
            long: selection.long.members,
            short: selection.short.members,
            weights,
            opened_tranche,
            closed_tranches: closed.iter().map(|t| t.id).collect(),
            orders,
            suppressed,
            rejected,
            sizing_skipped: equity.is_none(),
        }
    }
}
