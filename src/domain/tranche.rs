//! Tranche lifecycle: cohorts of positions opened at one rebalance cycle,
//! aged once per scheduling period and closed together at the holding horizon.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrancheState {
    Open,
    Aging,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tranche {
    pub id: u64,
    pub opened_at_cycle: u64,
    pub age: u32,
    /// Signed quantity per instrument.
    pub quantities: BTreeMap<String, f64>,
}

impl Tranche {
    pub fn state(&self, holding_horizon: u32) -> TrancheState {
        if self.age >= holding_horizon {
            TrancheState::Closed
        } else if self.age == 0 {
            TrancheState::Open
        } else {
            TrancheState::Aging
        }
    }

    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.quantities.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct TrancheBook {
    holding_horizon: u32,
    next_id: u64,
    active: Vec<Tranche>,
}

impl TrancheBook {
    pub fn new(holding_horizon: u32) -> Self {
        TrancheBook {
            holding_horizon,
            next_id: 1,
            active: Vec::new(),
        }
    }

    pub fn holding_horizon(&self) -> u32 {
        self.holding_horizon
    }

    pub fn active(&self) -> &[Tranche] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn age_all(&mut self) {
        for tranche in &mut self.active {
            tranche.age = tranche.age.saturating_add(1);
        }
    }

    /// Remove and return every tranche whose age has reached the horizon.
    pub fn expire(&mut self) -> Vec<Tranche> {
        let horizon = self.holding_horizon;
        let (closed, kept): (Vec<Tranche>, Vec<Tranche>) = self
            .active
            .drain(..)
            .partition(|t| t.state(horizon) == TrancheState::Closed);
        self.active = kept;
        for tranche in &closed {
            debug!(
                tranche = tranche.id,
                opened_at_cycle = tranche.opened_at_cycle,
                age = tranche.age,
                "tranche closed"
            );
        }
        closed
    }

    /// Register a fresh tranche at age 0. Empty cohorts are not registered.
    pub fn open(&mut self, cycle: u64, quantities: BTreeMap<String, f64>) -> Option<u64> {
        if quantities.is_empty() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        debug!(tranche = id, cycle, members = quantities.len(), "tranche opened");
        self.active.push(Tranche {
            id,
            opened_at_cycle: cycle,
            age: 0,
            quantities,
        });
        Some(id)
    }

    /// Aggregate signed target per instrument across all active tranches.
    pub fn target_positions(&self) -> BTreeMap<String, f64> {
        let mut targets = BTreeMap::new();
        for tranche in &self.active {
            for (id, qty) in &tranche.quantities {
                *targets.entry(id.clone()).or_insert(0.0) += qty;
            }
        }
        targets
    }

    pub fn instruments(&self) -> BTreeSet<String> {
        self.active
            .iter()
            .flat_map(|t| t.quantities.keys().cloned())
            .collect()
    }
}
