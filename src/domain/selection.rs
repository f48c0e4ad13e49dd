//! Ranking and long/short leg selection.
//!
//! Each metric ranks the instruments descending (ties broken by id ascending).
//! The top k form that metric's long set and the bottom k its short set;
//! per-metric sets are then combined by the configured policy.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::signal::SignalTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegSize {
    Count(usize),
    Fraction(f64),
}

impl LegSize {
    /// Instruments per leg out of `ranked`; never more than half, so legs cannot overlap.
    pub fn resolve(&self, ranked: usize) -> usize {
        let k = match *self {
            LegSize::Count(k) => k,
            LegSize::Fraction(f) => (ranked as f64 * f + 1e-9).floor() as usize,
        };
        k.min(ranked / 2)
    }
}

/// How per-metric leg sets are merged when several metrics are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegCombine {
    /// Member of a leg for every metric.
    #[default]
    Intersection,
    /// Member of a leg for any metric; instruments claimed by both legs are dropped.
    Union,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub leg_size: LegSize,
    pub combine: LegCombine,
    pub require_both_legs: bool,
    pub min_ranked: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            leg_size: LegSize::Count(1),
            combine: LegCombine::Intersection,
            require_both_legs: true,
            min_ranked: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub direction: Direction,
    /// In rank order of the first metric.
    pub members: Vec<String>,
}

impl Leg {
    pub fn empty(direction: Direction) -> Self {
        Leg {
            direction,
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegSelection {
    pub long: Leg,
    pub short: Leg,
}

impl LegSelection {
    pub fn empty() -> Self {
        LegSelection {
            long: Leg::empty(Direction::Long),
            short: Leg::empty(Direction::Short),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.long.is_empty() && self.short.is_empty()
    }
}

/// Instrument ids ordered by the metric at `index`, best first.
pub fn rank(signals: &SignalTable, index: usize) -> Vec<&str> {
    let mut ranked: Vec<(&str, f64)> = signals
        .iter()
        .filter_map(|(id, values)| values.get(index).map(|&v| (id.as_str(), v)))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked.into_iter().map(|(id, _)| id).collect()
}

pub fn select(signals: &SignalTable, config: &SelectionConfig) -> LegSelection {
    let ranked_count = signals.len();
    if ranked_count == 0 || ranked_count < config.min_ranked {
        return LegSelection::empty();
    }
    let metric_count = signals.values().map(Vec::len).min().unwrap_or(0);
    if metric_count == 0 {
        return LegSelection::empty();
    }

    let k = config.leg_size.resolve(ranked_count);
    if k == 0 {
        return LegSelection::empty();
    }

    let rankings: Vec<Vec<&str>> = (0..metric_count).map(|i| rank(signals, i)).collect();
    let long_sets: Vec<BTreeSet<&str>> = rankings
        .iter()
        .map(|r| r.iter().take(k).copied().collect())
        .collect();
    let short_sets: Vec<BTreeSet<&str>> = rankings
        .iter()
        .map(|r| r.iter().rev().take(k).copied().collect())
        .collect();

    let mut long = combine(&long_sets, config.combine);
    let mut short = combine(&short_sets, config.combine);
    if config.combine == LegCombine::Union {
        let both: BTreeSet<&str> = long.intersection(&short).copied().collect();
        long.retain(|id| !both.contains(id));
        short.retain(|id| !both.contains(id));
    }

    if config.require_both_legs && (long.is_empty() || short.is_empty()) {
        return LegSelection::empty();
    }

    let primary = &rankings[0];
    LegSelection {
        long: Leg {
            direction: Direction::Long,
            members: primary
                .iter()
                .filter(|id| long.contains(*id))
                .map(|id| id.to_string())
                .collect(),
        },
        short: Leg {
            direction: Direction::Short,
            members: primary
                .iter()
                .rev()
                .filter(|id| short.contains(*id))
                .map(|id| id.to_string())
                .collect(),
        },
    }
}

fn combine<'a>(sets: &[BTreeSet<&'a str>], policy: LegCombine) -> BTreeSet<&'a str> {
    let mut iter = sets.iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    iter.fold(first.clone(), |acc, set| match policy {
        LegCombine::Intersection => acc.intersection(set).copied().collect(),
        LegCombine::Union => acc.union(set).copied().collect(),
    })
}
