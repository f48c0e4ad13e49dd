//! Instrument universe.
//!
//! Parses instrument lists from configuration and, before a replay, checks
//! that each instrument has enough history to ever fill its rolling window.

use crate::domain::error::RebalancerError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub id: String,
    pub tradable: bool,
}

impl Instrument {
    pub fn tradable(id: &str) -> Self {
        Instrument {
            id: id.to_string(),
            tradable: true,
        }
    }

    pub fn untradable(id: &str) -> Self {
        Instrument {
            id: id.to_string(),
            tradable: false,
        }
    }
}

/// Ordered, duplicate-free set of instruments fixed for the engine's lifetime.
#[derive(Debug, Clone)]
pub struct Universe {
    instruments: Vec<Instrument>,
}

impl Universe {
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, RebalancerError> {
        if instruments.is_empty() {
            return Err(RebalancerError::EmptyUniverse);
        }
        let mut seen = HashSet::new();
        for instrument in &instruments {
            if !seen.insert(instrument.id.as_str()) {
                return Err(RebalancerError::invalid(
                    "universe",
                    "instruments",
                    format!("duplicate instrument: {}", instrument.id),
                ));
            }
        }
        Ok(Universe { instruments })
    }

    /// Build from a configured id list; ids in `untradable` are tracked but not traded.
    pub fn from_ids(ids: &[String], untradable: &[String]) -> Result<Self, RebalancerError> {
        let instruments = ids
            .iter()
            .map(|id| Instrument {
                id: id.clone(),
                tradable: !untradable.contains(id),
            })
            .collect();
        Universe::new(instruments)
    }

    pub fn count(&self) -> usize {
        self.instruments.len()
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn get(&self, id: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|i| i.id.as_str())
    }

    pub fn tradable_ids(&self) -> impl Iterator<Item = &str> {
        self.instruments
            .iter()
            .filter(|i| i.tradable)
            .map(|i| i.id.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in instrument list")]
    EmptyToken,

    #[error("duplicate instrument: {0}")]
    DuplicateInstrument(String),
}

pub fn parse_instruments(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let id = trimmed.to_uppercase();
        if !seen.insert(id.clone()) {
            return Err(UniverseError::DuplicateInstrument(id));
        }
        ids.push(id);
    }

    Ok(ids)
}

#[derive(Debug)]
pub struct UniverseValidationResult {
    pub universe: Universe,
    pub skipped: Vec<SkippedInstrument>,
}

#[derive(Debug, Clone)]
pub struct SkippedInstrument {
    pub id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

/// Drop instruments whose history can never fill a window of `min_bars` closes.
///
/// Fails only when no instrument survives.
pub fn validate_universe(
    data_port: &dyn DataPort,
    universe: &Universe,
    min_bars: usize,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<UniverseValidationResult, RebalancerError> {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();

    for instrument in universe.instruments() {
        let bars = match data_port.fetch_bars(&instrument.id, start_date, end_date) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(instrument = %instrument.id, error = %e, "skipping instrument");
                skipped.push(SkippedInstrument {
                    id: instrument.id.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if bars.is_empty() {
            warn!(instrument = %instrument.id, "skipping instrument: no data found");
            skipped.push(SkippedInstrument {
                id: instrument.id.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        if bars.len() < min_bars {
            warn!(
                instrument = %instrument.id,
                bars = bars.len(),
                minimum = min_bars,
                "skipping instrument: insufficient history"
            );
            skipped.push(SkippedInstrument {
                id: instrument.id.clone(),
                reason: SkipReason::InsufficientBars { bars: bars.len() },
            });
            continue;
        }

        info!(instrument = %instrument.id, bars = bars.len(), "instrument ok");
        valid.push(instrument.clone());
    }

    if valid.is_empty() {
        return Err(RebalancerError::EmptyUniverse);
    }

    if !skipped.is_empty() {
        info!(
            kept = valid.len(),
            configured = universe.count(),
            "universe reduced after validation"
        );
    }

    Ok(UniverseValidationResult {
        universe: Universe::new(valid)?,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instruments_basic() {
        let result = parse_instruments("EURUSD,GBPUSD,USDJPY").unwrap();
        assert_eq!(result, vec!["EURUSD", "GBPUSD", "USDJPY"]);
    }

    #[test]
    fn test_parse_instruments_trims_and_uppercases() {
        let result = parse_instruments("  eurusd , GbpUsd ,usdjpy").unwrap();
        assert_eq!(result, vec!["EURUSD", "GBPUSD", "USDJPY"]);
    }

    #[test]
    fn test_parse_instruments_empty_token() {
        let result = parse_instruments("EURUSD,,GBPUSD");
        assert!(matches!(result, Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_instruments_duplicate() {
        let result = parse_instruments("EURUSD,GBPUSD,eurusd");
        assert!(matches!(result, Err(UniverseError::DuplicateInstrument(s)) if s == "EURUSD"));
    }

    #[test]
    fn empty_universe_is_fatal() {
        let result = Universe::new(vec![]);
        assert!(matches!(result, Err(RebalancerError::EmptyUniverse)));
    }

    #[test]
    fn duplicate_instrument_rejected() {
        let result = Universe::new(vec![Instrument::tradable("A"), Instrument::tradable("A")]);
        assert!(matches!(
            result,
            Err(RebalancerError::ConfigInvalid { key, .. }) if key == "instruments"
        ));
    }

    #[test]
    fn from_ids_marks_untradable() {
        let ids = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let universe = Universe::from_ids(&ids, &["B".to_string()]).unwrap();
        assert_eq!(universe.count(), 3);
        assert!(universe.get("A").unwrap().tradable);
        assert!(!universe.get("B").unwrap().tradable);
        assert_eq!(universe.tradable_ids().collect::<Vec<_>>(), vec!["A", "C"]);
        assert_eq!(universe.ids().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn contains_and_get() {
        let universe = Universe::new(vec![Instrument::tradable("A")]).unwrap();
        assert!(universe.contains("A"));
        assert!(!universe.contains("Z"));
        assert!(universe.get("Z").is_none());
    }
}
