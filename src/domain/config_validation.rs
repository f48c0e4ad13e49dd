//! Configuration validation.
//!
//! Checks every section before any market data is loaded, so a bad file fails
//! with the offending section and key rather than halfway through a replay.

use crate::domain::error::RebalancerError;
use crate::domain::schedule::Periodicity;
use crate::domain::selection::LegCombine;
use crate::domain::universe::parse_instruments;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn validate_universe_config(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let instruments = instrument_list(config)?;
    if let Some(raw) = config.get_string("universe", "untradable") {
        if !raw.trim().is_empty() {
            let untradable = parse_instruments(&raw)
                .map_err(|e| RebalancerError::invalid("universe", "untradable", e.to_string()))?;
            if let Some(unknown) = untradable.iter().find(|id| !instruments.contains(id)) {
                return Err(RebalancerError::invalid(
                    "universe",
                    "untradable",
                    format!("{unknown} is not in the instrument list"),
                ));
            }
        }
    }
    Ok(())
}

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    validate_lookback(config)?;
    let metric = config
        .get_string("signal", "metric")
        .unwrap_or_else(|| "momentum".to_string());
    match metric.trim().to_lowercase().as_str() {
        "momentum" | "slope" => {
            if let Some(raw) = config.get_string("signal", "window_spans") {
                parse_spans(&raw)?;
            }
        }
        "carry" => validate_carry(config)?,
        other => {
            return Err(RebalancerError::invalid(
                "signal",
                "metric",
                format!("unknown metric '{other}', expected momentum, slope or carry"),
            ));
        }
    }
    parse_number::<usize>(config, "signal", "skip_recent")?;
    if let Some(raw) = config.get_string("signal", "combine") {
        parse_combine(&raw)?;
    }
    if let Some(min_ranked) = parse_number::<usize>(config, "signal", "min_ranked")? {
        if min_ranked < 2 {
            return Err(RebalancerError::invalid(
                "signal",
                "min_ranked",
                "min_ranked must be at least 2",
            ));
        }
    }
    Ok(())
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    validate_leg_size(config)?;

    let gross = parse_number::<f64>(config, "portfolio", "gross_exposure")?.unwrap_or(1.0);
    if !(gross > 0.0) || !gross.is_finite() {
        return Err(RebalancerError::invalid(
            "portfolio",
            "gross_exposure",
            "gross_exposure must be positive",
        ));
    }

    let long_share = parse_number::<f64>(config, "portfolio", "long_share")?.unwrap_or(0.5);
    if !(0.0..=1.0).contains(&long_share) {
        return Err(RebalancerError::invalid(
            "portfolio",
            "long_share",
            "long_share must be between 0 and 1",
        ));
    }

    let horizon = parse_number::<u32>(config, "portfolio", "holding_horizon")?.unwrap_or(1);
    if horizon == 0 {
        return Err(RebalancerError::invalid(
            "portfolio",
            "holding_horizon",
            "holding_horizon must be at least 1",
        ));
    }

    let minimum = parse_number::<f64>(config, "portfolio", "minimum_trade_notional")?.unwrap_or(0.0);
    if !(minimum >= 0.0) {
        return Err(RebalancerError::invalid(
            "portfolio",
            "minimum_trade_notional",
            "minimum_trade_notional must be non-negative",
        ));
    }

    for key in ["require_both_legs", "split_across_tranches"] {
        if let Some(raw) = config.get_string("portfolio", key) {
            parse_bool(&raw).ok_or_else(|| {
                RebalancerError::invalid("portfolio", key, format!("'{raw}' is not a boolean"))
            })?;
        }
    }
    Ok(())
}

pub fn validate_schedule_config(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    if let Some(raw) = config.get_string("schedule", "periodicity") {
        Periodicity::from_str(&raw)
            .map_err(|reason| RebalancerError::invalid("schedule", "periodicity", reason))?;
    }
    Ok(())
}

pub fn validate_replay_config(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    match config.get_string("replay", "data_dir") {
        Some(s) if !s.trim().is_empty() => {}
        _ => return Err(RebalancerError::missing("replay", "data_dir")),
    }

    let start_date = parse_date(config, "replay", "start_date")?;
    let end_date = parse_date(config, "replay", "end_date")?;
    if start_date >= end_date {
        return Err(RebalancerError::invalid(
            "replay",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let capital = parse_number::<f64>(config, "replay", "initial_capital")?.unwrap_or(0.0);
    if !(capital > 0.0) {
        return Err(RebalancerError::invalid(
            "replay",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    for key in ["commission_per_trade", "commission_pct", "slippage_pct"] {
        let value = parse_number::<f64>(config, "replay", key)?.unwrap_or(0.0);
        if !(value >= 0.0) {
            return Err(RebalancerError::invalid(
                "replay",
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }
    Ok(())
}

/// Every section a full run needs, in file order.
pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    validate_universe_config(config)?;
    validate_signal_config(config)?;
    validate_portfolio_config(config)?;
    validate_schedule_config(config)?;
    validate_replay_config(config)?;
    Ok(())
}

pub fn instrument_list(config: &dyn ConfigPort) -> Result<Vec<String>, RebalancerError> {
    let raw = config
        .get_string("universe", "instruments")
        .ok_or_else(|| RebalancerError::missing("universe", "instruments"))?;
    if raw.trim().is_empty() {
        return Err(RebalancerError::EmptyUniverse);
    }
    parse_instruments(&raw)
        .map_err(|e| RebalancerError::invalid("universe", "instruments", e.to_string()))
}

pub fn parse_spans(raw: &str) -> Result<Vec<usize>, RebalancerError> {
    let mut spans = Vec::new();
    for token in raw.split(',') {
        let span = token.trim().parse::<usize>().map_err(|_| {
            RebalancerError::invalid(
                "signal",
                "window_spans",
                format!("'{}' is not a positive integer", token.trim()),
            )
        })?;
        if span == 0 {
            return Err(RebalancerError::invalid(
                "signal",
                "window_spans",
                "window spans must be positive",
            ));
        }
        spans.push(span);
    }
    Ok(spans)
}

pub fn parse_combine(raw: &str) -> Result<LegCombine, RebalancerError> {
    match raw.trim().to_lowercase().as_str() {
        "intersection" => Ok(LegCombine::Intersection),
        "union" => Ok(LegCombine::Union),
        other => Err(RebalancerError::invalid(
            "signal",
            "combine",
            format!("unknown combine '{other}', expected intersection or union"),
        )),
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// `Ok(None)` when the key is absent; an error when present but unparsable.
pub fn parse_number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, RebalancerError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            RebalancerError::invalid(section, key, format!("'{}' is not a valid number", raw.trim()))
        }),
    }
}

pub fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDate, RebalancerError> {
    let raw = config
        .get_string(section, key)
        .ok_or_else(|| RebalancerError::missing(section, key))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        RebalancerError::invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
    })
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    match parse_number::<i64>(config, "signal", "lookback")? {
        None => Err(RebalancerError::missing("signal", "lookback")),
        Some(n) if n <= 0 => Err(RebalancerError::invalid(
            "signal",
            "lookback",
            "lookback must be positive",
        )),
        Some(_) => Ok(()),
    }
}

fn validate_leg_size(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let count = parse_number::<usize>(config, "portfolio", "leg_size")?;
    let fraction = parse_number::<f64>(config, "portfolio", "leg_fraction")?;
    match (count, fraction) {
        (Some(_), Some(_)) => Err(RebalancerError::invalid(
            "portfolio",
            "leg_fraction",
            "set either leg_size or leg_fraction, not both",
        )),
        (Some(0), None) => Err(RebalancerError::invalid(
            "portfolio",
            "leg_size",
            "leg_size must be at least 1",
        )),
        (None, Some(f)) if !(f > 0.0 && f <= 0.5) => Err(RebalancerError::invalid(
            "portfolio",
            "leg_fraction",
            "leg_fraction must be in (0, 0.5]",
        )),
        _ => Ok(()),
    }
}

fn validate_carry(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let keys = config.section_keys("carry");
    if keys.is_empty() {
        return Err(RebalancerError::missing("carry", "<instrument>"));
    }
    for key in keys {
        parse_number::<f64>(config, "carry", &key)?;
    }
    Ok(())
}
