//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::config_scalar_adapter::ConfigScalarSource;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvOrderLogAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    instrument_list, parse_bool, parse_combine, parse_date, parse_number, parse_spans,
    validate_portfolio_config, validate_run_config, validate_schedule_config,
    validate_signal_config, validate_universe_config,
};
use crate::domain::engine::RebalanceEngine;
use crate::domain::error::RebalancerError;
use crate::domain::metrics::ReplayMetrics;
use crate::domain::portfolio::{FillConfig, PaperAccount};
use crate::domain::replay::{ReplayConfig, build_unified_timeline, replay};
use crate::domain::schedule::Periodicity;
use crate::domain::selection::{LegCombine, LegSize, SelectionConfig};
use crate::domain::signal::SignalMetric;
use crate::domain::strategy::Strategy;
use crate::domain::universe::{Universe, parse_instruments, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::signal_port::ScalarSource;

#[derive(Parser, Debug)]
#[command(name = "rebalancer", about = "Periodic long/short rebalancing engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay history through the rebalancing engine
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Order log destination (CSV)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for instrument(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        instrument: Option<String>,
    },
    /// List instruments available in the data directory
    List {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_replay(&config, output.as_ref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, instrument } => run_info(&config, instrument.as_deref()),
        Command::List { config } => run_list(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = RebalancerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(e: RebalancerError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

fn run_replay(config_path: &PathBuf, output_path: Option<&PathBuf>) -> ExitCode {
    // Stage 1: Load config
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate every section
    if let Err(e) = validate_run_config(&adapter) {
        return fail(e);
    }

    // Stage 3: Build strategy, universe and replay settings
    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let universe = match build_universe(&adapter) {
        Ok(u) => u,
        Err(e) => return fail(e),
    };
    let replay_config = match build_replay_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let scalars = match ConfigScalarSource::from_config(&adapter, "carry") {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    // Stage 4: Data source
    let data_port = CsvAdapter::new(data_dir(&adapter));

    // Stages 5-9: Data port dependent pipeline
    run_replay_pipeline(
        &data_port,
        strategy,
        universe,
        &replay_config,
        &scalars,
        output_path,
    )
}

pub fn data_dir(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(
        config
            .get_string("replay", "data_dir")
            .unwrap_or_else(|| ".".to_string())
            .trim(),
    )
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Strategy, RebalancerError> {
    let lookback = parse_number::<usize>(adapter, "signal", "lookback")?
        .ok_or_else(|| RebalancerError::missing("signal", "lookback"))?;

    let metric_name = adapter
        .get_string("signal", "metric")
        .unwrap_or_else(|| "momentum".to_string())
        .trim()
        .to_lowercase();
    let spans = match adapter.get_string("signal", "window_spans") {
        Some(raw) => parse_spans(&raw)?,
        None => vec![lookback],
    };
    let skip_recent = parse_number::<usize>(adapter, "signal", "skip_recent")?.unwrap_or(0);

    let metrics: Vec<SignalMetric> = match metric_name.as_str() {
        "momentum" => spans
            .iter()
            .map(|&span| SignalMetric::TrailingReturn {
                span,
                offset: skip_recent,
            })
            .collect(),
        "slope" => spans
            .iter()
            .map(|&span| SignalMetric::RegressionSlope { span })
            .collect(),
        "carry" => vec![SignalMetric::ExternalScalar],
        other => {
            return Err(RebalancerError::invalid(
                "signal",
                "metric",
                format!("unknown metric '{other}'"),
            ));
        }
    };

    let combine = match adapter.get_string("signal", "combine") {
        Some(raw) => parse_combine(&raw)?,
        None => LegCombine::default(),
    };

    let leg_size = match (
        parse_number::<usize>(adapter, "portfolio", "leg_size")?,
        parse_number::<f64>(adapter, "portfolio", "leg_fraction")?,
    ) {
        (_, Some(fraction)) => LegSize::Fraction(fraction),
        (Some(count), None) => LegSize::Count(count),
        (None, None) => LegSize::Count(1),
    };

    let selection = SelectionConfig {
        leg_size,
        combine,
        require_both_legs: bool_or(adapter, "portfolio", "require_both_legs", true)?,
        min_ranked: parse_number::<usize>(adapter, "signal", "min_ranked")?.unwrap_or(2),
    };

    let periodicity = match adapter.get_string("schedule", "periodicity") {
        Some(raw) => raw
            .parse::<Periodicity>()
            .map_err(|reason| RebalancerError::invalid("schedule", "periodicity", reason))?,
        None => Periodicity::default(),
    };

    let strategy = Strategy {
        name: format!("Cross-sectional {metric_name}"),
        lookback,
        metrics,
        selection,
        gross_exposure: parse_number(adapter, "portfolio", "gross_exposure")?.unwrap_or(1.0),
        long_share: parse_number(adapter, "portfolio", "long_share")?.unwrap_or(0.5),
        holding_horizon: parse_number(adapter, "portfolio", "holding_horizon")?.unwrap_or(1),
        minimum_trade_notional: parse_number(adapter, "portfolio", "minimum_trade_notional")?
            .unwrap_or(0.0),
        periodicity,
        split_across_tranches: bool_or(adapter, "portfolio", "split_across_tranches", true)?,
    };
    strategy.validate()?;
    Ok(strategy)
}

fn bool_or(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, RebalancerError> {
    match adapter.get_string(section, key) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| {
            RebalancerError::invalid(section, key, format!("'{raw}' is not a boolean"))
        }),
    }
}

pub fn build_universe(adapter: &dyn ConfigPort) -> Result<Universe, RebalancerError> {
    let ids = instrument_list(adapter)?;
    let untradable = match adapter.get_string("universe", "untradable") {
        Some(raw) if !raw.trim().is_empty() => parse_instruments(&raw)
            .map_err(|e| RebalancerError::invalid("universe", "untradable", e.to_string()))?,
        _ => Vec::new(),
    };
    Universe::from_ids(&ids, &untradable)
}

pub fn build_replay_config(adapter: &dyn ConfigPort) -> Result<ReplayConfig, RebalancerError> {
    Ok(ReplayConfig {
        start_date: parse_date(adapter, "replay", "start_date")?,
        end_date: parse_date(adapter, "replay", "end_date")?,
        initial_capital: parse_number(adapter, "replay", "initial_capital")?.unwrap_or(100_000.0),
        fill: FillConfig {
            commission_per_trade: parse_number(adapter, "replay", "commission_per_trade")?
                .unwrap_or(0.0),
            commission_pct: parse_number(adapter, "replay", "commission_pct")?.unwrap_or(0.0),
            slippage_pct: parse_number(adapter, "replay", "slippage_pct")?.unwrap_or(0.0),
        },
    })
}

pub fn run_replay_pipeline(
    data_port: &dyn DataPort,
    strategy: Strategy,
    universe: Universe,
    replay_config: &ReplayConfig,
    scalars: &dyn ScalarSource,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    // Stage 5: Validate universe against available history
    let validation = match validate_universe(
        data_port,
        &universe,
        strategy.window_capacity(),
        replay_config.start_date,
        replay_config.end_date,
    ) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    let universe = validation.universe;

    // Stage 6: Fetch bars
    let mut bars_by_instrument = BTreeMap::new();
    for id in universe.ids() {
        match data_port.fetch_bars(id, replay_config.start_date, replay_config.end_date) {
            Ok(bars) => {
                bars_by_instrument.insert(id.to_string(), bars);
            }
            Err(e) => eprintln!("warning: skipping {id} ({e})"),
        }
    }
    if bars_by_instrument.is_empty() {
        return fail(RebalancerError::EmptyUniverse);
    }

    // Stage 7: Build engine and replay the unified timeline
    let timeline = build_unified_timeline(&bars_by_instrument);
    eprintln!(
        "Running replay: {} instruments, {} to {}",
        bars_by_instrument.len(),
        replay_config.start_date,
        replay_config.end_date,
    );
    eprintln!("  Processing: {} timestamps", timeline.len());

    let mut engine = match RebalanceEngine::new(strategy, universe) {
        Ok(e) => e,
        Err(e) => return fail(e),
    };
    let mut account = PaperAccount::new(replay_config.initial_capital, replay_config.fill.clone());
    let result = replay(&bars_by_instrument, &mut engine, &mut account, scalars);

    // Stage 8: Console summary
    let metrics = ReplayMetrics::compute(&result);
    eprintln!("\n=== Replay Results ===");
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Final Equity:     {:.2}", result.final_equity);
    eprintln!(
        "Cycles:           {} ({} with orders)",
        metrics.cycles, metrics.cycles_with_orders
    );
    eprintln!("Orders:           {}", metrics.orders);
    eprintln!("Rejected:         {}", metrics.rejected_orders);
    eprintln!("Suppressed:       {}", metrics.suppressed_orders);
    eprintln!("Traded Notional:  {:.2}", metrics.traded_notional);
    eprintln!("Commission:       {:.2}", metrics.total_commission);
    eprintln!("Open Tranches:    {}", engine.tranches().len());

    // Stage 9: Order log
    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("orders.csv"));
    match CsvOrderLogAdapter::new().write(&result.reports, &output.display().to_string()) {
        Ok(()) => {
            eprintln!("\nOrder log written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn run_dry_run(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_run_config(&adapter) {
        return fail(e);
    }
    eprintln!("Config validated successfully");

    let (strategy, universe, replay_config) = match (
        build_strategy(&adapter),
        build_universe(&adapter),
        build_replay_config(&adapter),
    ) {
        (Ok(s), Ok(u), Ok(r)) => (s, u, r),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return fail(e),
    };

    print_strategy(&strategy);

    eprintln!("\nUniverse:");
    eprintln!("  instruments: {}", universe.ids().collect::<Vec<_>>().join(", "));
    let untradable: Vec<&str> = universe
        .instruments()
        .iter()
        .filter(|i| !i.tradable)
        .map(|i| i.id.as_str())
        .collect();
    if !untradable.is_empty() {
        eprintln!("  untradable:  {}", untradable.join(", "));
    }

    eprintln!("\nReplay:");
    eprintln!("  data_dir:        {}", data_dir(&adapter).display());
    eprintln!(
        "  window:          {} to {}",
        replay_config.start_date, replay_config.end_date
    );
    eprintln!("  initial_capital: {:.2}", replay_config.initial_capital);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn print_strategy(strategy: &Strategy) {
    eprintln!("\nStrategy: {}", strategy.name);
    eprintln!(
        "  lookback:        {} (window {})",
        strategy.lookback,
        strategy.window_capacity()
    );
    let metrics: Vec<String> = strategy.metrics.iter().map(|m| m.to_string()).collect();
    eprintln!("  metrics:         {}", metrics.join(", "));
    eprintln!("  legs:            {:?}", strategy.selection.leg_size);
    eprintln!("  combine:         {:?}", strategy.selection.combine);
    eprintln!(
        "  exposure:        gross {} long share {}",
        strategy.gross_exposure, strategy.long_share
    );
    eprintln!(
        "  tranches:        horizon {} gross per tranche {}",
        strategy.holding_horizon,
        strategy.tranche_gross()
    );
    eprintln!("  periodicity:     {}", strategy.periodicity);
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating configuration: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checks = [
        validate_universe_config(&adapter),
        validate_signal_config(&adapter),
        validate_portfolio_config(&adapter),
        validate_schedule_config(&adapter),
    ];
    if let Some(e) = checks.into_iter().find_map(Result::err) {
        return fail(e);
    }

    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    if let Err(e) = build_universe(&adapter) {
        return fail(e);
    }

    print_strategy(&strategy);

    eprintln!("\nStrategy configuration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf, instrument: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let instruments = match instrument {
        Some(id) => vec![id.trim().to_uppercase()],
        None => match instrument_list(&config) {
            Ok(ids) => ids,
            Err(e) => return fail(e),
        },
    };

    let data_port = CsvAdapter::new(data_dir(&config));
    for id in &instruments {
        match data_port.get_data_range(id) {
            Ok(Some((first, last, count))) => {
                println!("{id}: {count} bars, {first} to {last}");
            }
            Ok(None) => eprintln!("{id}: no data found"),
            Err(e) => eprintln!("error querying {id}: {e}"),
        }
    }
    ExitCode::SUCCESS
}

fn run_list(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let data_port = CsvAdapter::new(data_dir(&config));
    let instruments = match data_port.list_instruments() {
        Ok(ids) => ids,
        Err(e) => return fail(e),
    };

    if instruments.is_empty() {
        eprintln!("No instruments found in {}", data_dir(&config).display());
    } else {
        for id in &instruments {
            println!("{id}");
        }
        eprintln!("{} instruments found", instruments.len());
    }
    ExitCode::SUCCESS
}
