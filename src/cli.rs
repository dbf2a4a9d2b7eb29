//! CLI definition and dispatch.

use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_report_adapter::FileReportAdapter;
use crate::adapters::json_state_adapter::JsonStateAdapter;
use crate::domain::approval::{ApprovalThresholds, ApprovalVerdict, evaluate};
use crate::domain::backtest::{BacktestConfig, resume_backtest, run_backtest};
use crate::domain::candle::CandleSeries;
use crate::domain::config_validation::{list, optional_f64, optional_int, validate_strategy_config};
use crate::domain::cost::CostConfig;
use crate::domain::error::StuntmanError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::indicator_set::{IndicatorConfig, IndicatorSet};
use crate::domain::instrument::Instrument;
use crate::domain::metrics::PerformanceReport;
use crate::domain::pattern::PatternParams;
use crate::domain::regime::{RegimeConfig, classify_all};
use crate::domain::strategy::{PatternPolicy, Strategy, StrategyConfig};
use crate::domain::walk_forward::{PartialWindowPolicy, WalkForwardConfig, run_walk_forward};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::state_port::StatePort;

/// Exchange offset used when `[data] utc_offset_minutes` is not set (US Eastern, standard time).
pub const DEFAULT_UTC_OFFSET_MINUTES: i64 = -300;

#[derive(Parser, Debug)]
#[command(name = "stuntman", about = "Intraday pattern backtester")]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Candle CSV file or directory; overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Overrides [backtest] seed
        #[arg(long)]
        seed: Option<u64>,
        /// Directory for trades.csv, windows.csv and report.json
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory of the JSON state store
        #[arg(long)]
        state: Option<PathBuf>,
        #[arg(long)]
        walk_forward: bool,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the indicator snapshot and regime of the last bar
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    // a second init (tests) keeps the first subscriber
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            seed,
            output,
            state,
            walk_forward,
        } => run_backtest_command(
            &config,
            data.as_deref(),
            seed,
            output.as_deref(),
            state.as_deref(),
            walk_forward,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Indicators { config, data } => run_indicators(&config, data.as_deref()),
    }
}

fn fail(err: StuntmanError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StuntmanError> {
    FileConfigAdapter::from_file(path)
}

/// Read a validated config into a [`StrategyConfig`]; absent keys keep their defaults.
pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, StuntmanError> {
    let defaults = StrategyConfig::default();

    let instrument = Instrument {
        symbol: config
            .get_string("instrument", "symbol")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or(defaults.instrument.symbol),
        tick_size: config.get_double("instrument", "tick_size", defaults.instrument.tick_size),
        point_value: config.get_double("instrument", "point_value", defaults.instrument.point_value),
    };

    let ind = IndicatorConfig::default();
    let period = |key: &str, default: usize| config.get_int("indicators", key, default as i64) as usize;
    let indicators = IndicatorConfig {
        ema_short: period("ema_short", ind.ema_short),
        ema_medium: period("ema_medium", ind.ema_medium),
        ema_long: period("ema_long", ind.ema_long),
        sma: period("sma", ind.sma),
        rsi: period("rsi", ind.rsi),
        atr: period("atr", ind.atr),
        macd_fast: period("macd_fast", ind.macd_fast),
        macd_slow: period("macd_slow", ind.macd_slow),
        macd_signal: period("macd_signal", ind.macd_signal),
        bollinger_period: period("bollinger_period", ind.bollinger_period),
        bollinger_mult_x100: (config.get_double(
            "indicators",
            "bollinger_stddev",
            ind.bollinger_mult_x100 as f64 / 100.0,
        ) * 100.0)
            .round() as u32,
        adx: period("adx", ind.adx),
    };

    let rg = RegimeConfig::default();
    let regime = RegimeConfig {
        min_lookback: config.get_int("regime", "min_lookback", rg.min_lookback as i64) as usize,
        slope_lookback: config.get_int("regime", "slope_lookback", rg.slope_lookback as i64) as usize,
        slope_pct: config.get_double("regime", "slope_pct", rg.slope_pct),
        strong_slope_pct: config.get_double("regime", "strong_slope_pct", rg.strong_slope_pct),
        rsi_midline: config.get_double("regime", "rsi_midline", rg.rsi_midline),
    };

    let pp = PatternParams::default();
    let pattern_params = PatternParams {
        stop_atr: config.get_double("patterns", "stop_atr", pp.stop_atr),
        target_atr: config.get_double("patterns", "target_atr", pp.target_atr),
        touch_tolerance_atr: config.get_double("patterns", "touch_tolerance_atr", pp.touch_tolerance_atr),
        opening_range_bars: config.get_int("patterns", "opening_range_bars", pp.opening_range_bars as i64)
            as usize,
        orb_target_fraction: config.get_double("patterns", "orb_target_fraction", pp.orb_target_fraction),
        rsi_oversold: config.get_double("patterns", "rsi_oversold", pp.rsi_oversold),
        rsi_overbought: config.get_double("patterns", "rsi_overbought", pp.rsi_overbought),
        bb_lower_pct_b: config.get_double("patterns", "bb_lower_pct_b", pp.bb_lower_pct_b),
        bb_upper_pct_b: config.get_double("patterns", "bb_upper_pct_b", pp.bb_upper_pct_b),
        min_adx: config.get_double("patterns", "min_adx", pp.min_adx),
    };

    let policy = config
        .get_string("patterns", "policy")
        .and_then(|s| PatternPolicy::parse(&s))
        .unwrap_or(defaults.policy);

    let c = CostConfig::default();
    let costs = CostConfig {
        reject_probability: config.get_double("costs", "reject_probability", c.reject_probability),
        base_slippage_ticks: config.get_double("costs", "base_slippage_ticks", c.base_slippage_ticks),
        volatility_factor: config.get_double("costs", "volatility_factor", c.volatility_factor),
        max_slippage_ticks: config.get_double("costs", "max_slippage_ticks", c.max_slippage_ticks),
        jitter: config.get_double("costs", "jitter", c.jitter),
        commission: config.get_double("costs", "commission", c.commission),
        exchange_fee: config.get_double("costs", "exchange_fee", c.exchange_fee),
        regulatory_fee: config.get_double("costs", "regulatory_fee", c.regulatory_fee),
        spread_ticks: config.get_double("costs", "spread_ticks", c.spread_ticks),
    };

    let ex = ExecutionConfig::default();
    let execution = ExecutionConfig {
        contracts: config.get_int("execution", "contracts", ex.contracts as i64) as u32,
        max_contracts: config.get_int("execution", "max_contracts", ex.max_contracts as i64) as u32,
        max_hold_bars: optional_int(
            config,
            "execution",
            "max_hold_bars",
            ex.max_hold_bars.map(|n| n as i64),
        )?
        .map(|n| n as usize),
        max_trades_per_day: optional_int(
            config,
            "execution",
            "max_trades_per_day",
            ex.max_trades_per_day.map(i64::from),
        )?
        .map(|n| n as u32),
        max_daily_loss: optional_f64(config, "execution", "max_daily_loss", ex.max_daily_loss)?,
        reversal_min_confidence: optional_f64(
            config,
            "execution",
            "reversal_min_confidence",
            ex.reversal_min_confidence,
        )?,
        flatten_hour: optional_int(config, "execution", "flatten_hour", None)?.map(|h| h as u32),
        auto_stop_drawdown_pct: optional_f64(
            config,
            "execution",
            "auto_stop_drawdown_pct",
            ex.auto_stop_drawdown_pct,
        )?,
    };

    let bt = BacktestConfig::default();
    let backtest = BacktestConfig {
        warmup_bars: config.get_int("backtest", "warmup_bars", bt.warmup_bars as i64) as usize,
        seed: config.get_int("backtest", "seed", bt.seed as i64) as u64,
        initial_capital: config.get_double("backtest", "initial_capital", bt.initial_capital),
    };

    let wf = WalkForwardConfig::default();
    let walk_forward = WalkForwardConfig {
        enabled: config.get_bool("walk_forward", "enabled", wf.enabled),
        window_bars: config.get_int("walk_forward", "window_bars", wf.window_bars as i64) as usize,
        step_bars: config.get_int("walk_forward", "step_bars", wf.step_bars as i64) as usize,
        partial: config
            .get_string("walk_forward", "partial")
            .and_then(|s| PartialWindowPolicy::parse(&s))
            .unwrap_or(wf.partial),
    };

    let ap = ApprovalThresholds::default();
    let approval = ApprovalThresholds {
        min_win_rate_pct: optional_f64(config, "approval", "min_win_rate", ap.min_win_rate_pct)?,
        min_profit_factor: optional_f64(config, "approval", "min_profit_factor", ap.min_profit_factor)?,
        max_drawdown_pct: optional_f64(config, "approval", "max_drawdown", ap.max_drawdown_pct)?,
        min_trades: optional_int(
            config,
            "approval",
            "min_trades",
            ap.min_trades.map(|n| n as i64),
        )?
        .map(|n| n as usize),
        min_consistency: optional_f64(config, "approval", "min_consistency", ap.min_consistency)?,
    };

    Ok(StrategyConfig {
        name: config
            .get_string("backtest", "name")
            .unwrap_or(defaults.name),
        instrument,
        indicators,
        regime,
        policy,
        patterns: list(config, "patterns", "enabled").unwrap_or(defaults.patterns),
        pattern_params,
        min_agreement: config.get_int("patterns", "min_agreement", defaults.min_agreement as i64)
            as usize,
        costs,
        execution,
        backtest,
        walk_forward,
        approval,
    })
}

/// Exchange offset from `[data] utc_offset_minutes`.
pub fn exchange_offset(config: &dyn ConfigPort) -> Result<FixedOffset, StuntmanError> {
    let minutes = config.get_int("data", "utc_offset_minutes", DEFAULT_UTC_OFFSET_MINUTES);
    FixedOffset::east_opt((minutes * 60) as i32).ok_or_else(|| {
        StuntmanError::invalid("data", "utc_offset_minutes", "offset out of range")
    })
}

fn data_path(config: &dyn ConfigPort, data_override: Option<&Path>) -> Result<PathBuf, StuntmanError> {
    match data_override {
        Some(p) => Ok(p.to_path_buf()),
        None => config
            .get_string("data", "path")
            .map(PathBuf::from)
            .ok_or_else(|| StuntmanError::ConfigMissing {
                section: "data".to_string(),
                key: "path".to_string(),
            }),
    }
}

/// Fetch and validate the candle series for the configured instrument.
pub fn load_series(
    data_port: &dyn MarketDataPort,
    symbol: &str,
    offset: FixedOffset,
) -> Result<CandleSeries, StuntmanError> {
    let raw = data_port.fetch_candles(symbol)?;
    CandleSeries::from_raw(symbol, &raw, offset)
}

/// Load, validate and build: the first three stages of every command.
fn prepare(config_path: &Path) -> Result<(FileConfigAdapter, StrategyConfig), StuntmanError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_strategy_config(&adapter)?;
    let strategy_config = build_strategy_config(&adapter)?;
    Ok((adapter, strategy_config))
}

fn run_backtest_command(
    config_path: &Path,
    data_override: Option<&Path>,
    seed: Option<u64>,
    output: Option<&Path>,
    state_dir: Option<&Path>,
    walk_forward: bool,
) -> ExitCode {
    // Stage 1: Load, validate and build the strategy
    let (adapter, mut strategy_config) = match prepare(config_path) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    if let Some(seed) = seed {
        strategy_config.backtest.seed = seed;
    }
    if walk_forward {
        strategy_config.walk_forward.enabled = true;
    }
    let strategy = match Strategy::from_config(strategy_config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let config = &strategy.config;
    eprintln!(
        "Strategy: {} ({:?}, {} patterns)",
        config.name,
        config.policy,
        config.patterns.len()
    );

    // Stage 2: Load candles
    let series = match data_path(&adapter, data_override)
        .and_then(|path| {
            eprintln!("Loading candles from {}", path.display());
            let offset = exchange_offset(&adapter)?;
            load_series(&CsvAdapter::new(path), &config.instrument.symbol, offset)
        }) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    eprintln!(
        "  {} bars for {} ({} filtered)",
        series.len(),
        series.symbol,
        series.filtered
    );

    // Stage 3: Run
    let (trades, windows, report) = if config.walk_forward.enabled {
        eprintln!(
            "Running walk-forward: window {} bars, step {} bars",
            config.walk_forward.window_bars, config.walk_forward.step_bars
        );
        let windows = match run_walk_forward(&series.candles, &strategy, config.backtest.seed) {
            Ok(w) => w,
            Err(e) => return fail(e),
        };
        let report = PerformanceReport::from_windows(&windows, config.backtest.initial_capital);
        let trades: Vec<_> = windows.iter().flat_map(|w| w.trades.iter().cloned()).collect();
        (trades, windows, report)
    } else {
        eprintln!("Running backtest: seed {}", config.backtest.seed);
        let run = match state_dir {
            Some(dir) => JsonStateAdapter::new(dir.to_path_buf())
                .load_state()
                .and_then(|saved| {
                    if saved.is_some() {
                        eprintln!("Resuming from state in {}", dir.display());
                    }
                    resume_backtest(&series.candles, &strategy, saved.unwrap_or_default())
                }),
            None => run_backtest(&series.candles, &strategy),
        };
        let result = match run {
            Ok(r) => r,
            Err(e) => return fail(e),
        };
        eprintln!(
            "  {} signals, {} rejected, {} blocked",
            result.signals, result.rejected, result.blocked
        );
        if let Some(dir) = state_dir {
            let store = JsonStateAdapter::new(dir.to_path_buf());
            if let Err(e) = store.save_state(&result.final_state) {
                return fail(e);
            }
        }
        let report = PerformanceReport::from_trades(&result.trades, config.backtest.initial_capital);
        (result.trades, Vec::new(), report)
    };

    // Stage 4: Approval
    let verdict = evaluate(&report, &config.approval);
    print_summary(&report, &verdict);

    // Stage 5: Learned parameters
    if let Some(dir) = state_dir {
        let store = JsonStateAdapter::new(dir.to_path_buf());
        let saved = store.load_parameters().and_then(|mut params| {
            params.record(&trades);
            store.save_parameters(&params)
        });
        if let Err(e) = saved {
            return fail(e);
        }
        eprintln!("State saved to: {}", dir.display());
    }

    // Stage 6: Reports
    if let Some(dir) = output {
        let reporter = FileReportAdapter::new(dir.to_path_buf());
        let written = reporter
            .write_trades(&trades)
            .and_then(|()| {
                if windows.is_empty() {
                    Ok(())
                } else {
                    reporter.write_windows(&windows)
                }
            })
            .and_then(|()| reporter.write_summary(config, &report, &verdict));
        if let Err(e) = written {
            return fail(e);
        }
        eprintln!("\nReport written to: {}", reporter.dir().display());
    }

    ExitCode::SUCCESS
}

fn print_summary(report: &PerformanceReport, verdict: &ApprovalVerdict) {
    eprintln!("\n=== Results ===");
    eprintln!("Total Trades:     {}", report.total_trades);
    eprintln!("Win Rate:         {:.1}%", report.win_rate_pct);
    eprintln!("Profit Factor:    {:.2}", report.profit_factor);
    eprintln!("Net P&L:          {:.2}", report.net_pnl);
    eprintln!("Avg Win / Loss:   {:.2} / {:.2}", report.avg_win, report.avg_loss);
    eprintln!("Max Drawdown:     -{:.1}%", report.max_drawdown_pct);
    eprintln!(
        "Consistency:      {:.2} over {} {:?}",
        report.consistency, report.consistency_periods, report.consistency_basis
    );

    eprintln!("\n=== Approval ===");
    for (criterion, check) in &verdict.per_criterion {
        eprintln!(
            "  {:<16} {}  actual {:.2}, threshold {:.2}",
            criterion.name(),
            if check.passed { "pass" } else { "FAIL" },
            check.actual,
            check.threshold
        );
    }
    if verdict.passed {
        eprintln!("APPROVED");
    } else {
        eprintln!("REJECTED");
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    let strategy_config = match prepare(config_path) {
        Ok((_, c)) => c,
        Err(e) => return fail(e),
    };
    let strategy = match Strategy::from_config(strategy_config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let config = &strategy.config;
    eprintln!(
        "\nInstrument: {} (tick {}, ${}/pt)",
        config.instrument.symbol, config.instrument.tick_size, config.instrument.point_value
    );
    eprintln!("Policy:     {:?}", config.policy);
    eprintln!("Patterns:");
    for id in strategy.pattern_ids() {
        eprintln!("  {}", id);
    }
    eprintln!(
        "Warm-up:    {} bars (longest indicator {})",
        config.backtest.warmup_bars,
        config.indicators.longest_warmup()
    );
    if config.backtest.warmup_bars < config.indicators.longest_warmup() {
        eprintln!("warning: warm-up is shorter than the longest indicator lookback");
    }

    eprintln!("\nStrategy configuration is valid.");
    ExitCode::SUCCESS
}

fn run_indicators(config_path: &Path, data_override: Option<&Path>) -> ExitCode {
    let (adapter, config) = match prepare(config_path) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };

    let series = match data_path(&adapter, data_override).and_then(|path| {
        let offset = exchange_offset(&adapter)?;
        load_series(&CsvAdapter::new(path), &config.instrument.symbol, offset)
    }) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let indicators = IndicatorSet::compute(&series.candles, &config.indicators);
    let regimes = classify_all(&indicators, &config.regime);
    let last = series.len() - 1;
    let snapshot = indicators.snapshot(last);

    println!("{} bar {} at {}", series.symbol, last, series.candles[last].time.to_rfc3339());
    println!("regime: {}", regimes[last]);
    for (name, value) in snapshot.defined() {
        println!("{:<16} {:.4}", name, value);
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_uses_defaults_for_empty_config() {
        let adapter = FileConfigAdapter::from_string("").unwrap();
        let config = build_strategy_config(&adapter).unwrap();
        assert_eq!(config, StrategyConfig::default());
    }

    #[test]
    fn build_reads_sections() {
        let adapter = FileConfigAdapter::from_string(
            r#"
[instrument]
symbol = nq
tick_size = 0.25
point_value = 20

[indicators]
bollinger_stddev = 2.5

[patterns]
policy = ensemble
enabled = rsi, macd, vwap
min_agreement = 2

[execution]
max_hold_bars = off
flatten_hour = 15

[approval]
min_trades = 30
min_consistency = off

[walk_forward]
enabled = true
partial = flag
"#,
        )
        .unwrap();
        let config = build_strategy_config(&adapter).unwrap();
        assert_eq!(config.instrument.symbol, "NQ");
        assert_eq!(config.instrument.point_value, 20.0);
        assert_eq!(config.indicators.bollinger_mult_x100, 250);
        assert_eq!(config.policy, PatternPolicy::Ensemble);
        assert_eq!(config.patterns, vec!["rsi", "macd", "vwap"]);
        assert_eq!(config.min_agreement, 2);
        assert_eq!(config.execution.max_hold_bars, None);
        assert_eq!(config.execution.flatten_hour, Some(15));
        assert_eq!(config.approval.min_trades, Some(30));
        assert_eq!(config.approval.min_consistency, None);
        assert!(config.walk_forward.enabled);
        assert_eq!(config.walk_forward.partial, PartialWindowPolicy::Flag);
    }

    #[test]
    fn offset_defaults_to_eastern() {
        let adapter = FileConfigAdapter::from_string("").unwrap();
        assert_eq!(exchange_offset(&adapter).unwrap().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn data_path_requires_config_or_flag() {
        let adapter = FileConfigAdapter::from_string("").unwrap();
        assert!(matches!(
            data_path(&adapter, None).unwrap_err(),
            StuntmanError::ConfigMissing { .. }
        ));
        assert_eq!(
            data_path(&adapter, Some(Path::new("bars.csv"))).unwrap(),
            PathBuf::from("bars.csv")
        );
    }
}
