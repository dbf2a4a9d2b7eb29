//! Configuration validation.
//!
//! Validates every config field before a run. Absent keys fall back to the
//! defaults and always pass; present keys must parse and be in range.

use crate::domain::error::StuntmanError;
use crate::domain::pattern::PATTERN_NAMES;
use crate::domain::strategy::PatternPolicy;
use crate::domain::walk_forward::PartialWindowPolicy;
use crate::ports::config_port::ConfigPort;

/// Largest accepted exchange offset from UTC, in minutes.
const MAX_UTC_OFFSET_MINUTES: i64 = 18 * 60;

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    validate_data(config)?;
    validate_instrument(config)?;
    validate_indicators(config)?;
    validate_regime(config)?;
    validate_patterns(config)?;
    validate_costs(config)?;
    validate_execution(config)?;
    validate_approval(config)?;
    validate_walk_forward(config)?;
    validate_backtest(config)?;
    Ok(())
}

/// A float key that may be set to `off` (or `none`) to disable it.
pub(crate) fn optional_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Option<f64>,
) -> Result<Option<f64>, StuntmanError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) if is_off(&s) => Ok(None),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| StuntmanError::invalid(section, key, format!("'{}' is not a number", s))),
    }
}

/// An integer key that may be set to `off` (or `none`) to disable it.
pub(crate) fn optional_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Option<i64>,
) -> Result<Option<i64>, StuntmanError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) if is_off(&s) => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| StuntmanError::invalid(section, key, format!("'{}' is not an integer", s))),
    }
}

/// Comma-separated list; empty items are dropped.
pub(crate) fn list(config: &dyn ConfigPort, section: &str, key: &str) -> Option<Vec<String>> {
    config.get_string(section, key).map(|s| {
        s.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

fn is_off(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "off" | "none" | "")
}

fn require(ok: bool, section: &str, key: &str, reason: &str) -> Result<(), StuntmanError> {
    if ok {
        Ok(())
    } else {
        Err(StuntmanError::invalid(section, key, reason))
    }
}

fn check_positive_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), StuntmanError> {
    if let Some(v) = optional_f64(config, section, key, Some(1.0))? {
        require(v > 0.0, section, key, &format!("{} must be positive", key))?;
    }
    Ok(())
}

fn check_non_negative_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), StuntmanError> {
    if let Some(v) = optional_f64(config, section, key, Some(0.0))? {
        require(v >= 0.0, section, key, &format!("{} must be non-negative", key))?;
    }
    Ok(())
}

fn check_positive_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), StuntmanError> {
    if let Some(v) = optional_int(config, section, key, Some(1))? {
        require(v >= 1, section, key, &format!("{} must be at least 1", key))?;
    }
    Ok(())
}

fn check_fraction(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), StuntmanError> {
    if let Some(v) = optional_f64(config, section, key, Some(0.0))? {
        require(
            (0.0..=1.0).contains(&v),
            section,
            key,
            &format!("{} must be between 0 and 1", key),
        )?;
    }
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    if let Some(offset) = optional_int(config, "data", "utc_offset_minutes", Some(0))? {
        require(
            offset.abs() <= MAX_UTC_OFFSET_MINUTES,
            "data",
            "utc_offset_minutes",
            "utc_offset_minutes must be within 18 hours of UTC",
        )?;
    }
    Ok(())
}

fn validate_instrument(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    if let Some(symbol) = config.get_string("instrument", "symbol") {
        require(
            !symbol.trim().is_empty(),
            "instrument",
            "symbol",
            "symbol must not be empty",
        )?;
    }
    check_positive_f64(config, "instrument", "tick_size")?;
    check_positive_f64(config, "instrument", "point_value")?;
    Ok(())
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    for key in [
        "ema_short",
        "ema_medium",
        "ema_long",
        "sma",
        "rsi",
        "atr",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "bollinger_period",
        "adx",
    ] {
        check_positive_int(config, "indicators", key)?;
    }
    check_positive_f64(config, "indicators", "bollinger_stddev")?;

    let fast = config.get_int("indicators", "macd_fast", 12);
    let slow = config.get_int("indicators", "macd_slow", 26);
    require(
        fast < slow,
        "indicators",
        "macd_fast",
        "macd_fast must be shorter than macd_slow",
    )
}

fn validate_regime(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    check_positive_int(config, "regime", "min_lookback")?;
    check_positive_int(config, "regime", "slope_lookback")?;
    check_non_negative_f64(config, "regime", "slope_pct")?;
    check_non_negative_f64(config, "regime", "strong_slope_pct")?;

    let slope = config.get_double("regime", "slope_pct", 0.05);
    let strong = config.get_double("regime", "strong_slope_pct", 0.15);
    require(
        strong >= slope,
        "regime",
        "strong_slope_pct",
        "strong_slope_pct must be at least slope_pct",
    )?;

    if let Some(mid) = optional_f64(config, "regime", "rsi_midline", Some(50.0))? {
        require(
            (0.0..=100.0).contains(&mid),
            "regime",
            "rsi_midline",
            "rsi_midline must be between 0 and 100",
        )?;
    }
    Ok(())
}

fn validate_patterns(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    if let Some(policy) = config.get_string("patterns", "policy") {
        require(
            PatternPolicy::parse(&policy).is_some(),
            "patterns",
            "policy",
            "policy must be first_match or ensemble",
        )?;
    }

    if let Some(enabled) = list(config, "patterns", "enabled") {
        require(
            !enabled.is_empty(),
            "patterns",
            "enabled",
            "at least one pattern must be enabled",
        )?;
        if let Some(unknown) = enabled.iter().find(|n| !PATTERN_NAMES.contains(&n.as_str())) {
            return Err(StuntmanError::invalid(
                "patterns",
                "enabled",
                format!("unknown pattern '{}'", unknown),
            ));
        }
    }

    check_positive_int(config, "patterns", "min_agreement")?;
    check_positive_int(config, "patterns", "opening_range_bars")?;
    check_positive_f64(config, "patterns", "stop_atr")?;
    check_positive_f64(config, "patterns", "target_atr")?;
    check_non_negative_f64(config, "patterns", "touch_tolerance_atr")?;
    check_positive_f64(config, "patterns", "orb_target_fraction")?;
    check_non_negative_f64(config, "patterns", "min_adx")?;

    let oversold = config.get_double("patterns", "rsi_oversold", 30.0);
    let overbought = config.get_double("patterns", "rsi_overbought", 70.0);
    require(
        (0.0..=100.0).contains(&oversold) && (0.0..=100.0).contains(&overbought),
        "patterns",
        "rsi_oversold",
        "RSI levels must be between 0 and 100",
    )?;
    require(
        oversold < overbought,
        "patterns",
        "rsi_oversold",
        "rsi_oversold must be below rsi_overbought",
    )
}

fn validate_costs(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    check_fraction(config, "costs", "reject_probability")?;
    check_fraction(config, "costs", "jitter")?;
    for key in [
        "base_slippage_ticks",
        "volatility_factor",
        "max_slippage_ticks",
        "commission",
        "exchange_fee",
        "regulatory_fee",
        "spread_ticks",
    ] {
        check_non_negative_f64(config, "costs", key)?;
    }
    Ok(())
}

fn validate_execution(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    check_positive_int(config, "execution", "contracts")?;
    check_positive_int(config, "execution", "max_contracts")?;
    check_positive_int(config, "execution", "max_hold_bars")?;
    check_positive_int(config, "execution", "max_trades_per_day")?;
    check_positive_f64(config, "execution", "max_daily_loss")?;
    check_fraction(config, "execution", "reversal_min_confidence")?;

    if let Some(hour) = optional_int(config, "execution", "flatten_hour", None)? {
        require(
            (0..24).contains(&hour),
            "execution",
            "flatten_hour",
            "flatten_hour must be between 0 and 23",
        )?;
    }
    if let Some(pct) = optional_f64(config, "execution", "auto_stop_drawdown_pct", None)? {
        require(
            pct > 0.0 && pct <= 100.0,
            "execution",
            "auto_stop_drawdown_pct",
            "auto_stop_drawdown_pct is a percentage above 0 and at most 100",
        )?;
    }
    Ok(())
}

fn validate_approval(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    for key in ["min_win_rate", "max_drawdown"] {
        if let Some(v) = optional_f64(config, "approval", key, None)? {
            require(
                (0.0..=100.0).contains(&v),
                "approval",
                key,
                &format!("{} is a percentage between 0 and 100", key),
            )?;
        }
    }
    check_non_negative_f64(config, "approval", "min_profit_factor")?;
    check_fraction(config, "approval", "min_consistency")?;
    if let Some(v) = optional_int(config, "approval", "min_trades", None)? {
        require(v >= 0, "approval", "min_trades", "min_trades must be non-negative")?;
    }
    Ok(())
}

fn validate_walk_forward(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    check_positive_int(config, "walk_forward", "window_bars")?;
    check_positive_int(config, "walk_forward", "step_bars")?;

    let window = config.get_int("walk_forward", "window_bars", 2000);
    let step = config.get_int("walk_forward", "step_bars", 1000);
    require(
        step <= window,
        "walk_forward",
        "step_bars",
        "step_bars must not exceed window_bars",
    )?;

    // checked even when disabled: the CLI can switch walk-forward on
    let warmup = optional_int(config, "backtest", "warmup_bars", Some(100))?.unwrap_or(0);
    require(
        window > warmup,
        "walk_forward",
        "window_bars",
        "window_bars must exceed backtest warmup_bars",
    )?;

    if let Some(partial) = config.get_string("walk_forward", "partial") {
        require(
            PartialWindowPolicy::parse(&partial).is_some(),
            "walk_forward",
            "partial",
            "partial must be exclude or flag",
        )?;
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), StuntmanError> {
    check_positive_f64(config, "backtest", "initial_capital")?;
    if let Some(warmup) = optional_int(config, "backtest", "warmup_bars", Some(0))? {
        require(warmup >= 0, "backtest", "warmup_bars", "warmup_bars must be non-negative")?;
    }
    if let Some(seed) = optional_int(config, "backtest", "seed", Some(0))? {
        require(seed >= 0, "backtest", "seed", "seed must be non-negative")?;
    }
    Ok(())
}
