//! Configuration validation.
//!
//! Validates every recognised config field before a command runs.

use crate::domain::charges::{ChargeModel, DEFAULT_PER_ORDER_FEE};
use crate::domain::error::JournalError;
use crate::ports::config_port::ConfigPort;

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
pub const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), JournalError> {
    validate_per_order_fee(config)?;
    validate_log_level(config)?;
    validate_log_format(config)?;
    validate_journal_path(config)?;
    Ok(())
}

/// Charge model from `[charges]`, falling back to the default fee.
pub fn charge_model(config: &dyn ConfigPort) -> ChargeModel {
    ChargeModel::new(config.get_double("charges", "per_order_fee", DEFAULT_PER_ORDER_FEE))
}

/// `[logging] ansi`: colour the pretty log format. On unless switched off.
pub fn log_ansi(config: &dyn ConfigPort) -> bool {
    config.get_bool("logging", "ansi", true)
}

fn validate_per_order_fee(config: &dyn ConfigPort) -> Result<(), JournalError> {
    let Some(raw) = config.get_string("charges", "per_order_fee") else {
        return Ok(());
    };
    let invalid = |reason: &str| JournalError::ConfigInvalid {
        section: "charges".to_string(),
        key: "per_order_fee".to_string(),
        reason: reason.to_string(),
    };
    let fee: f64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid("per_order_fee must be a number"))?;
    if !fee.is_finite() || fee < 0.0 {
        return Err(invalid("per_order_fee must be a finite, non-negative amount"));
    }
    Ok(())
}

fn validate_log_level(config: &dyn ConfigPort) -> Result<(), JournalError> {
    match config.get_string("logging", "level") {
        Some(level) if !LOG_LEVELS.contains(&level.trim().to_lowercase().as_str()) => {
            Err(JournalError::ConfigInvalid {
                section: "logging".to_string(),
                key: "level".to_string(),
                reason: format!(
                    "unknown level '{}', expected one of {}",
                    level,
                    LOG_LEVELS.join(", ")
                ),
            })
        }
        _ => Ok(()),
    }
}

fn validate_log_format(config: &dyn ConfigPort) -> Result<(), JournalError> {
    match config.get_string("logging", "format") {
        Some(format) if !LOG_FORMATS.contains(&format.trim().to_lowercase().as_str()) => {
            Err(JournalError::ConfigInvalid {
                section: "logging".to_string(),
                key: "format".to_string(),
                reason: format!("unknown format '{}', expected pretty or json", format),
            })
        }
        _ => Ok(()),
    }
}

fn validate_journal_path(config: &dyn ConfigPort) -> Result<(), JournalError> {
    match config.get_string("journal", "path") {
        Some(p) if p.trim().is_empty() => Err(JournalError::ConfigInvalid {
            section: "journal".to_string(),
            key: "path".to_string(),
            reason: "path must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}
