// src/config/validate.rs

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{CraftopsError, Result};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = CraftopsError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(EngineConfig::new_unchecked(
            raw.policy,
            raw.runner,
            raw.metrics,
            raw.audit,
        ))
    }
}

fn validate_raw_config(cfg: &RawEngineConfig) -> Result<()> {
    validate_policy(cfg)?;
    validate_runner(cfg)?;
    validate_metrics(cfg)?;
    validate_audit(cfg)?;
    Ok(())
}

fn validate_policy(cfg: &RawEngineConfig) -> Result<()> {
    let p = &cfg.policy;

    if p.batch_size_min == 0 {
        return Err(CraftopsError::ConfigError(
            "[policy].batch_size_min must be >= 1 (got 0)".to_string(),
        ));
    }
    if p.batch_size_min > p.batch_size_max {
        return Err(CraftopsError::ConfigError(format!(
            "[policy].batch_size_min ({}) must be <= batch_size_max ({})",
            p.batch_size_min, p.batch_size_max
        )));
    }
    if p.batch_size_start < p.batch_size_min || p.batch_size_start > p.batch_size_max {
        return Err(CraftopsError::ConfigError(format!(
            "[policy].batch_size_start ({}) must lie in [{}, {}]",
            p.batch_size_start, p.batch_size_min, p.batch_size_max
        )));
    }

    if p.delay_ms_min > p.delay_ms_max {
        return Err(CraftopsError::ConfigError(format!(
            "[policy].delay_ms_min ({}) must be <= delay_ms_max ({})",
            p.delay_ms_min, p.delay_ms_max
        )));
    }
    if p.delay_ms_start < p.delay_ms_min || p.delay_ms_start > p.delay_ms_max {
        return Err(CraftopsError::ConfigError(format!(
            "[policy].delay_ms_start ({}) must lie in [{}, {}]",
            p.delay_ms_start, p.delay_ms_min, p.delay_ms_max
        )));
    }

    if !(p.mspt_lower_bound < p.mspt_upper_bound) {
        return Err(CraftopsError::ConfigError(format!(
            "[policy].mspt_lower_bound ({}) must be < mspt_upper_bound ({})",
            p.mspt_lower_bound, p.mspt_upper_bound
        )));
    }
    if p.mspt_lower_bound < 0.0 {
        return Err(CraftopsError::ConfigError(format!(
            "[policy].mspt_lower_bound must be >= 0 (got {})",
            p.mspt_lower_bound
        )));
    }
    if p.tps_pause_threshold <= 0.0 {
        return Err(CraftopsError::ConfigError(format!(
            "[policy].tps_pause_threshold must be > 0 (got {})",
            p.tps_pause_threshold
        )));
    }

    Ok(())
}

fn validate_runner(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.runner.poll_interval_ms == 0 {
        return Err(CraftopsError::ConfigError(
            "[runner].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_metrics(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.metrics.ticker_interval_ms == 0 {
        return Err(CraftopsError::ConfigError(
            "[metrics].ticker_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_audit(cfg: &RawEngineConfig) -> Result<()> {
    let a = &cfg.audit;

    if a.db_path.trim().is_empty() {
        return Err(CraftopsError::ConfigError(
            "[audit].db_path must not be empty".to_string(),
        ));
    }
    if a.page_size_default == 0 {
        return Err(CraftopsError::ConfigError(
            "[audit].page_size_default must be >= 1 (got 0)".to_string(),
        ));
    }
    if a.page_size_default > a.page_size_max {
        return Err(CraftopsError::ConfigError(format!(
            "[audit].page_size_default ({}) must be <= page_size_max ({})",
            a.page_size_default, a.page_size_max
        )));
    }

    Ok(())
}
