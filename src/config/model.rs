// src/config/model.rs

use serde::Deserialize;

use crate::job::JobPolicy;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [policy]
/// adaptive_throttle = true
/// tps_pause_threshold = 15.0
/// batch_size_max = 512
///
/// [runner]
/// poll_interval_ms = 50
///
/// [audit]
/// db_path = "data/craftops.sqlite"
/// ```
///
/// All sections are optional and have defaults matching a vanilla server
/// running at 20 TPS / 50 ms per tick.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEngineConfig {
    /// Default throttle policy applied to new jobs, from `[policy]`.
    #[serde(default)]
    pub policy: PolicySection,

    /// Job runner behaviour, from `[runner]`.
    #[serde(default)]
    pub runner: RunnerSection,

    /// Metrics ticker behaviour, from `[metrics]`.
    #[serde(default)]
    pub metrics: MetricsSection,

    /// Audit log store, from `[audit]`.
    #[serde(default)]
    pub audit: AuditSection,
}

/// Validated engine configuration.
///
/// Construct via [`crate::config::load_and_validate`] or
/// `EngineConfig::try_from(raw)`; `EngineConfig::default()` yields the
/// built-in defaults (which are always valid).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub policy: PolicySection,
    pub runner: RunnerSection,
    pub metrics: MetricsSection,
    pub audit: AuditSection,
}

impl EngineConfig {
    /// Construct without re-running validation. Used by `validate.rs` after
    /// all checks have passed.
    pub(crate) fn new_unchecked(
        policy: PolicySection,
        runner: RunnerSection,
        metrics: MetricsSection,
        audit: AuditSection,
    ) -> Self {
        Self {
            policy,
            runner,
            metrics,
            audit,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: PolicySection::default(),
            runner: RunnerSection::default(),
            metrics: MetricsSection::default(),
            audit: AuditSection::default(),
        }
    }
}

/// `[policy]` section: the default throttle policy for new jobs.
///
/// Bounds clamp what the adaptive controller may do; `*_start` values seed a
/// job's initial `batch_size` / `delay_ms`.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicySection {
    #[serde(default = "default_adaptive_throttle")]
    pub adaptive_throttle: bool,

    /// Jobs auto-pause when the server TPS drops below this value.
    #[serde(default = "default_tps_pause_threshold")]
    pub tps_pause_threshold: f64,

    /// MSPT below this means the simulation has slack; tune up.
    #[serde(default = "default_mspt_lower_bound")]
    pub mspt_lower_bound: f64,

    /// MSPT above this means the simulation is under load; tune down.
    #[serde(default = "default_mspt_upper_bound")]
    pub mspt_upper_bound: f64,

    #[serde(default = "default_batch_size_min")]
    pub batch_size_min: usize,

    #[serde(default = "default_batch_size_max")]
    pub batch_size_max: usize,

    #[serde(default = "default_batch_size_start")]
    pub batch_size_start: usize,

    #[serde(default = "default_delay_ms_min")]
    pub delay_ms_min: u64,

    #[serde(default = "default_delay_ms_max")]
    pub delay_ms_max: u64,

    #[serde(default = "default_delay_ms_start")]
    pub delay_ms_start: u64,
}

fn default_adaptive_throttle() -> bool {
    true
}

fn default_tps_pause_threshold() -> f64 {
    15.0
}

fn default_mspt_lower_bound() -> f64 {
    25.0
}

fn default_mspt_upper_bound() -> f64 {
    45.0
}

fn default_batch_size_min() -> usize {
    16
}

fn default_batch_size_max() -> usize {
    512
}

fn default_batch_size_start() -> usize {
    64
}

fn default_delay_ms_min() -> u64 {
    0
}

fn default_delay_ms_max() -> u64 {
    1000
}

fn default_delay_ms_start() -> u64 {
    100
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            adaptive_throttle: default_adaptive_throttle(),
            tps_pause_threshold: default_tps_pause_threshold(),
            mspt_lower_bound: default_mspt_lower_bound(),
            mspt_upper_bound: default_mspt_upper_bound(),
            batch_size_min: default_batch_size_min(),
            batch_size_max: default_batch_size_max(),
            batch_size_start: default_batch_size_start(),
            delay_ms_min: default_delay_ms_min(),
            delay_ms_max: default_delay_ms_max(),
            delay_ms_start: default_delay_ms_start(),
        }
    }
}

impl PolicySection {
    /// The per-job policy carried by jobs created under this config.
    pub fn job_policy(&self) -> JobPolicy {
        JobPolicy {
            adaptive_throttle: self.adaptive_throttle,
            tps_pause_threshold: self.tps_pause_threshold,
            mspt_lower_bound: self.mspt_lower_bound,
            mspt_upper_bound: self.mspt_upper_bound,
            batch_size_min: self.batch_size_min,
            batch_size_max: self.batch_size_max,
            delay_ms_min: self.delay_ms_min,
            delay_ms_max: self.delay_ms_max,
        }
    }
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Upper bound on how long a paused runner sleeps before re-checking its
    /// job status. External pause/resume/cancel become visible within this
    /// interval even if the status-change wakeup is missed.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// `[metrics]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    /// Default interval for background metrics tickers.
    #[serde(default = "default_ticker_interval_ms")]
    pub ticker_interval_ms: u64,
}

fn default_ticker_interval_ms() -> u64 {
    1000
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            ticker_interval_ms: default_ticker_interval_ms(),
        }
    }
}

/// `[audit]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditSection {
    /// Path of the sqlite audit log database.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Page size used when a query does not specify a limit.
    #[serde(default = "default_page_size_default")]
    pub page_size_default: usize,

    /// Hard cap on query page sizes.
    #[serde(default = "default_page_size_max")]
    pub page_size_max: usize,
}

fn default_db_path() -> String {
    "data/craftops.sqlite".to_string()
}

fn default_page_size_default() -> usize {
    100
}

fn default_page_size_max() -> usize {
    500
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            page_size_default: default_page_size_default(),
            page_size_max: default_page_size_max(),
        }
    }
}
