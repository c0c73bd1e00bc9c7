// src/main.rs

use std::path::Path;

use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use craftops::audit::{AuditQuery, AuditSink, SqliteAuditStore};
use craftops::cli::{AuditArgs, CliCommand};
use craftops::config::{load_and_validate, EngineConfig};
use craftops::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let args = craftops::cli::parse();
    init_logging(args.log_level)?;

    match args.command {
        CliCommand::CheckConfig => {
            let cfg = load_and_validate(&args.config)?;
            print_config(&args.config, &cfg);
        }
        CliCommand::Audit(audit_args) => {
            let cfg = load_config_or_default(&args.config)?;
            run_audit_query(&cfg, audit_args).await?;
        }
    }

    Ok(())
}

/// For queries, a missing config file just means built-in defaults; only an
/// invalid file is an error.
fn load_config_or_default(path: &str) -> Result<EngineConfig> {
    if Path::new(path).exists() {
        Ok(load_and_validate(path)?)
    } else {
        debug!(config = %path, "config file not found; using defaults");
        Ok(EngineConfig::default())
    }
}

async fn run_audit_query(cfg: &EngineConfig, args: AuditArgs) -> Result<()> {
    let store = SqliteAuditStore::from_config(&cfg.audit)?;

    let query = AuditQuery {
        user_id: args.user,
        world_id: args.world,
        command_type: args.command_type,
        since: parse_timestamp(args.since.as_deref(), "--since")?,
        until: parse_timestamp(args.until.as_deref(), "--until")?,
        limit: args.limit,
        cursor: args.cursor,
    };

    let page = store.query(query).await?;

    for entry in &page.entries {
        println!("{}", serde_json::to_string(entry)?);
    }
    if let Some(cursor) = &page.next_cursor {
        eprintln!("next page: --cursor {cursor}");
    }

    Ok(())
}

fn parse_timestamp(value: Option<&str>, flag: &str) -> Result<Option<OffsetDateTime>> {
    match value {
        Some(s) => {
            let ts = OffsetDateTime::parse(s, &Rfc3339)
                .with_context(|| format!("{flag} must be an RFC3339 timestamp, got '{s}'"))?;
            Ok(Some(ts))
        }
        None => Ok(None),
    }
}

/// Output for `check-config`: the effective settings after defaults.
fn print_config(path: &str, cfg: &EngineConfig) {
    println!("craftops check-config: {path} OK");
    println!();

    let p = &cfg.policy;
    println!("[policy]");
    println!("  adaptive_throttle = {}", p.adaptive_throttle);
    println!("  tps_pause_threshold = {}", p.tps_pause_threshold);
    println!(
        "  mspt band = [{}, {}]",
        p.mspt_lower_bound, p.mspt_upper_bound
    );
    println!(
        "  batch_size = {} in [{}, {}]",
        p.batch_size_start, p.batch_size_min, p.batch_size_max
    );
    println!(
        "  delay_ms = {} in [{}, {}]",
        p.delay_ms_start, p.delay_ms_min, p.delay_ms_max
    );

    println!("[runner]");
    println!("  poll_interval_ms = {}", cfg.runner.poll_interval_ms);

    println!("[metrics]");
    println!("  ticker_interval_ms = {}", cfg.metrics.ticker_interval_ms);

    println!("[audit]");
    println!("  db_path = {}", cfg.audit.db_path);
    println!(
        "  page_size = {} (max {})",
        cfg.audit.page_size_default, cfg.audit.page_size_max
    );
}
