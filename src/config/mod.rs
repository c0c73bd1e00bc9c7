// src/config/mod.rs

//! Engine configuration loaded from TOML.
//!
//! - [`model`] holds the raw (serde) and validated config types.
//! - [`loader`] reads a config file from disk.
//! - [`validate`] turns a raw config into a validated [`EngineConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    AuditSection, EngineConfig, MetricsSection, PolicySection, RawEngineConfig, RunnerSection,
};
