#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use craftops::audit::MemoryAuditStore;
use craftops::command::CommandPayload;
use craftops::config::EngineConfig;
use craftops::engine::{AllowAll, EditJobEngine, PermissionGate};
use craftops::metrics::MetricsSource;

use crate::fake_executor::RecordingExecutor;

/// Payload helpers mirroring the wire shapes the control layer submits.
pub fn set_block(x: i64, y: i64, z: i64, block: &str) -> CommandPayload {
    CommandPayload::new("setBlock", params(&[
        ("x", json!(x)),
        ("y", json!(y)),
        ("z", json!(z)),
        ("block", json!(block)),
    ]))
}

pub fn fill(from: [i64; 3], to: [i64; 3], block: &str) -> CommandPayload {
    CommandPayload::new("fill", params(&[
        ("from", json!(from)),
        ("to", json!(to)),
        ("block", json!(block)),
    ]))
}

pub fn replace(from: [i64; 3], to: [i64; 3], matches: &str, block: &str) -> CommandPayload {
    CommandPayload::new("replace", params(&[
        ("from", json!(from)),
        ("to", json!(to)),
        ("match", json!(matches)),
        ("block", json!(block)),
    ]))
}

pub fn paste_blueprint(blueprint_id: &str, origin: [i64; 3]) -> CommandPayload {
    CommandPayload::new("pasteBlueprint", params(&[
        ("blueprintId", json!(blueprint_id)),
        ("origin", json!(origin)),
    ]))
}

pub fn clone_region(from: [i64; 3], to: [i64; 3], dest: [i64; 3]) -> CommandPayload {
    CommandPayload::new("clone", params(&[
        ("from", json!(from)),
        ("to", json!(to)),
        ("dest", json!(dest)),
    ]))
}

fn params(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A permission gate that denies everything, for admission tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

impl PermissionGate for DenyAll {
    fn has_permission<'a>(
        &'a self,
        _identity: &'a str,
        _node: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + 'a>> {
        Box::pin(async { Ok(false) })
    }
}

/// A config tuned for tests: no initial inter-batch delay and a tight
/// runner poll so lifecycle tests settle quickly.
pub fn test_config() -> EngineConfig {
    let mut raw = EngineConfig::default();
    raw.policy.delay_ms_start = 0;
    raw.runner.poll_interval_ms = 10;
    raw
}

/// Builder assembling an engine around the recording executor and the
/// in-memory audit store.
pub struct EngineBuilder {
    config: EngineConfig,
    executor: Arc<RecordingExecutor>,
    permissions: Arc<dyn PermissionGate>,
    metrics: Option<Arc<dyn MetricsSource>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            executor: Arc::new(RecordingExecutor::new()),
            permissions: Arc::new(AllowAll),
            metrics: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_executor(mut self, executor: RecordingExecutor) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    pub fn with_permissions(mut self, permissions: impl PermissionGate + 'static) -> Self {
        self.permissions = Arc::new(permissions);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSource>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the engine, returning the fakes for assertions.
    pub fn build(self) -> (EditJobEngine, Arc<RecordingExecutor>, Arc<MemoryAuditStore>) {
        let audit = Arc::new(MemoryAuditStore::default());
        let engine = EditJobEngine::new(
            self.config,
            Arc::clone(&self.executor) as Arc<dyn craftops::exec::BlockExecutor>,
            Arc::clone(&audit) as Arc<dyn craftops::audit::AuditSink>,
            self.permissions,
            self.metrics,
        );
        (engine, self.executor, audit)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
