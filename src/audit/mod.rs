// src/audit/mod.rs

//! Audit log for executed edit commands.
//!
//! Every command an Apply-mode run executes ends up as one audit record, so
//! any block change in a world can be traced back to a user, a job, and the
//! exact command params. The engine talks to an [`AuditSink`]; the sqlite
//! store is the production implementation, the memory store backs tests.

pub mod memory;
pub mod sqlite;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use time::OffsetDateTime;

use crate::job::JobId;

pub use memory::MemoryAuditStore;
pub use sqlite::SqliteAuditStore;

/// A record to be stored; the sink assigns the entry id.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub job_id: JobId,
    pub user_id: String,
    pub world_id: String,
    pub command_type: String,
    pub params: serde_json::Map<String, serde_json::Value>,
    pub estimated_blocks: u64,
    pub duration_ms: u64,
    pub created_at: OffsetDateTime,
}

/// A stored audit record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub job_id: JobId,
    pub user_id: String,
    pub world_id: String,
    pub command_type: String,
    pub params: serde_json::Map<String, serde_json::Value>,
    pub estimated_blocks: u64,
    pub duration_ms: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Filters for querying the log. All filters are conjunctive; the time
/// range is closed on both ends.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub user_id: Option<String>,
    pub world_id: Option<String>,
    pub command_type: Option<String>,
    pub since: Option<OffsetDateTime>,
    pub until: Option<OffsetDateTime>,
    /// Page size; clamped to the store's configured maximum.
    pub limit: Option<usize>,
    /// Opaque cursor from a previous page's `next_cursor`.
    pub cursor: Option<String>,
}

/// One page of query results, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPage {
    pub entries: Vec<AuditEntry>,
    /// Present when more rows exist beyond this page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Append/query store for audit records.
pub trait AuditSink: Send + Sync {
    fn record(
        &self,
        entry: NewAuditEntry,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AuditEntry>> + Send + '_>>;

    fn query(
        &self,
        query: AuditQuery,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AuditPage>> + Send + '_>>;
}

/// Keyset pagination cursor: `<created_at RFC3339>|<entry id>`.
///
/// RFC3339 timestamps with a fixed UTC offset sort lexicographically, so
/// the cursor pair orders exactly like the stored rows.
pub(crate) fn encode_cursor(created_at: &str, id: &str) -> String {
    format!("{created_at}|{id}")
}

pub(crate) fn decode_cursor(cursor: &str) -> anyhow::Result<(String, String)> {
    match cursor.split_once('|') {
        Some((created_at, id)) if !created_at.is_empty() && !id.is_empty() => {
            Ok((created_at.to_string(), id.to_string()))
        }
        _ => Err(anyhow::anyhow!("invalid audit cursor: {cursor}")),
    }
}
