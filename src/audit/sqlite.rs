// src/audit/sqlite.rs

//! Sqlite-backed audit store.
//!
//! Schema and indexes match what the operator console queries by: user,
//! world, command type, and time. All sqlite work runs on the blocking
//! thread pool so a slow disk never stalls job tasks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{named_params, Connection};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::{
    decode_cursor, encode_cursor, AuditEntry, AuditPage, AuditQuery, AuditSink, NewAuditEntry,
};
use crate::config::AuditSection;
use crate::job::JobId;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS audit_logs (
  id TEXT PRIMARY KEY,
  job_id TEXT NOT NULL,
  user_id TEXT NOT NULL,
  world_id TEXT NOT NULL,
  command_type TEXT NOT NULL,
  params_json TEXT NOT NULL,
  estimated_blocks INTEGER NOT NULL,
  duration_ms INTEGER NOT NULL,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS audit_logs_created_at_idx ON audit_logs(created_at);
CREATE INDEX IF NOT EXISTS audit_logs_user_id_idx ON audit_logs(user_id);
CREATE INDEX IF NOT EXISTS audit_logs_world_id_idx ON audit_logs(world_id);
CREATE INDEX IF NOT EXISTS audit_logs_command_type_idx ON audit_logs(command_type);
";

#[derive(Debug, Clone)]
pub struct SqliteAuditStore {
    conn: Arc<Mutex<Connection>>,
    page_size_default: usize,
    page_size_max: usize,
}

impl SqliteAuditStore {
    /// Open (creating if needed) the database at `path` and bootstrap the
    /// schema.
    pub fn open(
        path: impl AsRef<Path>,
        page_size_default: usize,
        page_size_max: usize,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            page_size_default,
            page_size_max,
        })
    }

    pub fn from_config(cfg: &AuditSection) -> anyhow::Result<Self> {
        Self::open(&cfg.db_path, cfg.page_size_default, cfg.page_size_max)
    }

    fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.page_size_default)
            .clamp(1, self.page_size_max)
    }
}

impl AuditSink for SqliteAuditStore {
    fn record(
        &self,
        entry: NewAuditEntry,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AuditEntry>> + Send + '_>> {
        let conn = Arc::clone(&self.conn);
        Box::pin(async move {
            let stored = tokio::task::spawn_blocking(move || insert_entry(&conn, entry)).await??;
            Ok(stored)
        })
    }

    fn query(
        &self,
        query: AuditQuery,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AuditPage>> + Send + '_>> {
        let conn = Arc::clone(&self.conn);
        let limit = self.effective_limit(query.limit);
        Box::pin(async move {
            let page = tokio::task::spawn_blocking(move || run_query(&conn, query, limit)).await??;
            Ok(page)
        })
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|e| e.into_inner())
}

fn insert_entry(conn: &Mutex<Connection>, entry: NewAuditEntry) -> anyhow::Result<AuditEntry> {
    let id = Uuid::new_v4().to_string();
    let created_at = entry.created_at.format(&Rfc3339)?;
    let params_json = serde_json::to_string(&entry.params)?;

    let conn = lock(conn);
    conn.execute(
        "INSERT INTO audit_logs (
            id, job_id, user_id, world_id, command_type, params_json,
            estimated_blocks, duration_ms, created_at
        ) VALUES (
            :id, :job_id, :user_id, :world_id, :command_type, :params_json,
            :estimated_blocks, :duration_ms, :created_at
        )",
        named_params! {
            ":id": id,
            ":job_id": entry.job_id.to_string(),
            ":user_id": entry.user_id,
            ":world_id": entry.world_id,
            ":command_type": entry.command_type,
            ":params_json": params_json,
            ":estimated_blocks": entry.estimated_blocks as i64,
            ":duration_ms": entry.duration_ms as i64,
            ":created_at": created_at,
        },
    )?;

    Ok(AuditEntry {
        id,
        job_id: entry.job_id,
        user_id: entry.user_id,
        world_id: entry.world_id,
        command_type: entry.command_type,
        params: entry.params,
        estimated_blocks: entry.estimated_blocks,
        duration_ms: entry.duration_ms,
        created_at: entry.created_at,
    })
}

struct RawRow {
    id: String,
    job_id: String,
    user_id: String,
    world_id: String,
    command_type: String,
    params_json: String,
    estimated_blocks: i64,
    duration_ms: i64,
    created_at: String,
}

fn run_query(conn: &Mutex<Connection>, query: AuditQuery, limit: usize) -> anyhow::Result<AuditPage> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(user_id) = query.user_id {
        clauses.push("user_id = ?");
        binds.push(user_id);
    }
    if let Some(world_id) = query.world_id {
        clauses.push("world_id = ?");
        binds.push(world_id);
    }
    if let Some(command_type) = query.command_type {
        clauses.push("command_type = ?");
        binds.push(command_type);
    }
    if let Some(since) = query.since {
        clauses.push("created_at >= ?");
        binds.push(since.format(&Rfc3339)?);
    }
    if let Some(until) = query.until {
        clauses.push("created_at <= ?");
        binds.push(until.format(&Rfc3339)?);
    }
    if let Some(cursor) = &query.cursor {
        let (cursor_at, cursor_id) = decode_cursor(cursor)?;
        clauses.push("(created_at < ? OR (created_at = ? AND id < ?))");
        binds.push(cursor_at.clone());
        binds.push(cursor_at);
        binds.push(cursor_id);
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    // Fetch one extra row to detect whether another page exists.
    let sql = format!(
        "SELECT id, job_id, user_id, world_id, command_type, params_json,
                estimated_blocks, duration_ms, created_at
         FROM audit_logs
         {where_sql}
         ORDER BY created_at DESC, id DESC
         LIMIT {}",
        limit + 1
    );

    let conn = lock(conn);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(binds.iter()), |row| {
        Ok(RawRow {
            id: row.get(0)?,
            job_id: row.get(1)?,
            user_id: row.get(2)?,
            world_id: row.get(3)?,
            command_type: row.get(4)?,
            params_json: row.get(5)?,
            estimated_blocks: row.get(6)?,
            duration_ms: row.get(7)?,
            created_at: row.get(8)?,
        })
    })?;

    let mut raw: Vec<RawRow> = Vec::new();
    for row in rows {
        raw.push(row?);
    }

    let has_more = raw.len() > limit;
    raw.truncate(limit);

    let next_cursor = if has_more {
        raw.last().map(|row| encode_cursor(&row.created_at, &row.id))
    } else {
        None
    };

    let mut entries = Vec::with_capacity(raw.len());
    for row in raw {
        entries.push(AuditEntry {
            id: row.id,
            job_id: row.job_id.parse::<JobId>()?,
            user_id: row.user_id,
            world_id: row.world_id,
            command_type: row.command_type,
            params: serde_json::from_str(&row.params_json)?,
            estimated_blocks: row.estimated_blocks as u64,
            duration_ms: row.duration_ms as u64,
            created_at: OffsetDateTime::parse(&row.created_at, &Rfc3339)?,
        });
    }

    Ok(AuditPage {
        entries,
        next_cursor,
    })
}
