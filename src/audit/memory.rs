// src/audit/memory.rs

//! In-memory audit store, for tests and ephemeral setups. Lost on restart.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::{
    decode_cursor, encode_cursor, AuditEntry, AuditPage, AuditQuery, AuditSink, NewAuditEntry,
};

#[derive(Debug)]
pub struct MemoryAuditStore {
    entries: Mutex<Vec<AuditEntry>>,
    page_size_default: usize,
    page_size_max: usize,
}

impl MemoryAuditStore {
    pub fn new(page_size_default: usize, page_size_max: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            page_size_default,
            page_size_max,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of stored entries. Handy for test assertions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self::new(100, 500)
    }
}

impl AuditSink for MemoryAuditStore {
    fn record(
        &self,
        entry: NewAuditEntry,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AuditEntry>> + Send + '_>> {
        Box::pin(async move {
            let stored = AuditEntry {
                id: Uuid::new_v4().to_string(),
                job_id: entry.job_id,
                user_id: entry.user_id,
                world_id: entry.world_id,
                command_type: entry.command_type,
                params: entry.params,
                estimated_blocks: entry.estimated_blocks,
                duration_ms: entry.duration_ms,
                created_at: entry.created_at,
            };
            self.lock().push(stored.clone());
            Ok(stored)
        })
    }

    fn query(
        &self,
        query: AuditQuery,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AuditPage>> + Send + '_>> {
        Box::pin(async move {
            let limit = query
                .limit
                .unwrap_or(self.page_size_default)
                .clamp(1, self.page_size_max);

            let cursor = match &query.cursor {
                Some(cursor) => {
                    let (at, id) = decode_cursor(cursor)?;
                    Some((OffsetDateTime::parse(&at, &Rfc3339)?, id))
                }
                None => None,
            };

            let mut matching: Vec<AuditEntry> = self
                .lock()
                .iter()
                .filter(|e| matches_filters(e, &query))
                .cloned()
                .collect();

            // Newest first, id as the tiebreaker, mirroring the sqlite store.
            matching.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });

            if let Some((cursor_at, cursor_id)) = cursor {
                matching.retain(|e| {
                    e.created_at < cursor_at
                        || (e.created_at == cursor_at && e.id < cursor_id)
                });
            }

            let has_more = matching.len() > limit;
            matching.truncate(limit);

            let next_cursor = if has_more {
                match matching.last() {
                    Some(last) => Some(encode_cursor(&last.created_at.format(&Rfc3339)?, &last.id)),
                    None => None,
                }
            } else {
                None
            };

            Ok(AuditPage {
                entries: matching,
                next_cursor,
            })
        })
    }
}

fn matches_filters(entry: &AuditEntry, query: &AuditQuery) -> bool {
    if let Some(user_id) = &query.user_id {
        if &entry.user_id != user_id {
            return false;
        }
    }
    if let Some(world_id) = &query.world_id {
        if &entry.world_id != world_id {
            return false;
        }
    }
    if let Some(command_type) = &query.command_type {
        if &entry.command_type != command_type {
            return false;
        }
    }
    if let Some(since) = query.since {
        if entry.created_at < since {
            return false;
        }
    }
    if let Some(until) = query.until {
        if entry.created_at > until {
            return false;
        }
    }
    true
}
