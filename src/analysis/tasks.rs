// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process tracking of background analyses keyed by file id

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Failed entries kept before the oldest are evicted
pub const MAX_FAILED_TASKS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskState {
    Processing { started_at: DateTime<Utc> },
    Error { detail: String },
}

/// Identifies one run of a file's analysis
///
/// A task only settles the entry it started; if the entry was removed or
/// replaced in the meantime its outcome is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTicket(u64);

#[derive(Debug)]
struct TaskEntry {
    ticket: TaskTicket,
    state: TaskState,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    next_ticket: u64,
    entries: HashMap<Uuid, TaskEntry>,
}

/// Running and failed analyses
///
/// Completed runs are evicted straight away since their results live in the
/// store. Task states are lost on restart.
#[derive(Debug, Default)]
pub struct TaskTracker {
    inner: RwLock<Inner>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `file_id` as processing unless it already is
    ///
    /// Returns `None` when a task for the file is still running.
    pub async fn try_begin(&self, file_id: Uuid) -> Option<TaskTicket> {
        let mut inner = self.inner.write().await;
        if matches!(
            inner.entries.get(&file_id),
            Some(TaskEntry {
                state: TaskState::Processing { .. },
                ..
            })
        ) {
            return None;
        }

        inner.next_ticket += 1;
        let ticket = TaskTicket(inner.next_ticket);
        let now = Utc::now();
        inner.entries.insert(
            file_id,
            TaskEntry {
                ticket,
                state: TaskState::Processing { started_at: now },
                updated_at: now,
            },
        );
        Some(ticket)
    }

    /// Drop the entry for a finished run
    ///
    /// Returns false when the entry no longer belongs to `ticket`.
    pub async fn complete(&self, file_id: Uuid, ticket: TaskTicket) -> bool {
        let mut inner = self.inner.write().await;
        if !owns(&inner, file_id, ticket) {
            debug!("Discarding stale completion for file {}", file_id);
            return false;
        }
        inner.entries.remove(&file_id);
        true
    }

    /// Record a failed run
    ///
    /// Returns false when the entry no longer belongs to `ticket`.
    pub async fn fail(&self, file_id: Uuid, ticket: TaskTicket, detail: impl Into<String>) -> bool {
        let mut inner = self.inner.write().await;
        if !owns(&inner, file_id, ticket) {
            debug!("Discarding stale failure for file {}", file_id);
            return false;
        }
        inner.entries.insert(
            file_id,
            TaskEntry {
                ticket,
                state: TaskState::Error {
                    detail: detail.into(),
                },
                updated_at: Utc::now(),
            },
        );
        evict_old_failures(&mut inner);
        true
    }

    pub async fn get(&self, file_id: Uuid) -> Option<TaskState> {
        self.inner
            .read()
            .await
            .entries
            .get(&file_id)
            .map(|entry| entry.state.clone())
    }

    pub async fn remove(&self, file_id: Uuid) -> Option<TaskState> {
        self.inner
            .write()
            .await
            .entries
            .remove(&file_id)
            .map(|entry| entry.state)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

fn owns(inner: &Inner, file_id: Uuid, ticket: TaskTicket) -> bool {
    matches!(
        inner.entries.get(&file_id),
        Some(TaskEntry {
            ticket: current,
            state: TaskState::Processing { .. },
            ..
        }) if *current == ticket
    )
}

fn evict_old_failures(inner: &mut Inner) {
    let mut failed: Vec<(DateTime<Utc>, TaskTicket, Uuid)> = inner
        .entries
        .iter()
        .filter(|(_, entry)| matches!(entry.state, TaskState::Error { .. }))
        .map(|(id, entry)| (entry.updated_at, entry.ticket, *id))
        .collect();
    if failed.len() <= MAX_FAILED_TASKS {
        return;
    }

    failed.sort_by_key(|(at, ticket, _)| (*at, ticket.0));
    let excess = failed.len() - MAX_FAILED_TASKS;
    for (_, _, id) in failed.into_iter().take(excess) {
        inner.entries.remove(&id);
    }
}
