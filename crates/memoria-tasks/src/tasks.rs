// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use memoria_ids::IdGenerator;
use memoria_kernel::{IdKind, StoreFailure};
use memoria_store::{map_rusqlite_err, Store};
use serde_json::Value;

use crate::types::{BackgroundTask, TaskStatus};

/// Tracked background tasks (§3). On startup, any row still `running`
/// transitions to `killed` and a report is filed — the scheduler's
/// `mark_missed_on_startup` idiom applied to process-crash recovery instead
/// of missed timer ticks.
pub struct TaskStore {
    store: Store,
    ids: IdGenerator,
}

impl TaskStore {
    pub fn open(store: Store, ids: IdGenerator) -> Result<Self, StoreFailure> {
        Ok(Self { store, ids })
    }

    pub fn create(&self, task_type: &str, description: &str) -> Result<BackgroundTask, StoreFailure> {
        let id = self.ids.next(IdKind::Task);
        let created_at = Utc::now();
        self.store
            .conn()
            .execute(
                "INSERT INTO background_tasks (id, task_type, description, status, result, error, created_at, completed_at)
                 VALUES (?1, ?2, ?3, 'running', NULL, NULL, ?4, NULL)",
                rusqlite::params![id, task_type, description, created_at.to_rfc3339()],
            )
            .map_err(map_rusqlite_err)?;
        Ok(BackgroundTask {
            id,
            task_type: task_type.to_string(),
            description: description.to_string(),
            status: TaskStatus::Running,
            result: None,
            error: None,
            created_at,
            completed_at: None,
        })
    }

    pub fn complete(&self, id: &str, result: Value) -> Result<(), StoreFailure> {
        self.finish(id, TaskStatus::Completed, Some(result), None)
    }

    pub fn fail(&self, id: &str, error: &str) -> Result<(), StoreFailure> {
        self.finish(id, TaskStatus::Failed, None, Some(error))
    }

    pub fn cancel(&self, id: &str) -> Result<(), StoreFailure> {
        self.finish(id, TaskStatus::Cancelled, None, None)
    }

    fn finish(&self, id: &str, status: TaskStatus, result: Option<Value>, error: Option<&str>) -> Result<(), StoreFailure> {
        let result_json = result.map(|v| v.to_string());
        let n = self
            .store
            .conn()
            .execute(
                "UPDATE background_tasks SET status = ?1, result = ?2, error = ?3, completed_at = ?4
                 WHERE id = ?5",
                rusqlite::params![status.as_str(), result_json, error, Utc::now().to_rfc3339(), id],
            )
            .map_err(map_rusqlite_err)?;
        if n == 0 {
            return Err(StoreFailure::not_found(format!("task {id}")));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<BackgroundTask>, StoreFailure> {
        let row = self.store.conn().query_row(
            "SELECT id, task_type, description, status, result, error, created_at, completed_at
             FROM background_tasks WHERE id = ?1",
            [id],
            row_to_task,
        );
        match row {
            Ok(task) => Ok(Some(task)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(map_rusqlite_err(e)),
        }
    }

    /// Called on startup (§4.10): files every row still `running` as
    /// `killed` and returns them so a report can be filed for each.
    pub fn recover_killed_tasks(&self) -> Result<Vec<BackgroundTask>, StoreFailure> {
        let conn = self.store.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, task_type, description, status, result, error, created_at, completed_at
                 FROM background_tasks WHERE status = 'running'",
            )
            .map_err(map_rusqlite_err)?;
        let killed: Vec<BackgroundTask> = stmt
            .query_map([], row_to_task)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();
        drop(stmt);
        let completed_at = Utc::now();
        for task in &killed {
            conn.execute(
                "UPDATE background_tasks SET status = 'killed', completed_at = ?1 WHERE id = ?2",
                rusqlite::params![completed_at.to_rfc3339(), task.id],
            )
            .map_err(map_rusqlite_err)?;
        }
        Ok(killed
            .into_iter()
            .map(|t| BackgroundTask { status: TaskStatus::Killed, completed_at: Some(completed_at), ..t })
            .collect())
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<BackgroundTask> {
    let status: String = row.get(3)?;
    let result: Option<String> = row.get(4)?;
    let created_at: String = row.get(6)?;
    let completed_at: Option<String> = row.get(7)?;
    Ok(BackgroundTask {
        id: row.get(0)?,
        task_type: row.get(1)?,
        description: row.get(2)?,
        status: TaskStatus::parse(&status).unwrap_or(TaskStatus::Failed),
        result: result.and_then(|s| serde_json::from_str(&s).ok()),
        error: row.get(5)?,
        created_at: parse_rfc3339(&created_at),
        completed_at: completed_at.map(|s| parse_rfc3339(&s)),
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}
