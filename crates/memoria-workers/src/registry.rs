// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Duration, Utc};
use memoria_ids::IdGenerator;
use memoria_kernel::{IdKind, StoreFailure};
use memoria_store::{map_rusqlite_err, Store};

use crate::schema;
use crate::types::{Worker, WorkerStatus, WorkerType};

/// Tracks start/running/completed/failed state for background jobs and
/// detects crashed workers on restart (§4.5), mirroring the scheduler
/// engine's `mark_missed_on_startup` recovery idiom.
pub struct WorkerRegistry {
    store: Store,
    ids: IdGenerator,
}

impl WorkerRegistry {
    pub fn open(store: Store, ids: IdGenerator) -> Result<Self, StoreFailure> {
        schema::migrate(&store)?;
        Ok(Self { store, ids })
    }

    pub fn create(&self, kind: WorkerType) -> Result<Worker, StoreFailure> {
        let id = self.ids.next(IdKind::Worker);
        let started_at = Utc::now();
        self.store
            .conn()
            .execute(
                "INSERT INTO workers (id, kind, status, started_at, completed_at, error)
                 VALUES (?1, ?2, 'running', ?3, NULL, NULL)",
                rusqlite::params![id, kind.as_str(), started_at.to_rfc3339()],
            )
            .map_err(map_rusqlite_err)?;
        Ok(Worker { id, kind, status: WorkerStatus::Running, started_at, completed_at: None, error: None })
    }

    pub fn complete(&self, id: &str) -> Result<(), StoreFailure> {
        self.finish(id, WorkerStatus::Completed, None)
    }

    pub fn fail(&self, id: &str, error: &str) -> Result<(), StoreFailure> {
        self.finish(id, WorkerStatus::Failed, Some(error))
    }

    fn finish(&self, id: &str, status: WorkerStatus, error: Option<&str>) -> Result<(), StoreFailure> {
        let completed_at = Utc::now();
        let n = self
            .store
            .conn()
            .execute(
                "UPDATE workers SET status = ?1, completed_at = ?2, error = ?3 WHERE id = ?4",
                rusqlite::params![status.as_str(), completed_at.to_rfc3339(), error, id],
            )
            .map_err(map_rusqlite_err)?;
        if n == 0 {
            return Err(StoreFailure::not_found(format!("worker {id}")));
        }
        Ok(())
    }

    pub fn get_running(&self) -> Result<Vec<Worker>, StoreFailure> {
        let conn = self.store.conn();
        let mut stmt = conn
            .prepare("SELECT id, kind, status, started_at, completed_at, error FROM workers WHERE status = 'running'")
            .map_err(map_rusqlite_err)?;
        let rows = stmt
            .query_map([], row_to_worker)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    /// Called on every process start (§4.5); any `running` row older than
    /// `stale_after` is transitioned to `failed("stale")`. This is the
    /// recovery point for crashed curation.
    pub fn cleanup_stale(&self, stale_after: Duration) -> Result<Vec<Worker>, StoreFailure> {
        let cutoff = Utc::now() - stale_after;
        let running = self.get_running()?;
        let mut recovered = Vec::new();
        for worker in running {
            if worker.started_at < cutoff {
                self.fail(&worker.id, "stale")?;
                recovered.push(Worker {
                    status: WorkerStatus::Failed,
                    completed_at: Some(Utc::now()),
                    error: Some("stale".to_string()),
                    ..worker
                });
            }
        }
        Ok(recovered)
    }
}

fn row_to_worker(row: &rusqlite::Row<'_>) -> rusqlite::Result<Worker> {
    let kind: String = row.get(1)?;
    let status: String = row.get(2)?;
    let started_at: String = row.get(3)?;
    let completed_at: Option<String> = row.get(4)?;
    Ok(Worker {
        id: row.get(0)?,
        kind: WorkerType::parse(&kind).unwrap_or(WorkerType::Distillation),
        status: WorkerStatus::parse(&status).unwrap_or(WorkerStatus::Failed),
        started_at: parse_rfc3339(&started_at),
        completed_at: completed_at.map(|s| parse_rfc3339(&s)),
        error: row.get(5)?,
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> WorkerRegistry {
        WorkerRegistry::open(Store::open_in_memory().unwrap(), IdGenerator::new()).unwrap()
    }

    #[test]
    fn create_starts_in_running_state() {
        let reg = registry();
        let w = reg.create(WorkerType::Distillation).unwrap();
        assert_eq!(w.status, WorkerStatus::Running);
        assert_eq!(reg.get_running().unwrap().len(), 1);
    }

    #[test]
    fn complete_removes_from_running() {
        let reg = registry();
        let w = reg.create(WorkerType::Consolidation).unwrap();
        reg.complete(&w.id).unwrap();
        assert!(reg.get_running().unwrap().is_empty());
    }

    #[test]
    fn fail_records_error() {
        let reg = registry();
        let w = reg.create(WorkerType::Research).unwrap();
        reg.fail(&w.id, "boom").unwrap();
        assert!(reg.get_running().unwrap().is_empty());
    }

    #[test]
    fn cleanup_stale_fails_old_running_workers() {
        let reg = registry();
        let w = reg.create(WorkerType::Reflection).unwrap();
        // Force started_at into the past to simulate staleness.
        reg.store
            .conn()
            .execute(
                "UPDATE workers SET started_at = ?1 WHERE id = ?2",
                rusqlite::params![(Utc::now() - Duration::hours(2)).to_rfc3339(), w.id],
            )
            .unwrap();
        let recovered = reg.cleanup_stale(Duration::minutes(30)).unwrap();
        assert_eq!(recovered.len(), 1);
        assert!(reg.get_running().unwrap().is_empty());
    }

    #[test]
    fn cleanup_stale_ignores_recent_running_workers() {
        let reg = registry();
        reg.create(WorkerType::Distillation).unwrap();
        let recovered = reg.cleanup_stale(Duration::minutes(30)).unwrap();
        assert!(recovered.is_empty());
        assert_eq!(reg.get_running().unwrap().len(), 1);
    }
}
