// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_ids::IdGenerator;
use memoria_kernel::{IdKind, StoreFailure};
use memoria_store::{map_rusqlite_err, Store};
use serde_json::Value;

use crate::types::BackgroundReport;

/// Inbox of subsystem reports surfaced to the next user turn (§3).
pub struct ReportInbox {
    store: Store,
    ids: IdGenerator,
}

impl ReportInbox {
    pub fn open(store: Store, ids: IdGenerator) -> Result<Self, StoreFailure> {
        Ok(Self { store, ids })
    }

    pub fn file(&self, subsystem: &str, report: Value) -> Result<BackgroundReport, StoreFailure> {
        let id = self.ids.next(IdKind::Report);
        self.store
            .conn()
            .execute(
                "INSERT INTO background_reports (id, subsystem, report, surfaced) VALUES (?1, ?2, ?3, 0)",
                rusqlite::params![id, subsystem, report.to_string()],
            )
            .map_err(map_rusqlite_err)?;
        Ok(BackgroundReport { id, subsystem: subsystem.to_string(), report, surfaced: false })
    }

    pub fn unsurfaced(&self) -> Result<Vec<BackgroundReport>, StoreFailure> {
        let conn = self.store.conn();
        let mut stmt = conn
            .prepare("SELECT id, subsystem, report, surfaced FROM background_reports WHERE surfaced = 0")
            .map_err(map_rusqlite_err)?;
        let rows = stmt
            .query_map([], row_to_report)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    pub fn mark_surfaced(&self, id: &str) -> Result<(), StoreFailure> {
        self.store
            .conn()
            .execute("UPDATE background_reports SET surfaced = 1 WHERE id = ?1", [id])
            .map_err(map_rusqlite_err)?;
        Ok(())
    }
}

fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<BackgroundReport> {
    let report_json: String = row.get(2)?;
    let surfaced: i64 = row.get(3)?;
    Ok(BackgroundReport {
        id: row.get(0)?,
        subsystem: row.get(1)?,
        report: serde_json::from_str(&report_json).unwrap_or(Value::Null),
        surfaced: surfaced != 0,
    })
}
