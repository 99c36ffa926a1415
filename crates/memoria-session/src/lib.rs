// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use memoria_ids::IdGenerator;
use memoria_kernel::{IdKind, StoreFailure};
use memoria_store::{map_rusqlite_err, Store};

/// §3 Session row — a singleton created once on first connection to a fresh
/// store. `overlay` is the session-scoped system-prompt fragment the context
/// assembler appends after `<identity>`/`<behavior>` (§4.6).
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub overlay: Option<String>,
}

pub struct SessionStore {
    store: Store,
}

const SINGLETON_KEY: i64 = 1;

impl SessionStore {
    pub fn open(store: Store, ids: IdGenerator) -> Result<Self, StoreFailure> {
        store.migrate(
            "
            CREATE TABLE IF NOT EXISTS session (
                singleton  INTEGER NOT NULL PRIMARY KEY CHECK (singleton = 1),
                id         TEXT    NOT NULL,
                created_at TEXT    NOT NULL,
                overlay    TEXT
            ) STRICT;
            ",
        )?;
        let this = Self { store };
        this.ensure_created(&ids)?;
        Ok(this)
    }

    fn ensure_created(&self, ids: &IdGenerator) -> Result<(), StoreFailure> {
        let exists: bool = self
            .store
            .conn()
            .query_row("SELECT EXISTS(SELECT 1 FROM session WHERE singleton = 1)", [], |r| r.get(0))
            .map_err(map_rusqlite_err)?;
        if exists {
            return Ok(());
        }
        let id = ids.next(IdKind::Session);
        let created_at = Utc::now();
        self.store
            .conn()
            .execute(
                "INSERT INTO session (singleton, id, created_at, overlay) VALUES (?1, ?2, ?3, NULL)",
                rusqlite::params![SINGLETON_KEY, id, created_at.to_rfc3339()],
            )
            .map_err(map_rusqlite_err)?;
        Ok(())
    }

    pub fn get(&self) -> Result<SessionRow, StoreFailure> {
        self.store
            .conn()
            .query_row(
                "SELECT id, created_at, overlay FROM session WHERE singleton = 1",
                [],
                |row| {
                    let created_at: String = row.get(1)?;
                    Ok(SessionRow {
                        id: row.get(0)?,
                        created_at: DateTime::parse_from_rfc3339(&created_at)
                            .map(|d| d.with_timezone(&Utc))
                            .unwrap_or_else(|_| Utc::now()),
                        overlay: row.get(2)?,
                    })
                },
            )
            .map_err(map_rusqlite_err)
    }

    /// Sets or clears (`None`) the session-scoped system-prompt fragment.
    pub fn set_overlay(&self, overlay: Option<&str>) -> Result<(), StoreFailure> {
        self.store
            .conn()
            .execute("UPDATE session SET overlay = ?1 WHERE singleton = 1", [overlay])
            .map_err(map_rusqlite_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_a_fresh_store_creates_the_singleton_once() {
        let store = Store::open_in_memory().unwrap();
        let sessions = SessionStore::open(store, IdGenerator::new()).unwrap();
        let row = sessions.get().unwrap();
        assert!(row.overlay.is_none());
    }

    #[test]
    fn id_never_changes_across_reopen_on_the_same_store() {
        let store = Store::open_in_memory().unwrap();
        let first = SessionStore::open(store.clone(), IdGenerator::new()).unwrap().get().unwrap();
        let second = SessionStore::open(store, IdGenerator::new()).unwrap().get().unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn overlay_can_be_set_and_cleared() {
        let store = Store::open_in_memory().unwrap();
        let sessions = SessionStore::open(store, IdGenerator::new()).unwrap();
        sessions.set_overlay(Some("extra project context")).unwrap();
        assert_eq!(sessions.get().unwrap().overlay.as_deref(), Some("extra project context"));
        sessions.set_overlay(None).unwrap();
        assert!(sessions.get().unwrap().overlay.is_none());
    }
}
