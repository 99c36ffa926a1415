// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use memoria_ids::IdGenerator;
use memoria_kernel::{IdKind, StoreFailure};
use memoria_store::{map_rusqlite_err, Store};

use crate::types::Alarm;

/// Timed, one-shot alarms polled at ~1 Hz by the turn coordinator (§4.10).
pub struct AlarmStore {
    store: Store,
    ids: IdGenerator,
}

impl AlarmStore {
    pub fn open(store: Store, ids: IdGenerator) -> Result<Self, StoreFailure> {
        Ok(Self { store, ids })
    }

    pub fn schedule(&self, fires_at: DateTime<Utc>, note: &str) -> Result<Alarm, StoreFailure> {
        let id = self.ids.next(IdKind::Alarm);
        self.store
            .conn()
            .execute(
                "INSERT INTO alarms (id, fires_at, note, fired) VALUES (?1, ?2, ?3, 0)",
                rusqlite::params![id, fires_at.to_rfc3339(), note],
            )
            .map_err(map_rusqlite_err)?;
        Ok(Alarm { id, fires_at, note: note.to_string(), fired: false })
    }

    pub fn cancel(&self, id: &str) -> Result<(), StoreFailure> {
        let n = self
            .store
            .conn()
            .execute("DELETE FROM alarms WHERE id = ?1 AND fired = 0", [id])
            .map_err(map_rusqlite_err)?;
        if n == 0 {
            return Err(StoreFailure::not_found(format!("alarm {id}")));
        }
        Ok(())
    }

    /// Alarms whose `fires_at` has passed and that have not yet fired.
    /// Idempotent: never returns the same alarm twice once marked fired.
    pub fn get_due_alarms(&self, now: DateTime<Utc>) -> Result<Vec<Alarm>, StoreFailure> {
        let conn = self.store.conn();
        let mut stmt = conn
            .prepare("SELECT id, fires_at, note, fired FROM alarms WHERE fired = 0 AND fires_at <= ?1")
            .map_err(map_rusqlite_err)?;
        let rows = stmt
            .query_map([now.to_rfc3339()], row_to_alarm)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    /// Marks an alarm fired. Each alarm fires at most once; calling this
    /// twice for the same id is a no-op on the second call.
    pub fn mark_fired(&self, id: &str) -> Result<(), StoreFailure> {
        self.store
            .conn()
            .execute("UPDATE alarms SET fired = 1 WHERE id = ?1", [id])
            .map_err(map_rusqlite_err)?;
        Ok(())
    }
}

fn row_to_alarm(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alarm> {
    let fires_at: String = row.get(1)?;
    let fired: i64 = row.get(3)?;
    Ok(Alarm {
        id: row.get(0)?,
        fires_at: DateTime::parse_from_rfc3339(&fires_at).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now()),
        note: row.get(2)?,
        fired: fired != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn alarms() -> AlarmStore {
        AlarmStore::open(Store::open_in_memory().unwrap(), IdGenerator::new()).unwrap()
    }

    #[test]
    fn due_alarm_is_returned_and_firing_is_idempotent() {
        let store = alarms();
        let a = store.schedule(Utc::now() - Duration::seconds(1), "wake up").unwrap();
        let due = store.get_due_alarms(Utc::now()).unwrap();
        assert_eq!(due.len(), 1);
        store.mark_fired(&a.id).unwrap();
        let due_again = store.get_due_alarms(Utc::now()).unwrap();
        assert!(due_again.is_empty());
    }

    #[test]
    fn future_alarm_is_not_due() {
        let store = alarms();
        store.schedule(Utc::now() + Duration::hours(1), "later").unwrap();
        assert!(store.get_due_alarms(Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn cancel_removes_unfired_alarm() {
        let store = alarms();
        let a = store.schedule(Utc::now() + Duration::hours(1), "later").unwrap();
        store.cancel(&a.id).unwrap();
        assert!(store.get_due_alarms(Utc::now() + Duration::hours(2)).unwrap().is_empty());
    }
}
