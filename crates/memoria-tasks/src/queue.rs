// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_kernel::StoreFailure;
use memoria_store::{map_rusqlite_err, Store};

/// Ordered list of synthetic prompt strings pushed by the alarm poll,
/// drained atomically at turn boundaries (§3, §4.10).
pub struct QueuedResults {
    store: Store,
}

impl QueuedResults {
    pub fn open(store: Store) -> Result<Self, StoreFailure> {
        Ok(Self { store })
    }

    pub fn push(&self, content: &str) -> Result<(), StoreFailure> {
        self.store
            .conn()
            .execute("INSERT INTO queued_results (content) VALUES (?1)", [content])
            .map_err(map_rusqlite_err)?;
        Ok(())
    }

    pub fn is_empty(&self) -> Result<bool, StoreFailure> {
        let count: i64 = self
            .store
            .conn()
            .query_row("SELECT COUNT(*) FROM queued_results", [], |r| r.get(0))
            .map_err(map_rusqlite_err)?;
        Ok(count == 0)
    }

    /// Drains every queued entry in FIFO order within a single transaction,
    /// so a concurrent push can never see a partially-drained queue.
    pub fn drain_all(&self) -> Result<Vec<String>, StoreFailure> {
        self.store.transaction(|tx| {
            let mut stmt = tx.prepare("SELECT content FROM queued_results ORDER BY seq ASC")?;
            let rows: Vec<String> = stmt
                .query_map([], |r| r.get(0))?
                .filter_map(Result::ok)
                .collect();
            drop(stmt);
            tx.execute("DELETE FROM queued_results", [])?;
            Ok(rows)
        })
    }
}
