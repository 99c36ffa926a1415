// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_kernel::StoreFailure;
use memoria_store::Store;

pub fn migrate(store: &Store) -> Result<(), StoreFailure> {
    store.migrate(
        "
        CREATE TABLE IF NOT EXISTS workers (
            id           TEXT    NOT NULL PRIMARY KEY,
            kind         TEXT    NOT NULL,
            status       TEXT    NOT NULL,
            started_at   TEXT    NOT NULL,
            completed_at TEXT,
            error        TEXT
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_workers_status ON workers (status);
        ",
    )
}
