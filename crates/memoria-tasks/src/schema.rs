// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_kernel::StoreFailure;
use memoria_store::Store;

pub fn migrate(store: &Store) -> Result<(), StoreFailure> {
    store.migrate(
        "
        CREATE TABLE IF NOT EXISTS background_tasks (
            id           TEXT    NOT NULL PRIMARY KEY,
            task_type    TEXT    NOT NULL,
            description  TEXT    NOT NULL,
            status       TEXT    NOT NULL,
            result       TEXT,
            error        TEXT,
            created_at   TEXT    NOT NULL,
            completed_at TEXT
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_tasks_status ON background_tasks (status);

        CREATE TABLE IF NOT EXISTS alarms (
            id        TEXT    NOT NULL PRIMARY KEY,
            fires_at  TEXT    NOT NULL,
            note      TEXT    NOT NULL,
            fired     INTEGER NOT NULL DEFAULT 0
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_alarms_fires_at ON alarms (fires_at);

        CREATE TABLE IF NOT EXISTS queued_results (
            seq     INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            content TEXT    NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS background_reports (
            id        TEXT    NOT NULL PRIMARY KEY,
            subsystem TEXT    NOT NULL,
            report    TEXT    NOT NULL,
            surfaced  INTEGER NOT NULL DEFAULT 0
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_reports_surfaced ON background_reports (surfaced);
        ",
    )
}
