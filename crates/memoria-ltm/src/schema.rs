// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_kernel::StoreFailure;
use memoria_store::Store;

pub const LTM_FTS_COLUMNS: [&str; 2] = ["title", "body"];

/// Default bodies for the two entries that must always exist at the root
/// (§3, §6 "Persisted state"). Content is deliberately minimal; consolidation
/// grows it over time.
pub const DEFAULT_IDENTITY_BODY: &str =
    "# Identity\n\nNo identity notes recorded yet.";
pub const DEFAULT_BEHAVIOR_BODY: &str =
    "# Behavior\n\nNo behavior notes recorded yet.";

pub fn migrate(store: &Store) -> Result<(), StoreFailure> {
    store.migrate(
        "
        CREATE TABLE IF NOT EXISTS ltm_entries (
            slug         TEXT    NOT NULL PRIMARY KEY,
            parent_slug  TEXT,
            path         TEXT    NOT NULL,
            title        TEXT    NOT NULL,
            body         TEXT    NOT NULL,
            tags         TEXT    NOT NULL DEFAULT '[]',
            version      INTEGER NOT NULL,
            archived_at  TEXT,
            created_by   TEXT    NOT NULL,
            updated_at   TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_ltm_parent ON ltm_entries (parent_slug);
        CREATE INDEX IF NOT EXISTS idx_ltm_path ON ltm_entries (path);
        ",
    )?;
    memoria_store::create_fts5_external_content(
        &store.conn(),
        "ltm_entries_fts",
        "ltm_entries",
        &LTM_FTS_COLUMNS,
    )
}
