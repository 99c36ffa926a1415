// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_kernel::StoreFailure;
use memoria_store::Store;

pub const MESSAGES_FTS_COLUMNS: [&str; 1] = ["content"];

/// Initialize the temporal log schema. Idempotent, following the teacher's
/// `init_db` convention of `CREATE TABLE IF NOT EXISTS` plus an index that
/// makes the polling/windowing queries cheap at scale.
pub fn migrate(store: &Store) -> Result<(), StoreFailure> {
    store.migrate(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id             TEXT    NOT NULL PRIMARY KEY,
            kind           TEXT    NOT NULL,
            content        TEXT    NOT NULL,
            token_estimate INTEGER NOT NULL,
            created_at     TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_messages_kind ON messages (kind);

        CREATE TABLE IF NOT EXISTS summaries (
            id             TEXT    NOT NULL PRIMARY KEY,
            order_n        INTEGER NOT NULL,
            start_id       TEXT    NOT NULL,
            end_id         TEXT    NOT NULL,
            body           TEXT    NOT NULL,
            token_estimate INTEGER NOT NULL,
            subsumed_by    TEXT,
            created_at     TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_summaries_order_start ON summaries (order_n, start_id);
        CREATE INDEX IF NOT EXISTS idx_summaries_subsumed ON summaries (subsumed_by);
        ",
    )?;
    memoria_store::create_fts5_external_content(
        &store.conn(),
        "messages_fts",
        "messages",
        &MESSAGES_FTS_COLUMNS,
    )
}
