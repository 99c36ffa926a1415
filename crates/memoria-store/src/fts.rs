// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_kernel::StoreFailure;
use rusqlite::Connection;

use crate::store::map_rusqlite_err;

/// One full-text search result: a stable document id plus a snippet with
/// explicit match markers, per §4.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtsHit {
    pub rowid: i64,
    pub snippet: String,
}

/// Create an external-content FTS5 virtual table over `content_table`,
/// indexing `columns`. Mirrors the pattern in the teacher's memory crate
/// (`user_memory_fts USING fts5(key, value, content='user_memory',
/// content_rowid='id')`), generalized over the column list so both the
/// temporal log (message content) and the LTM tree (title, body) can reuse
/// it instead of hand-writing the same DDL twice.
pub fn create_fts5_external_content(
    conn: &Connection,
    fts_table: &str,
    content_table: &str,
    columns: &[&str],
) -> Result<(), StoreFailure> {
    let cols = columns.join(", ");
    let sql = format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {fts_table} USING fts5(\
            {cols}, content='{content_table}', content_rowid='id')"
    );
    conn.execute_batch(&sql).map_err(map_rusqlite_err)
}

/// Insert a row's columns into the external-content FTS index. Call after
/// inserting the row into `content_table`.
pub fn sync_fts_insert(
    conn: &Connection,
    fts_table: &str,
    columns: &[&str],
    rowid: i64,
    values: &[&str],
) -> Result<(), StoreFailure> {
    let cols = columns.join(", ");
    let placeholders: Vec<String> =
        (1..=values.len()).map(|i| format!("?{}", i + 1)).collect();
    let sql = format!(
        "INSERT INTO {fts_table}(rowid, {cols}) VALUES (?1, {})",
        placeholders.join(", ")
    );
    let mut params: Vec<&dyn rusqlite::ToSql> = vec![&rowid];
    params.extend(values.iter().map(|v| v as &dyn rusqlite::ToSql));
    conn.execute(&sql, params.as_slice()).map_err(map_rusqlite_err)?;
    Ok(())
}

/// Remove a row's columns from the external-content FTS index. External
/// content FTS5 tables require the 'delete' command with the row's original
/// values (not just the rowid) to correctly decrement term statistics — the
/// same `INSERT INTO fts(fts, rowid, ...) VALUES('delete', ...)` idiom the
/// teacher's memory crate uses before every update or delete.
pub fn sync_fts_delete(
    conn: &Connection,
    fts_table: &str,
    columns: &[&str],
    rowid: i64,
    values: &[&str],
) -> Result<(), StoreFailure> {
    let cols = columns.join(", ");
    let placeholders: Vec<String> =
        (1..=values.len()).map(|i| format!("?{}", i + 1)).collect();
    let sql = format!(
        "INSERT INTO {fts_table}({fts_table}, rowid, {cols}) VALUES ('delete', ?1, {})",
        placeholders.join(", ")
    );
    let mut params: Vec<&dyn rusqlite::ToSql> = vec![&rowid];
    params.extend(values.iter().map(|v| v as &dyn rusqlite::ToSql));
    conn.execute(&sql, params.as_slice()).map_err(map_rusqlite_err)?;
    Ok(())
}

/// Keyword search with ranked results and explicit match markers.
/// `match_column` is the FTS5 column whose `snippet()` rendering is
/// returned; `>>>term<<<` is the marker pair §4.2 specifies.
pub fn search_fts(
    conn: &Connection,
    fts_table: &str,
    match_column_index: i32,
    query: &str,
    limit: usize,
) -> Result<Vec<FtsHit>, StoreFailure> {
    let sql = format!(
        "SELECT rowid, snippet({fts_table}, ?1, '>>>', '<<<', '...', 24) \
         FROM {fts_table} WHERE {fts_table} MATCH ?2 ORDER BY rank LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql).map_err(map_rusqlite_err)?;
    let rows = stmt
        .query_map(
            rusqlite::params![match_column_index, query, limit as i64],
            |row| Ok(FtsHit { rowid: row.get(0)?, snippet: row.get(1)? }),
        )
        .map_err(map_rusqlite_err)?;
    rows.filter_map(Result::ok).map(Ok).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .migrate("CREATE TABLE docs (id INTEGER PRIMARY KEY, title TEXT, body TEXT)")
            .unwrap();
        create_fts5_external_content(&store.conn(), "docs_fts", "docs", &["title", "body"])
            .unwrap();
        store
    }

    #[test]
    fn search_finds_inserted_row_with_markers() {
        let store = seeded_store();
        let conn = store.conn();
        conn.execute(
            "INSERT INTO docs (id, title, body) VALUES (1, 'hello', 'the quick fox')",
            [],
        )
        .unwrap();
        sync_fts_insert(&conn, "docs_fts", &["title", "body"], 1, &["hello", "the quick fox"])
            .unwrap();

        let hits = search_fts(&conn, "docs_fts", 1, "fox", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rowid, 1);
        assert!(hits[0].snippet.contains(">>>fox<<<"));
    }

    #[test]
    fn deleted_row_no_longer_found() {
        let store = seeded_store();
        let conn = store.conn();
        conn.execute("INSERT INTO docs (id, title, body) VALUES (1, 'a', 'fox here')", [])
            .unwrap();
        sync_fts_insert(&conn, "docs_fts", &["title", "body"], 1, &["a", "fox here"]).unwrap();
        sync_fts_delete(&conn, "docs_fts", &["title", "body"], 1, &["a", "fox here"]).unwrap();
        conn.execute("DELETE FROM docs WHERE id = 1", []).unwrap();

        let hits = search_fts(&conn, "docs_fts", 1, "fox", 10).unwrap();
        assert!(hits.is_empty());
    }
}
