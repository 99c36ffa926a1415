// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use memoria_ids::IdGenerator;
use memoria_kernel::{estimate_tokens, IdKind, StoreFailure};
use memoria_store::{map_rusqlite_err, search_fts, sync_fts_delete, sync_fts_insert, Store};

use crate::schema::{self, MESSAGES_FTS_COLUMNS};
use crate::types::{Message, MessageFilter, MessageKind, Summary};

/// Append-only conversation log plus ordered summaries (§4.3).
pub struct TemporalLog {
    store: Store,
    ids: IdGenerator,
}

impl TemporalLog {
    pub fn open(store: Store, ids: IdGenerator) -> Result<Self, StoreFailure> {
        schema::migrate(&store)?;
        Ok(Self { store, ids })
    }

    /// `append_message(m)` — total order; assigns `created_at` if absent.
    /// The token estimate is always computed here via the shared heuristic
    /// rather than accepted from the caller, so every message in the store
    /// used the same function (SPEC_FULL.md §9 open question 1).
    pub fn append_message(&self, kind: MessageKind, content: impl Into<String>) -> Result<Message, StoreFailure> {
        let content = content.into();
        let id = self.ids.next(IdKind::Message);
        let token_estimate = estimate_tokens(&content);
        let created_at = Utc::now();

        let conn = self.store.conn();
        conn.execute(
            "INSERT INTO messages (id, kind, content, token_estimate, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, kind.as_str(), content, token_estimate, created_at.to_rfc3339()],
        )
        .map_err(map_rusqlite_err)?;
        let rowid = conn.last_insert_rowid();
        sync_fts_insert(&conn, "messages_fts", &MESSAGES_FTS_COLUMNS, rowid, &[content.as_str()])?;

        Ok(Message { id, kind, content, token_estimate, created_at })
    }

    pub fn get_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>, StoreFailure> {
        let conn = self.store.conn();
        let mut sql = String::from(
            "SELECT id, kind, content, token_estimate, created_at FROM messages WHERE 1=1",
        );
        if filter.since_id.is_some() {
            sql.push_str(" AND id > ?1");
        }
        sql.push_str(" ORDER BY id");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = conn.prepare(&sql).map_err(map_rusqlite_err)?;
        let rows: Vec<Message> = if let Some(since) = &filter.since_id {
            stmt.query_map([since], row_to_message)
        } else {
            stmt.query_map([], row_to_message)
        }
        .map_err(map_rusqlite_err)?
        .filter_map(Result::ok)
        .collect();

        Ok(match &filter.kinds {
            Some(kinds) => rows.into_iter().filter(|m| kinds.contains(&m.kind)).collect(),
            None => rows,
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<Message>, StoreFailure> {
        let conn = self.store.conn();
        conn.query_row(
            "SELECT id, kind, content, token_estimate, created_at FROM messages WHERE id = ?1",
            [id],
            row_to_message,
        )
        .map(Some)
        .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(e) })
        .map_err(map_rusqlite_err)
    }

    /// Returns the window `[id-before .. id+after]` clipped to bounds,
    /// preserving ascending order (§4.3).
    pub fn get_message_with_context(
        &self,
        id: &str,
        before: usize,
        after: usize,
    ) -> Result<Vec<Message>, StoreFailure> {
        let conn = self.store.conn();
        let mut before_stmt = conn
            .prepare(
                "SELECT id, kind, content, token_estimate, created_at FROM messages
                 WHERE id < ?1 ORDER BY id DESC LIMIT ?2",
            )
            .map_err(map_rusqlite_err)?;
        let mut preceding: Vec<Message> = before_stmt
            .query_map(rusqlite::params![id, before as i64], row_to_message)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();
        preceding.reverse();

        let center = self.get_message(id)?;

        let mut after_stmt = conn
            .prepare(
                "SELECT id, kind, content, token_estimate, created_at FROM messages
                 WHERE id > ?1 ORDER BY id ASC LIMIT ?2",
            )
            .map_err(map_rusqlite_err)?;
        let following: Vec<Message> = after_stmt
            .query_map(rusqlite::params![id, after as i64], row_to_message)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();

        let mut window = preceding;
        window.extend(center);
        window.extend(following);
        Ok(window)
    }

    pub fn search_fts(&self, query: &str, limit: usize) -> Result<Vec<(String, String)>, StoreFailure> {
        let conn = self.store.conn();
        let hits = search_fts(&conn, "messages_fts", 0, query, limit)?;
        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            let id: String = conn
                .query_row("SELECT id FROM messages WHERE rowid = ?1", [hit.rowid], |r| r.get(0))
                .map_err(map_rusqlite_err)?;
            out.push((id, hit.snippet));
        }
        Ok(out)
    }

    /// Sum of `token_estimate` for messages not yet covered by any
    /// non-subsumed summary.
    pub fn estimate_uncompacted_tokens(&self) -> Result<u32, StoreFailure> {
        let uncovered = self.uncovered_messages()?;
        Ok(uncovered.iter().map(|m| m.token_estimate).sum())
    }

    pub fn get_summaries(&self) -> Result<Vec<Summary>, StoreFailure> {
        let conn = self.store.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, order_n, start_id, end_id, body, token_estimate, subsumed_by, created_at
                 FROM summaries ORDER BY order_n, start_id",
            )
            .map_err(map_rusqlite_err)?;
        let rows = stmt
            .query_map([], row_to_summary)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    pub fn append_summary(
        &self,
        order: u32,
        start_id: &str,
        end_id: &str,
        body: impl Into<String>,
    ) -> Result<Summary, StoreFailure> {
        let body = body.into();
        let id = self.ids.next(IdKind::Summary);
        let token_estimate = estimate_tokens(&body);
        let created_at = Utc::now();

        self.store.conn().execute(
            "INSERT INTO summaries (id, order_n, start_id, end_id, body, token_estimate, subsumed_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
            rusqlite::params![id, order, start_id, end_id, body, token_estimate, created_at.to_rfc3339()],
        )
        .map_err(map_rusqlite_err)?;

        Ok(Summary { id, order, start_id: start_id.to_string(), end_id: end_id.to_string(), body, token_estimate, subsumed_by: None, created_at })
    }

    pub fn mark_subsumed(&self, summary_id: &str, subsumed_by: &str) -> Result<(), StoreFailure> {
        let n = self
            .store
            .conn()
            .execute(
                "UPDATE summaries SET subsumed_by = ?1 WHERE id = ?2",
                rusqlite::params![subsumed_by, summary_id],
            )
            .map_err(map_rusqlite_err)?;
        if n == 0 {
            return Err(StoreFailure::not_found(format!("summary {summary_id} not found")));
        }
        Ok(())
    }

    /// Reverses `mark_subsumed`. Used by the distillation engine's app-level
    /// rollback when a post-write invariant check fails (§4.7 "rows written
    /// earlier ... are rolled back") — a single `std::sync::Mutex`-backed
    /// connection can't nest a SQL transaction across these already-committed
    /// per-call statements, so the rollback is undone explicitly instead.
    pub fn clear_subsumed(&self, summary_id: &str) -> Result<(), StoreFailure> {
        self.store
            .conn()
            .execute("UPDATE summaries SET subsumed_by = NULL WHERE id = ?1", [summary_id])
            .map_err(map_rusqlite_err)?;
        Ok(())
    }

    /// Deletes a summary row outright. Rollback-only; summaries are
    /// otherwise immutable once written.
    pub fn delete_summary(&self, summary_id: &str) -> Result<(), StoreFailure> {
        self.store
            .conn()
            .execute("DELETE FROM summaries WHERE id = ?1", [summary_id])
            .map_err(map_rusqlite_err)?;
        Ok(())
    }

    // -- coverage queries (pure over the summary table, §4.3) --

    pub fn is_covered_by_summary(&self, message_id: &str) -> Result<bool, StoreFailure> {
        let summaries = self.get_summaries()?;
        Ok(crate::coverage::is_covered_by_summary(&summaries, message_id))
    }

    pub fn uncovered_messages(&self) -> Result<Vec<Message>, StoreFailure> {
        let summaries = self.get_summaries()?;
        let all = self.get_messages(&MessageFilter::default())?;
        Ok(crate::coverage::uncovered_messages(&summaries, &all))
    }

    pub fn effective_summaries(&self) -> Result<Vec<Summary>, StoreFailure> {
        let summaries = self.get_summaries()?;
        Ok(crate::coverage::effective_summaries(&summaries))
    }

    pub fn find_coverage_gaps(&self) -> Result<Vec<(String, String)>, StoreFailure> {
        let summaries = self.get_summaries()?;
        let all = self.get_messages(&MessageFilter::default())?;
        Ok(crate::coverage::find_coverage_gaps(&summaries, &all))
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let kind_str: String = row.get(1)?;
    let created_at: String = row.get(4)?;
    Ok(Message {
        id: row.get(0)?,
        kind: MessageKind::parse(&kind_str).unwrap_or(MessageKind::User),
        content: row.get(2)?,
        token_estimate: row.get(3)?,
        created_at: parse_rfc3339(&created_at),
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<Summary> {
    let created_at: String = row.get(7)?;
    Ok(Summary {
        id: row.get(0)?,
        order: row.get(1)?,
        start_id: row.get(2)?,
        end_id: row.get(3)?,
        body: row.get(4)?,
        token_estimate: row.get(5)?,
        subsumed_by: row.get(6)?,
        created_at: parse_rfc3339(&created_at),
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}
