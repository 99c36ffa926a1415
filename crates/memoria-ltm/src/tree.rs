// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use memoria_store::{map_rusqlite_err, search_fts, sync_fts_delete, sync_fts_insert, Store};

use crate::error::LtmError;
use crate::glob::path_matches;
use crate::schema::{self, DEFAULT_BEHAVIOR_BODY, DEFAULT_IDENTITY_BODY, LTM_FTS_COLUMNS};
use crate::types::{CreateParams, LtmEntry};

/// Versioned, hierarchical long-term memory tree (§4.4).
pub struct LtmTree {
    store: Store,
}

impl LtmTree {
    pub fn open(store: Store) -> Result<Self, LtmError> {
        schema::migrate(&store)?;
        let tree = Self { store };
        tree.ensure_default_entries()?;
        Ok(tree)
    }

    /// Creates `identity` and `behavior` at the root with default bodies if
    /// they are absent, per §6's schema-migration rule. Runs once on open.
    fn ensure_default_entries(&self) -> Result<(), LtmError> {
        for (slug, body) in [("identity", DEFAULT_IDENTITY_BODY), ("behavior", DEFAULT_BEHAVIOR_BODY)] {
            if !self.exists(slug)? {
                self.create(CreateParams {
                    slug: slug.to_string(),
                    parent_slug: None,
                    title: capitalize(slug),
                    body: body.to_string(),
                    tags: BTreeSet::new(),
                    created_by: "system".to_string(),
                })?;
            }
        }
        Ok(())
    }

    fn exists(&self, slug: &str) -> Result<bool, LtmError> {
        self.store
            .conn()
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM ltm_entries WHERE slug = ?1)",
                [slug],
                |r| r.get(0),
            )
            .map_err(map_rusqlite_err)
            .map_err(LtmError::from)
    }

    pub fn create(&self, params: CreateParams) -> Result<LtmEntry, LtmError> {
        if self.exists(&params.slug)? {
            return Err(LtmError::AlreadyExists(params.slug));
        }
        let path = match &params.parent_slug {
            Some(parent_slug) => {
                let parent = self
                    .read_raw(parent_slug)?
                    .ok_or_else(|| LtmError::NotFound(parent_slug.clone()))?;
                format!("{}/{}", parent.path, params.slug)
            }
            None => format!("/{}", params.slug),
        };

        let now = Utc::now();
        let tags_json = serde_json::to_string(&params.tags).unwrap_or_else(|_| "[]".to_string());
        let conn = self.store.conn();
        conn.execute(
            "INSERT INTO ltm_entries
                (slug, parent_slug, path, title, body, tags, version, archived_at, created_by, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, NULL, ?7, ?8)",
            rusqlite::params![
                params.slug,
                params.parent_slug,
                path,
                params.title,
                params.body,
                tags_json,
                params.created_by,
                now.to_rfc3339(),
            ],
        )
        .map_err(map_rusqlite_err)?;
        let rowid = conn.last_insert_rowid();
        sync_fts_insert(&conn, "ltm_entries_fts", &LTM_FTS_COLUMNS, rowid, &[params.title.as_str(), params.body.as_str()])?;

        Ok(LtmEntry {
            slug: params.slug,
            parent_slug: params.parent_slug,
            path,
            title: params.title,
            body: params.body,
            tags: params.tags,
            version: 1,
            archived_at: None,
            created_by: params.created_by,
            updated_at: now,
        })
    }

    /// Returns the entry regardless of archived status; used internally by
    /// operations that must still see an archived parent/descendant while
    /// restructuring the tree.
    fn read_raw(&self, slug: &str) -> Result<Option<LtmEntry>, LtmError> {
        let row = self.store.conn().query_row(
            "SELECT slug, parent_slug, path, title, body, tags, version, archived_at, created_by, updated_at
             FROM ltm_entries WHERE slug = ?1",
            [slug],
            row_to_entry,
        );
        match row {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LtmError::from(map_rusqlite_err(e))),
        }
    }

    /// Returns the entry, or nothing for absent or archived (§4.4).
    pub fn read(&self, slug: &str) -> Result<Option<LtmEntry>, LtmError> {
        Ok(self.read_raw(slug)?.filter(|e| !e.is_archived()))
    }

    fn cas_check(&self, slug: &str, expected_version: u32) -> Result<LtmEntry, LtmError> {
        let entry = self.read_raw(slug)?.ok_or_else(|| LtmError::NotFound(slug.to_string()))?;
        if entry.version != expected_version {
            return Err(LtmError::Conflict { slug: slug.to_string(), expected: expected_version, actual: entry.version });
        }
        Ok(entry)
    }

    /// CAS update; fails with `conflict` if version differs; increments
    /// version.
    pub fn update(&self, slug: &str, new_body: &str, expected_version: u32, _updated_by: &str) -> Result<LtmEntry, LtmError> {
        let current = self.cas_check(slug, expected_version)?;
        self.write_body(&current, new_body)
    }

    /// As `update`, but computes the new body by requiring `find` to appear
    /// exactly once in the current body.
    pub fn edit(&self, slug: &str, find: &str, replace: &str, expected_version: u32, _updated_by: &str) -> Result<LtmEntry, LtmError> {
        let current = self.cas_check(slug, expected_version)?;
        let occurrences = current.body.matches(find).count();
        if occurrences == 0 {
            return Err(LtmError::NotFoundInBody(slug.to_string()));
        }
        if occurrences > 1 {
            return Err(LtmError::Ambiguous(slug.to_string()));
        }
        let new_body = current.body.replacen(find, replace, 1);
        self.write_body(&current, &new_body)
    }

    fn write_body(&self, current: &LtmEntry, new_body: &str) -> Result<LtmEntry, LtmError> {
        let new_version = current.version + 1;
        let now = Utc::now();
        let conn = self.store.conn();
        let n = conn
            .execute(
                "UPDATE ltm_entries SET body = ?1, version = ?2, updated_at = ?3
                 WHERE slug = ?4 AND version = ?5",
                rusqlite::params![new_body, new_version, now.to_rfc3339(), current.slug, current.version],
            )
            .map_err(map_rusqlite_err)?;
        if n == 0 {
            return Err(LtmError::Conflict { slug: current.slug.clone(), expected: current.version, actual: current.version + 1 });
        }
        let rowid: i64 = conn
            .query_row("SELECT rowid FROM ltm_entries WHERE slug = ?1", [&current.slug], |r| r.get(0))
            .map_err(map_rusqlite_err)?;
        sync_fts_delete(&conn, "ltm_entries_fts", &LTM_FTS_COLUMNS, rowid, &[current.title.as_str(), current.body.as_str()])?;
        sync_fts_insert(&conn, "ltm_entries_fts", &LTM_FTS_COLUMNS, rowid, &[current.title.as_str(), new_body])?;

        Ok(LtmEntry { body: new_body.to_string(), version: new_version, updated_at: now, ..current.clone() })
    }

    /// Fails if target slug exists; updates the entry, all direct children's
    /// `parent_slug`, and every descendant's materialized `path` in a single
    /// transaction.
    pub fn rename(&self, slug: &str, new_slug: &str, expected_version: u32, _updated_by: &str) -> Result<LtmEntry, LtmError> {
        if self.exists(new_slug)? {
            return Err(LtmError::AlreadyExists(new_slug.to_string()));
        }
        let current = self.cas_check(slug, expected_version)?;
        let new_path = match &current.parent_slug {
            Some(parent_slug) => {
                let parent = self.read_raw(parent_slug)?.ok_or_else(|| LtmError::NotFound(parent_slug.clone()))?;
                format!("{}/{}", parent.path, new_slug)
            }
            None => format!("/{new_slug}"),
        };
        let descendants = self.descendants_of(&current.path)?;
        let now = Utc::now();
        let old_path = current.path.clone();
        let old_slug = slug.to_string();
        let new_slug_owned = new_slug.to_string();
        let new_version = current.version + 1;

        self.store
            .transaction(|tx| {
                tx.execute(
                    "UPDATE ltm_entries SET slug = ?1, path = ?2, version = ?3, updated_at = ?4 WHERE slug = ?5",
                    rusqlite::params![new_slug_owned, new_path, new_version, now.to_rfc3339(), old_slug],
                )?;
                tx.execute(
                    "UPDATE ltm_entries SET parent_slug = ?1 WHERE parent_slug = ?2",
                    rusqlite::params![new_slug_owned, old_slug],
                )?;
                for descendant in &descendants {
                    let suffix = &descendant.path[old_path.len()..];
                    let new_descendant_path = format!("{new_path}{suffix}");
                    tx.execute(
                        "UPDATE ltm_entries SET path = ?1 WHERE slug = ?2",
                        rusqlite::params![new_descendant_path, descendant.slug],
                    )?;
                }
                Ok(())
            })
            .map_err(LtmError::from)?;

        self.read_raw(new_slug)?.ok_or_else(|| LtmError::NotFound(new_slug.to_string()))
    }

    /// Rejects cycles by checking that `new_parent_slug` is not a descendant
    /// of the entry being moved; updates descendant paths atomically.
    pub fn reparent(&self, slug: &str, new_parent_slug: &str, expected_version: u32, _updated_by: &str) -> Result<LtmEntry, LtmError> {
        let current = self.cas_check(slug, expected_version)?;
        let new_parent = self
            .read_raw(new_parent_slug)?
            .ok_or_else(|| LtmError::NotFound(new_parent_slug.to_string()))?;

        if new_parent_slug == slug || is_descendant_or_self(&current.path, &new_parent.path) {
            return Err(LtmError::Cycle { slug: slug.to_string(), new_parent: new_parent_slug.to_string() });
        }

        let descendants = self.descendants_of(&current.path)?;
        let new_path = format!("{}/{}", new_parent.path, slug);
        let old_path = current.path.clone();
        let now = Utc::now();
        let new_version = current.version + 1;
        let slug_owned = slug.to_string();
        let new_parent_owned = new_parent_slug.to_string();

        self.store
            .transaction(|tx| {
                tx.execute(
                    "UPDATE ltm_entries SET parent_slug = ?1, path = ?2, version = ?3, updated_at = ?4 WHERE slug = ?5",
                    rusqlite::params![new_parent_owned, new_path, new_version, now.to_rfc3339(), slug_owned],
                )?;
                for descendant in &descendants {
                    let suffix = &descendant.path[old_path.len()..];
                    let new_descendant_path = format!("{new_path}{suffix}");
                    tx.execute(
                        "UPDATE ltm_entries SET path = ?1 WHERE slug = ?2",
                        rusqlite::params![new_descendant_path, descendant.slug],
                    )?;
                }
                Ok(())
            })
            .map_err(LtmError::from)?;

        self.read_raw(slug)?.ok_or_else(|| LtmError::NotFound(slug.to_string()))
    }

    /// Sets `archived_at`; future reads and searches skip the entry.
    pub fn archive(&self, slug: &str, expected_version: u32) -> Result<LtmEntry, LtmError> {
        let current = self.cas_check(slug, expected_version)?;
        let now = Utc::now();
        let new_version = current.version + 1;
        let n = self
            .store
            .conn()
            .execute(
                "UPDATE ltm_entries SET archived_at = ?1, version = ?2, updated_at = ?1 WHERE slug = ?3 AND version = ?4",
                rusqlite::params![now.to_rfc3339(), new_version, slug, current.version],
            )
            .map_err(map_rusqlite_err)?;
        if n == 0 {
            return Err(LtmError::Conflict { slug: slug.to_string(), expected: current.version, actual: current.version });
        }
        Ok(LtmEntry { archived_at: Some(now), version: new_version, updated_at: now, ..current })
    }

    fn descendants_of(&self, path: &str) -> Result<Vec<LtmEntry>, LtmError> {
        let conn = self.store.conn();
        let mut stmt = conn
            .prepare(
                "SELECT slug, parent_slug, path, title, body, tags, version, archived_at, created_by, updated_at
                 FROM ltm_entries WHERE path LIKE ?1",
            )
            .map_err(map_rusqlite_err)?;
        let like_pattern = format!("{}/%", escape_like(path));
        let rows = stmt
            .query_map([like_pattern], row_to_entry)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    /// Entries whose materialized path matches `pattern`; archived entries
    /// are excluded.
    pub fn glob(&self, pattern: &str) -> Result<Vec<LtmEntry>, LtmError> {
        let conn = self.store.conn();
        let mut stmt = conn
            .prepare(
                "SELECT slug, parent_slug, path, title, body, tags, version, archived_at, created_by, updated_at
                 FROM ltm_entries WHERE archived_at IS NULL",
            )
            .map_err(map_rusqlite_err)?;
        let rows: Vec<LtmEntry> = stmt
            .query_map([], row_to_entry)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();
        Ok(rows.into_iter().filter(|e| path_matches(pattern, &e.path)).collect())
    }

    /// Substring search over title/body, respecting `archived_at` and an
    /// optional path prefix filter.
    pub fn search(&self, query: &str, path_prefix: Option<&str>) -> Result<Vec<LtmEntry>, LtmError> {
        let needle = query.to_lowercase();
        let conn = self.store.conn();
        let mut stmt = conn
            .prepare(
                "SELECT slug, parent_slug, path, title, body, tags, version, archived_at, created_by, updated_at
                 FROM ltm_entries WHERE archived_at IS NULL",
            )
            .map_err(map_rusqlite_err)?;
        let rows: Vec<LtmEntry> = stmt
            .query_map([], row_to_entry)
            .map_err(map_rusqlite_err)?
            .filter_map(Result::ok)
            .collect();
        Ok(rows
            .into_iter()
            .filter(|e| path_prefix.is_none_or(|p| e.path.starts_with(p)))
            .filter(|e| e.title.to_lowercase().contains(&needle) || e.body.to_lowercase().contains(&needle))
            .collect())
    }

    /// Keyword search with ranked results and `>>>term<<<` markers,
    /// respecting `archived_at`.
    pub fn search_fts(&self, query: &str, limit: usize) -> Result<Vec<(String, String)>, LtmError> {
        let conn = self.store.conn();
        let hits = search_fts(&conn, "ltm_entries_fts", 1, query, limit * 4)?;
        let mut out = Vec::new();
        for hit in hits {
            let row: Option<(String, Option<String>)> = conn
                .query_row(
                    "SELECT slug, archived_at FROM ltm_entries WHERE rowid = ?1",
                    [hit.rowid],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .ok();
            if let Some((slug, archived_at)) = row {
                if archived_at.is_none() {
                    out.push((slug, hit.snippet));
                    if out.len() >= limit {
                        break;
                    }
                }
            }
        }
        Ok(out)
    }
}

fn is_descendant_or_self(ancestor_path: &str, candidate_path: &str) -> bool {
    candidate_path == ancestor_path || candidate_path.starts_with(&format!("{ancestor_path}/"))
}

fn escape_like(s: &str) -> String {
    s.replace('%', "\\%").replace('_', "\\_")
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + c.as_str(),
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LtmEntry> {
    let tags_json: String = row.get(5)?;
    let tags: BTreeSet<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    let archived_at: Option<String> = row.get(7)?;
    let updated_at: String = row.get(9)?;
    Ok(LtmEntry {
        slug: row.get(0)?,
        parent_slug: row.get(1)?,
        path: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        tags,
        version: row.get(6)?,
        archived_at: archived_at.map(|s| parse_rfc3339(&s)),
        created_by: row.get(8)?,
        updated_at: parse_rfc3339(&updated_at),
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}
