// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use memoria_ltm::{CreateParams, LtmTree};
use serde_json::{json, Value};

use crate::tool::{Tool, ToolOutput};

fn entry_to_json(e: &memoria_ltm::LtmEntry) -> Value {
    json!({
        "slug": e.slug,
        "parent_slug": e.parent_slug,
        "path": e.path,
        "title": e.title,
        "body": e.body,
        "tags": e.tags,
        "version": e.version,
        "archived": e.is_archived(),
    })
}

fn str_field(input: &Value, field: &str) -> Result<String, ToolOutput> {
    input
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolOutput::err(format!("missing or non-string field: {field}")))
}

fn u32_field(input: &Value, field: &str) -> Result<u32, ToolOutput> {
    input
        .get(field)
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .ok_or_else(|| ToolOutput::err(format!("missing or non-integer field: {field}")))
}

pub struct LtmReadTool(pub Arc<LtmTree>);

#[async_trait]
impl Tool for LtmReadTool {
    fn name(&self) -> &str {
        "ltm_read"
    }
    fn description(&self) -> &str {
        "Reads a long-term memory entry by slug. Returns null if absent or archived."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"slug": {"type": "string"}}, "required": ["slug"]})
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        let slug = match str_field(&input, "slug") {
            Ok(s) => s,
            Err(e) => return e,
        };
        match self.0.read(&slug) {
            Ok(Some(entry)) => ToolOutput::ok(entry_to_json(&entry).to_string()),
            Ok(None) => ToolOutput::ok("null".to_string()),
            Err(e) => ToolOutput::err(e.to_string()),
        }
    }
}

pub struct LtmGlobTool(pub Arc<LtmTree>);

#[async_trait]
impl Tool for LtmGlobTool {
    fn name(&self) -> &str {
        "ltm_glob"
    }
    fn description(&self) -> &str {
        "Lists non-archived entries whose path matches a glob pattern (`*` within a segment, `**` across segments)."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"pattern": {"type": "string"}}, "required": ["pattern"]})
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        let pattern = match str_field(&input, "pattern") {
            Ok(s) => s,
            Err(e) => return e,
        };
        match self.0.glob(&pattern) {
            Ok(entries) => ToolOutput::ok(Value::Array(entries.iter().map(entry_to_json).collect()).to_string()),
            Err(e) => ToolOutput::err(e.to_string()),
        }
    }
}

pub struct LtmSearchTool(pub Arc<LtmTree>);

#[async_trait]
impl Tool for LtmSearchTool {
    fn name(&self) -> &str {
        "ltm_search"
    }
    fn description(&self) -> &str {
        "Keyword search over entry titles and bodies, returning ranked slugs with match snippets."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}, "limit": {"type": "integer"}}, "required": ["query"]})
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        let query = match str_field(&input, "query") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let limit = input.get("limit").and_then(Value::as_u64).unwrap_or(10) as usize;
        match self.0.search_fts(&query, limit) {
            Ok(hits) => {
                let json_hits: Vec<Value> = hits.into_iter().map(|(slug, snippet)| json!({"slug": slug, "snippet": snippet})).collect();
                ToolOutput::ok(Value::Array(json_hits).to_string())
            }
            Err(e) => ToolOutput::err(e.to_string()),
        }
    }
}

pub struct LtmCreateTool(pub Arc<LtmTree>);

#[async_trait]
impl Tool for LtmCreateTool {
    fn name(&self) -> &str {
        "ltm_create"
    }
    fn description(&self) -> &str {
        "Creates a new long-term memory entry. Fails if the slug already exists or the parent is missing."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "slug": {"type": "string"},
                "parent_slug": {"type": ["string", "null"]},
                "title": {"type": "string"},
                "body": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
            },
            "required": ["slug", "title", "body"],
        })
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        let slug = match str_field(&input, "slug") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let title = match str_field(&input, "title") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let body = match str_field(&input, "body") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let parent_slug = input.get("parent_slug").and_then(Value::as_str).map(str::to_string);
        let tags: BTreeSet<String> = input
            .get("tags")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let params = CreateParams { slug, parent_slug, title, body, tags, created_by: "consolidation".to_string() };
        match self.0.create(params) {
            Ok(entry) => ToolOutput::ok(entry_to_json(&entry).to_string()),
            Err(e) => ToolOutput::err(e.to_string()),
        }
    }
}

pub struct LtmUpdateTool(pub Arc<LtmTree>);

#[async_trait]
impl Tool for LtmUpdateTool {
    fn name(&self) -> &str {
        "ltm_update"
    }
    fn description(&self) -> &str {
        "Replaces an entry's body via compare-and-swap. On version conflict, re-read with ltm_read and retry."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"slug": {"type": "string"}, "body": {"type": "string"}, "expected_version": {"type": "integer"}}, "required": ["slug", "body", "expected_version"]})
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        let slug = match str_field(&input, "slug") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let body = match str_field(&input, "body") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let expected_version = match u32_field(&input, "expected_version") {
            Ok(v) => v,
            Err(e) => return e,
        };
        match self.0.update(&slug, &body, expected_version, "consolidation") {
            Ok(entry) => ToolOutput::ok(entry_to_json(&entry).to_string()),
            Err(e) => ToolOutput::err(e.to_string()),
        }
    }
}

pub struct LtmEditTool(pub Arc<LtmTree>);

#[async_trait]
impl Tool for LtmEditTool {
    fn name(&self) -> &str {
        "ltm_edit"
    }
    fn description(&self) -> &str {
        "Replaces exactly one occurrence of `find` with `replace` in an entry's body via compare-and-swap."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"slug": {"type": "string"}, "find": {"type": "string"}, "replace": {"type": "string"}, "expected_version": {"type": "integer"}}, "required": ["slug", "find", "replace", "expected_version"]})
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        let slug = match str_field(&input, "slug") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let find = match str_field(&input, "find") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let replace = match str_field(&input, "replace") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let expected_version = match u32_field(&input, "expected_version") {
            Ok(v) => v,
            Err(e) => return e,
        };
        match self.0.edit(&slug, &find, &replace, expected_version, "consolidation") {
            Ok(entry) => ToolOutput::ok(entry_to_json(&entry).to_string()),
            Err(e) => ToolOutput::err(e.to_string()),
        }
    }
}

pub struct LtmRenameTool(pub Arc<LtmTree>);

#[async_trait]
impl Tool for LtmRenameTool {
    fn name(&self) -> &str {
        "ltm_rename"
    }
    fn description(&self) -> &str {
        "Renames an entry's slug, updating its path and every descendant's path. Compare-and-swap guarded."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"slug": {"type": "string"}, "new_slug": {"type": "string"}, "expected_version": {"type": "integer"}}, "required": ["slug", "new_slug", "expected_version"]})
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        let slug = match str_field(&input, "slug") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let new_slug = match str_field(&input, "new_slug") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let expected_version = match u32_field(&input, "expected_version") {
            Ok(v) => v,
            Err(e) => return e,
        };
        match self.0.rename(&slug, &new_slug, expected_version, "consolidation") {
            Ok(entry) => ToolOutput::ok(entry_to_json(&entry).to_string()),
            Err(e) => ToolOutput::err(e.to_string()),
        }
    }
}

pub struct LtmReparentTool(pub Arc<LtmTree>);

#[async_trait]
impl Tool for LtmReparentTool {
    fn name(&self) -> &str {
        "ltm_reparent"
    }
    fn description(&self) -> &str {
        "Moves an entry under a new parent. Rejects cycles. Compare-and-swap guarded."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"slug": {"type": "string"}, "new_parent_slug": {"type": "string"}, "expected_version": {"type": "integer"}}, "required": ["slug", "new_parent_slug", "expected_version"]})
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        let slug = match str_field(&input, "slug") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let new_parent_slug = match str_field(&input, "new_parent_slug") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let expected_version = match u32_field(&input, "expected_version") {
            Ok(v) => v,
            Err(e) => return e,
        };
        match self.0.reparent(&slug, &new_parent_slug, expected_version, "consolidation") {
            Ok(entry) => ToolOutput::ok(entry_to_json(&entry).to_string()),
            Err(e) => ToolOutput::err(e.to_string()),
        }
    }
}

pub struct LtmArchiveTool(pub Arc<LtmTree>);

#[async_trait]
impl Tool for LtmArchiveTool {
    fn name(&self) -> &str {
        "ltm_archive"
    }
    fn description(&self) -> &str {
        "Archives an entry; it becomes invisible to read/glob/search but its row is retained. Compare-and-swap guarded."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"slug": {"type": "string"}, "expected_version": {"type": "integer"}}, "required": ["slug", "expected_version"]})
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        let slug = match str_field(&input, "slug") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let expected_version = match u32_field(&input, "expected_version") {
            Ok(v) => v,
            Err(e) => return e,
        };
        match self.0.archive(&slug, expected_version) {
            Ok(entry) => ToolOutput::ok(entry_to_json(&entry).to_string()),
            Err(e) => ToolOutput::err(e.to_string()),
        }
    }
}

/// Signals the consolidation sub-agent loop is done (§4.8). Stores the
/// reported counts and summary text for the driving loop to read after
/// dispatch; the loop itself decides when to stop, not this tool.
pub struct FinishConsolidationTool {
    pub outcome: Mutex<Option<Value>>,
}

impl FinishConsolidationTool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { outcome: Mutex::new(None) })
    }

    pub fn take_outcome(&self) -> Option<Value> {
        self.outcome.lock().unwrap().take()
    }
}

#[async_trait]
impl Tool for FinishConsolidationTool {
    fn name(&self) -> &str {
        "finish_consolidation"
    }
    fn description(&self) -> &str {
        "Ends the consolidation turn. Report how many entries were created/updated/archived and a short summary."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entries_created": {"type": "integer"},
                "entries_updated": {"type": "integer"},
                "entries_archived": {"type": "integer"},
                "summary": {"type": "string"},
            },
            "required": ["summary"],
        })
    }
    async fn execute(&self, input: Value) -> ToolOutput {
        *self.outcome.lock().unwrap() = Some(input);
        ToolOutput::ok("consolidation finished")
    }
}
