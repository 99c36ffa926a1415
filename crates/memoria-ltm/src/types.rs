// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// §3 LTM entry — a versioned node in the forest of knowledge entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LtmEntry {
    pub slug: String,
    pub parent_slug: Option<String>,
    pub path: String,
    pub title: String,
    pub body: String,
    pub tags: BTreeSet<String>,
    pub version: u32,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
}

impl LtmEntry {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CreateParams {
    pub slug: String,
    pub parent_slug: Option<String>,
    pub title: String,
    pub body: String,
    pub tags: BTreeSet<String>,
    pub created_by: String,
}
