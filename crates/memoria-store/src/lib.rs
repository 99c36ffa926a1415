// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Transactional store (SPEC_FULL.md §4.2): a shared SQLite connection plus
//! full-text search helpers reused by the temporal log and LTM tree crates.

mod fts;
mod store;

pub use fts::{create_fts5_external_content, search_fts, sync_fts_delete, sync_fts_insert, FtsHit};
pub use store::{map_rusqlite_err, Store};

pub use rusqlite;
