// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_kernel::StoreFailure;
use thiserror::Error;

/// LTM-specific failure kinds. §4.2's four generic store kinds don't name
/// enough detail for the tree operations (§4.4 calls out `already_exists`,
/// `not_found_in_body`, `ambiguous`, and cycle rejection explicitly), so
/// this crate defines its own error enum the way the teacher's memory and
/// scheduler crates each define their own `thiserror` enum over a shared
/// `rusqlite::Error` source.
#[derive(Debug, Error)]
pub enum LtmError {
    #[error("slug already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("version conflict on {slug}: expected {expected}, found {actual}")]
    Conflict { slug: String, expected: u32, actual: u32 },

    #[error("find text not present in body of {0}")]
    NotFoundInBody(String),

    #[error("find text matches more than once in body of {0}")]
    Ambiguous(String),

    #[error("reparenting {slug} under {new_parent} would create a cycle")]
    Cycle { slug: String, new_parent: String },

    #[error(transparent)]
    Store(#[from] StoreFailure),
}
