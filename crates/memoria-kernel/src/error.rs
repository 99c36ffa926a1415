// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// The closed set of failure kinds a [`Store`](crate) operation can surface (§4.2).
///
/// Kept as data rather than one variant per call site so every crate built on
/// top of the store can match on the same four kinds regardless of which
/// table or index the failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailureKind {
    NotFound,
    Conflict,
    SchemaError,
    IoFailure,
}

#[derive(Debug, Error, Clone)]
#[error("store failure ({kind:?}): {message}")]
pub struct StoreFailure {
    pub kind: StoreFailureKind,
    pub message: String,
}

impl StoreFailure {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self { kind: StoreFailureKind::NotFound, message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self { kind: StoreFailureKind::Conflict, message: message.into() }
    }

    pub fn schema_error(message: impl Into<String>) -> Self {
        Self { kind: StoreFailureKind::SchemaError, message: message.into() }
    }

    pub fn io_failure(message: impl Into<String>) -> Self {
        Self { kind: StoreFailureKind::IoFailure, message: message.into() }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StoreFailureKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == StoreFailureKind::Conflict
    }
}

/// The five error kinds from §7, modeled once so the turn coordinator and the
/// protocol layer can pattern-match on a closed set instead of each crate
/// growing its own ad-hoc error type for the same five situations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Returned as a value by callers that can recover locally; wrapping it in
    /// an error at all (rather than an `Option`) is useful only at the
    /// boundary where a uniform `Result<_, EngineError>` is expected.
    #[error("not found: {0}")]
    NotFound(String),

    /// CAS mismatch or slug collision. Recoverable by the caller re-reading
    /// and retrying.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Coverage gap, LTM cycle, non-monotonic id. Fatal: curation halts and
    /// the store is left in its pre-phase state.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Model provider or HTTP failure. Recoverable; retried by the
    /// orchestrator on the next threshold crossing.
    #[error("external failure: {0}")]
    External(#[source] anyhow::Error),

    /// Normal, not actually an error: surfaces as a `cancelled` result with
    /// no error flag set on the wire.
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreFailure),
}

impl EngineError {
    /// Whether this error should set the wire protocol's `is_error` flag
    /// (§6). Cancellation is the one kind that is not an error on the wire.
    pub fn is_error_on_wire(&self) -> bool {
        !matches!(self, EngineError::Cancelled)
    }
}
