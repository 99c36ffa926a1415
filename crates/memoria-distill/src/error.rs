// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_kernel::StoreFailure;
use thiserror::Error;

/// §7 error kinds relevant to distillation: external failure (recoverable,
/// retried on the next threshold crossing) and invariant violation (fatal,
/// halts curation and rolls back this run's writes).
#[derive(Debug, Error)]
pub enum DistillError {
    #[error("summarizer call failed: {0}")]
    Summarizer(#[source] anyhow::Error),

    #[error("distillation invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Store(#[from] StoreFailure),
}
