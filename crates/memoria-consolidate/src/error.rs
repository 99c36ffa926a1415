// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// §7: external failure inside consolidation is logged and does not prevent
/// distillation from proceeding, so callers are expected to catch this and
/// continue rather than abort the turn.
#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("sub-agent run failed: {0}")]
    SubAgent(#[source] anyhow::Error),

    #[error(transparent)]
    Ltm(#[from] memoria_ltm::LtmError),
}
