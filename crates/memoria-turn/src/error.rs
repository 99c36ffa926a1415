// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Store(#[from] memoria_kernel::StoreFailure),
    #[error(transparent)]
    Ltm(#[from] memoria_ltm::LtmError),
    #[error(transparent)]
    Curate(#[from] memoria_curate::CurateError),
    #[error("agent loop failed: {0}")]
    AgentLoop(#[source] anyhow::Error),
}
