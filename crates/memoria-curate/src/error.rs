// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// §7: only a distillation invariant violation is fatal here; consolidation
/// failures and recoverable distillation failures (summarizer/store) are
/// logged and reflected in the result, not raised.
#[derive(Debug, Error)]
pub enum CurateError {
    #[error(transparent)]
    Distill(#[from] memoria_distill::DistillError),
}
