// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Consolidation engine (SPEC_FULL.md §4.8): the noteworthy heuristic plus
//! the sub-agent run that extracts durable facts into long-term memory.

mod engine;
mod error;
mod noteworthy;

pub use engine::{ConsolidationEngine, ConsolidationOutcome};
pub use error::ConsolidateError;
pub use noteworthy::is_noteworthy;
