// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Temporal log (SPEC_FULL.md §4.3): append-only conversation events plus
//! ordered summaries and the pure coverage queries distillation relies on.

mod coverage;
mod log;
mod schema;
mod types;

pub use coverage::{effective_summaries, find_coverage_gaps, is_covered_by_summary, uncovered_messages};
pub use log::TemporalLog;
pub use types::{Message, MessageFilter, MessageKind, Summary};
