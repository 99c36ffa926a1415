// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_temporal::Message;

/// Below this many messages, a distillation pass isn't worth the summarizer
/// call; the range is left for the next trigger (§4.7 "Selection").
pub const MIN_DISTILL_BATCH: usize = 5;

/// The range to distill: every uncovered message minus the trailing
/// `recency_buffer_messages`. `uncovered` must already be in ascending id
/// order (as `TemporalLog::uncovered_messages` returns it).
///
/// Returns `None` when the candidate range is smaller than
/// [`MIN_DISTILL_BATCH`] — the caller should skip this trigger.
pub fn select_range(uncovered: &[Message], recency_buffer_messages: u32) -> Option<&[Message]> {
    let keep = recency_buffer_messages as usize;
    if uncovered.len() <= keep {
        return None;
    }
    let candidate = &uncovered[..uncovered.len() - keep];
    if candidate.len() < MIN_DISTILL_BATCH {
        return None;
    }
    Some(candidate)
}
