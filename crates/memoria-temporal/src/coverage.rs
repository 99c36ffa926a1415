// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use crate::types::{Message, Summary};

/// Pure coverage queries over the summary table (§4.3). Kept free of any
/// store access so they can be unit-tested against plain in-memory vectors
/// and reused identically by the distillation engine's invariant checks.

/// Resolves a summary's `[start_id, end_id]` down to the message-id range it
/// actually covers. Order-1 ranges are already message ids; order ≥ 2 ranges
/// reference the ids of the summaries they were compressed from, so this
/// walks down through that chain until it bottoms out at order 1.
fn resolve_message_range(summary: &Summary, by_id: &HashMap<&str, &Summary>) -> Option<(String, String)> {
    if summary.order == 1 {
        return Some((summary.start_id.clone(), summary.end_id.clone()));
    }
    let start = by_id.get(summary.start_id.as_str())?;
    let end = by_id.get(summary.end_id.as_str())?;
    let (start_of_range, _) = resolve_message_range(start, by_id)?;
    let (_, end_of_range) = resolve_message_range(end, by_id)?;
    Some((start_of_range, end_of_range))
}

/// Message-id ranges covered by every live (non-subsumed) summary, of any
/// order, resolved transitively down to message-id space. A message is
/// covered iff it falls in one of these — not just the ranges of surviving
/// order-1 summaries, since a higher-order summary can be the only live
/// witness for a whole subsumed prefix (§4.3).
fn covered_ranges(summaries: &[Summary]) -> Vec<(String, String)> {
    let by_id: HashMap<&str, &Summary> = summaries.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut ranges: Vec<(String, String)> = summaries
        .iter()
        .filter(|s| !s.is_subsumed())
        .filter_map(|s| resolve_message_range(s, &by_id))
        .collect();
    ranges.sort();
    ranges
}

/// True iff some live summary's resolved message-id range contains
/// `message_id`.
pub fn is_covered_by_summary(summaries: &[Summary], message_id: &str) -> bool {
    covered_ranges(summaries).iter().any(|(s, e)| s.as_str() <= message_id && message_id <= e.as_str())
}

/// Messages with id > max covered id, preserving order.
pub fn uncovered_messages(summaries: &[Summary], messages: &[Message]) -> Vec<Message> {
    let ranges = covered_ranges(summaries);
    let max_covered = ranges.iter().map(|(_, e)| e.clone()).max();
    match max_covered {
        Some(max_covered) => {
            messages.iter().filter(|m| m.id.as_str() > max_covered.as_str()).cloned().collect()
        }
        None => messages.to_vec(),
    }
}

/// Non-subsumed summaries, lowest-order first, forming a consistent
/// partition of covered history.
pub fn effective_summaries(summaries: &[Summary]) -> Vec<Summary> {
    let mut out: Vec<Summary> = summaries.iter().filter(|s| !s.is_subsumed()).cloned().collect();
    out.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.start_id.cmp(&b.start_id)));
    out
}

/// Ranges of message ids that lie inside the covered span but are not
/// covered by any live summary of any order. Must be empty; a non-empty
/// result is a fatal inconsistency (§4.3).
pub fn find_coverage_gaps(summaries: &[Summary], messages: &[Message]) -> Vec<(String, String)> {
    let ranges = covered_ranges(summaries);
    let Some(max_covered) = ranges.iter().map(|(_, e)| e.clone()).max() else {
        return Vec::new();
    };

    let mut gaps = Vec::new();
    let mut gap_start: Option<String> = None;
    let mut gap_end: Option<String> = None;

    for m in messages {
        if m.id.as_str() > max_covered.as_str() {
            break;
        }
        let covered = ranges.iter().any(|(s, e)| s.as_str() <= m.id.as_str() && m.id.as_str() <= e.as_str());
        if covered {
            if let (Some(start), Some(end)) = (gap_start.take(), gap_end.take()) {
                gaps.push((start, end));
            }
        } else {
            gap_start.get_or_insert_with(|| m.id.clone());
            gap_end = Some(m.id.clone());
        }
    }
    if let (Some(start), Some(end)) = (gap_start, gap_end) {
        gaps.push((start, end));
    }
    gaps
}
