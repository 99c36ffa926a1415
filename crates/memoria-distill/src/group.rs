// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_temporal::{Message, MessageKind};

/// True if a group may end right after `messages[i]` — i.e. it completes a
/// full user/assistant/tool-result sequence rather than leaving a dangling
/// tool call (§4.7 "Grouping": "never split inside a (tool_call, tool_result)
/// pair"), mirroring the teacher's backward-scan past `ToolCall`/`ToolResult`
/// in `ensure_fits_budget`.
fn is_boundary(messages: &[Message], i: usize) -> bool {
    match messages[i].kind {
        MessageKind::ToolCall => false,
        MessageKind::ToolResult => true,
        MessageKind::User => true,
        MessageKind::Assistant => !matches!(messages.get(i + 1).map(|m| m.kind), Some(MessageKind::ToolCall)),
    }
}

/// Splits `messages` into contiguous groups, each near but not exceeding
/// `ceiling_tokens`, preferring to cut at turn boundaries and never leaving a
/// tool call separated from its result. A single turn larger than the
/// ceiling still forms its own (oversized) group rather than being split
/// unsafely.
pub fn group_for_summarization(messages: &[Message], ceiling_tokens: u32) -> Vec<Vec<Message>> {
    let mut groups = Vec::new();
    let mut current: Vec<Message> = Vec::new();
    let mut current_tokens: u32 = 0;
    let mut last_boundary: Option<usize> = None;

    for (i, m) in messages.iter().enumerate() {
        current.push(m.clone());
        current_tokens += m.token_estimate;
        if is_boundary(messages, i) {
            last_boundary = Some(current.len());
        }

        if current_tokens > ceiling_tokens {
            match last_boundary {
                Some(split_at) if split_at < current.len() => {
                    let remainder = current.split_off(split_at);
                    groups.push(std::mem::take(&mut current));
                    current_tokens = remainder.iter().map(|m| m.token_estimate).sum();
                    current = remainder;
                    last_boundary = None;
                }
                Some(split_at) if split_at == current.len() => {
                    groups.push(std::mem::take(&mut current));
                    current_tokens = 0;
                    last_boundary = None;
                }
                _ => {
                    // No boundary yet (still inside an open tool-call group);
                    // keep accumulating until one appears.
                }
            }
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
