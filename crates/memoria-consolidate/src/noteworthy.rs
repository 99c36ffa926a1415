// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_temporal::{Message, MessageKind};

const NOTEWORTHY_MIN_EVENTS: usize = 5;
const NOTEWORTHY_BODY_CHARS: usize = 200;

/// Testable property 9: a conversation is noteworthy iff it has at least one
/// tool-call/tool-result event, or any single message body exceeds 200
/// characters, **and** contains at least 5 events. Trivial turns (a greeting,
/// a one-line answer) are skipped so consolidation doesn't run a sub-agent
/// over nothing.
pub fn is_noteworthy(messages: &[Message]) -> bool {
    if messages.len() < NOTEWORTHY_MIN_EVENTS {
        return false;
    }
    let has_tool_activity = messages.iter().any(|m| matches!(m.kind, MessageKind::ToolCall | MessageKind::ToolResult));
    let has_long_body = messages.iter().any(|m| m.content.chars().count() > NOTEWORTHY_BODY_CHARS);
    has_tool_activity || has_long_body
}
