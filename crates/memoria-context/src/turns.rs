// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_temporal::{Message, MessageFilter, MessageKind, TemporalLog};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape of a `MessageKind::ToolCall` message's `content` (§4.6: "assistant
/// text and emitted tool-call events become one assistant turn"). The turn
/// coordinator encodes tool calls this way when it appends them to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Wire shape of a `MessageKind::ToolResult` message's `content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultPayload {
    pub tool_use_id: String,
    pub content: String,
    pub is_error: bool,
}

#[derive(Debug, Clone)]
pub enum AssistantPart {
    Text(String),
    ToolCall { id: String, name: String, input: Value },
}

#[derive(Debug, Clone)]
pub enum Turn {
    /// Synthetic turn standing in for every non-subsumed summary (§4.6 part
    /// 2, first bullet), labelled with the order and id range it covers.
    DistilledHistory { body: String, order: u32, start_id: String, end_id: String },
    User { text: String },
    Assistant { parts: Vec<AssistantPart> },
    ToolResult { tool_use_id: String, content: String, is_error: bool },
}

impl Turn {
    fn token_estimate(&self) -> u32 {
        match self {
            Turn::DistilledHistory { body, .. } => memoria_kernel::estimate_tokens(body),
            Turn::User { text } => memoria_kernel::estimate_tokens(text),
            Turn::Assistant { parts } => parts
                .iter()
                .map(|p| match p {
                    AssistantPart::Text(t) => memoria_kernel::estimate_tokens(t),
                    AssistantPart::ToolCall { input, .. } => memoria_kernel::estimate_tokens(&input.to_string()),
                })
                .sum(),
            Turn::ToolResult { content, .. } => memoria_kernel::estimate_tokens(content),
        }
    }
}

/// A unit that must be dropped or kept together when trimming to budget
/// (§4.6 part 2, third bullet): a user turn stands alone; an assistant turn
/// travels with every tool-result turn it produced.
struct TurnGroup {
    turns: Vec<Turn>,
    tokens: u32,
}

/// Reconstructs the bounded conversation view under `temporal_budget`.
pub fn build_turns(log: &TemporalLog, temporal_budget: u32) -> Result<Vec<Turn>, memoria_kernel::StoreFailure> {
    let effective = log.effective_summaries()?;
    let distilled_tokens: u32 = effective.iter().map(|s| s.token_estimate).sum();

    let distilled_turn = if effective.is_empty() {
        None
    } else {
        let body = effective
            .iter()
            .map(|s| format!("[order {} | {}..{}]\n{}", s.order, s.start_id, s.end_id, s.body))
            .collect::<Vec<_>>()
            .join("\n\n");
        let start_id = effective.first().unwrap().start_id.clone();
        let end_id = effective.last().unwrap().end_id.clone();
        let order = effective.iter().map(|s| s.order).max().unwrap_or(1);
        Some(Turn::DistilledHistory { body, order, start_id, end_id })
    };

    let uncovered = log.uncovered_messages()?;
    let groups = group_messages(&uncovered);

    let mut total: u32 = distilled_tokens + groups.iter().map(|g| g.tokens).sum::<u32>();
    let mut groups = groups;
    while total > temporal_budget && !groups.is_empty() {
        let dropped = groups.remove(0);
        total -= dropped.tokens;
    }

    let mut out = Vec::new();
    out.extend(distilled_turn);
    for group in groups {
        out.extend(group.turns);
    }
    Ok(out)
}

fn group_messages(messages: &[Message]) -> Vec<TurnGroup> {
    let mut groups = Vec::new();
    let mut current_parts: Vec<AssistantPart> = Vec::new();
    let mut current_tokens: u32 = 0;
    let mut current_results: Vec<Turn> = Vec::new();

    let flush_assistant = |parts: &mut Vec<AssistantPart>, results: &mut Vec<Turn>, tokens: &mut u32, groups: &mut Vec<TurnGroup>| {
        if parts.is_empty() && results.is_empty() {
            return;
        }
        let mut turns = Vec::new();
        if !parts.is_empty() {
            turns.push(Turn::Assistant { parts: std::mem::take(parts) });
        }
        turns.append(results);
        groups.push(TurnGroup { turns, tokens: *tokens });
        *tokens = 0;
    };

    for message in messages {
        match message.kind {
            MessageKind::User => {
                flush_assistant(&mut current_parts, &mut current_results, &mut current_tokens, &mut groups);
                groups.push(TurnGroup { turns: vec![Turn::User { text: message.content.clone() }], tokens: message.token_estimate });
            }
            MessageKind::Assistant => {
                current_parts.push(AssistantPart::Text(message.content.clone()));
                current_tokens += message.token_estimate;
            }
            MessageKind::ToolCall => {
                match serde_json::from_str::<ToolCallPayload>(&message.content) {
                    Ok(payload) => {
                        current_parts.push(AssistantPart::ToolCall { id: payload.id, name: payload.name, input: payload.input });
                        current_tokens += message.token_estimate;
                    }
                    Err(error) => tracing::warn!(%error, message_id = %message.id, "dropping malformed tool-call message"),
                }
            }
            MessageKind::ToolResult => match serde_json::from_str::<ToolResultPayload>(&message.content) {
                Ok(payload) => {
                    current_results.push(Turn::ToolResult {
                        tool_use_id: payload.tool_use_id,
                        content: payload.content,
                        is_error: payload.is_error,
                    });
                    current_tokens += message.token_estimate;
                }
                Err(error) => tracing::warn!(%error, message_id = %message.id, "dropping malformed tool-result message"),
            },
        }
    }
    flush_assistant(&mut current_parts, &mut current_results, &mut current_tokens, &mut groups);
    groups
}

#[allow(dead_code)]
fn total_tokens(turns: &[Turn]) -> u32 {
    turns.iter().map(Turn::token_estimate).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria_ids::IdGenerator;
    use memoria_store::Store;

    fn log() -> TemporalLog {
        TemporalLog::open(Store::open_in_memory().unwrap(), IdGenerator::new()).unwrap()
    }

    fn tool_call(id: &str, name: &str) -> String {
        serde_json::to_string(&ToolCallPayload { id: id.to_string(), name: name.to_string(), input: serde_json::json!({}) }).unwrap()
    }

    fn tool_result(id: &str, content: &str) -> String {
        serde_json::to_string(&ToolResultPayload { tool_use_id: id.to_string(), content: content.to_string(), is_error: false }).unwrap()
    }

    #[test]
    fn coalesces_consecutive_assistant_and_tool_events_into_one_turn() {
        let log = log();
        log.append_message(MessageKind::User, "what's 2+2").unwrap();
        log.append_message(MessageKind::Assistant, "let me check").unwrap();
        log.append_message(MessageKind::ToolCall, tool_call("call_1", "calculator")).unwrap();
        log.append_message(MessageKind::ToolResult, tool_result("call_1", "4")).unwrap();

        let turns = build_turns(&log, 100_000).unwrap();
        assert_eq!(turns.len(), 3);
        assert!(matches!(turns[0], Turn::User { .. }));
        assert!(matches!(&turns[1], Turn::Assistant { parts } if parts.len() == 2));
        assert!(matches!(&turns[2], Turn::ToolResult { ref tool_use_id, .. } if tool_use_id == "call_1"));
    }

    #[test]
    fn prepends_distilled_history_turn_for_effective_summaries() {
        let log = log();
        let m1 = log.append_message(MessageKind::User, "a").unwrap();
        let m2 = log.append_message(MessageKind::Assistant, "b").unwrap();
        log.append_summary(1, &m1.id, &m2.id, "summary of a,b").unwrap();
        log.append_message(MessageKind::User, "c").unwrap();

        let turns = build_turns(&log, 100_000).unwrap();
        assert!(matches!(&turns[0], Turn::DistilledHistory { body, .. } if body.contains("summary of a,b")));
        assert_eq!(turns.len(), 2);
    }

    #[test]
    fn drops_oldest_groups_first_when_over_budget() {
        let log = log();
        log.append_message(MessageKind::User, "x".repeat(400)).unwrap();
        log.append_message(MessageKind::User, "y".repeat(400)).unwrap();
        let turns = build_turns(&log, 50).unwrap();
        assert_eq!(turns.len(), 1);
        assert!(matches!(&turns[0], Turn::User { text } if text.starts_with('y')));
    }

    #[test]
    fn never_splits_a_tool_call_from_its_tool_result_when_trimming() {
        let log = log();
        log.append_message(MessageKind::User, "z".repeat(400)).unwrap();
        log.append_message(MessageKind::Assistant, "working on it").unwrap();
        log.append_message(MessageKind::ToolCall, tool_call("call_1", "ltm_read")).unwrap();
        log.append_message(MessageKind::ToolResult, tool_result("call_1", "ok")).unwrap();

        let turns = build_turns(&log, 10).unwrap();
        let has_assistant = turns.iter().any(|t| matches!(t, Turn::Assistant { .. }));
        let has_tool_result = turns.iter().any(|t| matches!(t, Turn::ToolResult { .. }));
        assert_eq!(has_assistant, has_tool_result);
    }

    #[test]
    fn malformed_tool_call_payload_is_dropped_not_fatal() {
        let log = log();
        log.append_message(MessageKind::ToolCall, "not json").unwrap();
        log.append_message(MessageKind::User, "hi").unwrap();
        let turns = build_turns(&log, 100_000).unwrap();
        assert_eq!(turns.len(), 1);
        assert!(matches!(&turns[0], Turn::User { .. }));
    }
}
