// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};

/// §3 Message — a temporal log row. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub kind: MessageKind,
    pub content: String,
    pub token_estimate: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Assistant,
    ToolCall,
    ToolResult,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Assistant => "assistant",
            MessageKind::ToolCall => "tool_call",
            MessageKind::ToolResult => "tool_result",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool_call" => Some(Self::ToolCall),
            "tool_result" => Some(Self::ToolResult),
            _ => None,
        }
    }
}

/// §3 Summary — a distillation row. Covers a contiguous `[start_id, end_id]`
/// range by message id for order 1, by summary id for order ≥ 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub id: String,
    pub order: u32,
    pub start_id: String,
    pub end_id: String,
    pub body: String,
    pub token_estimate: u32,
    pub subsumed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Summary {
    pub fn is_subsumed(&self) -> bool {
        self.subsumed_by.is_some()
    }
}

/// Filter for `get_messages` (§4.3): a bounded, ordered slice rather than
/// always materializing the whole log.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub since_id: Option<String>,
    pub kinds: Option<Vec<MessageKind>>,
    pub limit: Option<usize>,
}
