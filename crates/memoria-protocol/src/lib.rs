// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Wire types for the line-delimited JSON protocol (§6). Each line on either
//! stream is one JSON object; these types are the `serde` mirror of that
//! shape, following the teacher's `ContentPart`/`ToolResultContent` pattern
//! of tagged-by-`type` enums for the block-level pieces.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A block inside an assistant message's `content` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

/// `content` can arrive as a bare string or as an array of blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Parts(Vec<UserContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserContentPart {
    Text { text: String },
    ToolResult { tool_use_id: String, content: String, #[serde(default, skip_serializing_if = "Option::is_none")] is_error: Option<bool> },
}

/// `{"type":"user", ...}` inbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundUserMessage {
    pub message: InboundUserBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundUserBody {
    pub role: String,
    pub content: UserContent,
}

/// `{"type":"control", "action": ...}` inbound. Never enters the mid-turn
/// queue; processed immediately (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Interrupt,
    Status,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    pub action: ControlAction,
}

/// Top-level tagged union for a single inbound line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    User(InboundUserMessage),
    Control(ControlMessage),
}

/// `{"type":"assistant", ...}` outbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub message: AssistantBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantBody {
    pub role: String,
    pub content: Vec<AssistantBlock>,
    pub model: String,
}

/// Outbound tool-result echo: `{"type":"user", "message": {...tool_result}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultMessage {
    pub message: ToolResultBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultBody {
    pub role: String,
    pub content: Vec<UserContentPart>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultSubtype {
    Success,
    ErrorDuringExecution,
    ErrorMaxTurns,
    Cancelled,
}

/// `{"type":"result", ...}` — one per completed turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMessage {
    pub subtype: ResultSubtype,
    pub duration_ms: u64,
    pub is_error: bool,
    pub num_turns: u32,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SystemSubtype {
    Init,
    Queued,
    Injected,
    Interrupted,
    Status,
    HeartbeatAck,
    Error,
    Consolidation,
    Distillation,
}

/// `{"type":"system", "subtype": ..., ...}` — everything else, carried as a
/// free-form payload since each subtype has its own fields (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMessage {
    pub subtype: SystemSubtype,
    #[serde(flatten)]
    pub fields: Value,
}

/// Top-level tagged union for a single outbound line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Assistant(AssistantMessage),
    User(ToolResultMessage),
    Result(ResultMessage),
    System(SystemMessage),
}

impl Outbound {
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Inbound {
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
