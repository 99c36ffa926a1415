// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The boundary to the external agent loop (§1, §4.10): the model call and
//! tool-execution machinery are out of scope here. This trait is the
//! teacher's `ModelProvider` shape cut down to the one suspension point the
//! coordinator needs to drive — one step per model call, cooperatively
//! resumable so the coordinator can inject mid-turn queue content between
//! steps.

use async_trait::async_trait;
use memoria_context::Turn;
use serde_json::Value;

/// What the coordinator hands the agent loop at each suspension point: the
/// (cacheable) system prompt and the reconstructed conversation turns.
#[derive(Debug, Clone)]
pub struct AgentStepInput {
    pub system_prompt: String,
    pub turns: Vec<Turn>,
}

/// A tool call the agent loop wants the coordinator to log and hand back to
/// it for execution.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Result of one step. `Done` ends the turn; `ToolCalls` means the
/// coordinator must append the calls and their results to the temporal log
/// and then call `step` again for the next suspension point.
#[derive(Debug, Clone)]
pub enum AgentStepOutcome {
    Done { text: String },
    ToolCalls { text: Option<String>, calls: Vec<ToolCallRequest> },
}

#[async_trait]
pub trait AgentLoop: Send + Sync {
    fn model_name(&self) -> &str;

    async fn step(&self, input: AgentStepInput) -> anyhow::Result<AgentStepOutcome>;

    /// Executes one requested tool call, returning its result text and
    /// whether it represents an error (§7's textual tool-result policy).
    async fn execute_tool(&self, call: &ToolCallRequest) -> anyhow::Result<(String, bool)>;
}

/// Deterministic test double: replies with a fixed script of outcomes in
/// order, ignoring the input entirely, the same role the teacher's mock
/// model provider plays for chat completions.
pub struct ScriptedAgentLoop {
    model: String,
    steps: std::sync::Mutex<std::collections::VecDeque<AgentStepOutcome>>,
}

impl ScriptedAgentLoop {
    pub fn new(model: impl Into<String>, steps: Vec<AgentStepOutcome>) -> Self {
        Self { model: model.into(), steps: std::sync::Mutex::new(steps.into_iter().collect()) }
    }

    /// A single `Done { text }` step, the shape scenario S2 needs.
    pub fn one_shot(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(model, vec![AgentStepOutcome::Done { text: text.into() }])
    }
}

#[async_trait]
impl AgentLoop for ScriptedAgentLoop {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn step(&self, _input: AgentStepInput) -> anyhow::Result<AgentStepOutcome> {
        let mut steps = self.steps.lock().unwrap();
        Ok(steps.pop_front().unwrap_or(AgentStepOutcome::Done { text: String::new() }))
    }

    async fn execute_tool(&self, _call: &ToolCallRequest) -> anyhow::Result<(String, bool)> {
        Ok(("ok".to_string(), false))
    }
}
