// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Bridges the out-of-scope model-provider boundary (§1, §9 "sub-agent
//! recursion") to `sven-model`'s `ModelProvider`, the only concrete model
//! client this workspace has. Three small adapters, one per consumer of the
//! boundary: the main turn loop (`memoria_turn::AgentLoop`), one-shot
//! distillation (`memoria_summarizer::Summarizer`), and the consolidation
//! sub-agent (`memoria_summarizer::SubAgent`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use memoria_context::Turn;
use memoria_summarizer::{SubAgent, SubAgentOutcome, SummarizeRequest, Summarizer, ToolDispatch};
use memoria_tools::ToolRegistry;
use memoria_turn::{AgentLoop, AgentStepInput, AgentStepOutcome, ToolCallRequest};
use serde_json::Value;
use sven_model::{CompletionRequest, Message, MessageContent, ModelProvider, ResponseEvent, Role, ToolSchema};

/// Accumulates a streamed `ResponseEvent` sequence into the final text and
/// tool-call list a single suspension point needs, mirroring the buffering
/// `sven-core`'s `stream_one_turn` does before handing control back to its
/// agentic loop.
struct PendingCall {
    id: String,
    name: String,
    args: String,
}

async fn run_completion(model: &dyn ModelProvider, messages: Vec<Message>, tools: Vec<ToolSchema>) -> anyhow::Result<(String, Vec<ToolCallRequest>)> {
    let req = CompletionRequest { messages, tools, stream: false, ..Default::default() };
    let mut stream = model.complete(req).await?;

    let mut text = String::new();
    let mut calls: Vec<PendingCall> = Vec::new();
    while let Some(event) = stream.next().await {
        match event? {
            ResponseEvent::TextDelta(delta) => text.push_str(&delta),
            ResponseEvent::ToolCall { id, name, arguments } => {
                if !id.is_empty() || !name.is_empty() {
                    calls.push(PendingCall { id, name, args: arguments });
                } else if let Some(last) = calls.last_mut() {
                    last.args.push_str(&arguments);
                }
            }
            ResponseEvent::ThinkingDelta(_) | ResponseEvent::Usage { .. } => {}
            ResponseEvent::Done => break,
            ResponseEvent::Error(message) => anyhow::bail!("model provider error: {message}"),
        }
    }

    let calls = calls
        .into_iter()
        .map(|c| ToolCallRequest { id: c.id, name: c.name, input: serde_json::from_str(&c.args).unwrap_or(Value::Null) })
        .collect();
    Ok((text, calls))
}

fn schema_to_tool_schema(schema: &Value) -> ToolSchema {
    ToolSchema {
        name: schema["name"].as_str().unwrap_or_default().to_string(),
        description: schema["description"].as_str().unwrap_or_default().to_string(),
        parameters: schema["parameters"].clone(),
    }
}

fn turns_to_messages(system_prompt: &str, turns: &[Turn]) -> Vec<Message> {
    let mut messages = vec![Message::system(system_prompt)];
    for turn in turns {
        match turn {
            Turn::DistilledHistory { body, .. } => messages.push(Message::user(format!("[earlier conversation, summarized]\n{body}"))),
            Turn::User { text } => messages.push(Message::user(text.clone())),
            Turn::Assistant { parts } => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        memoria_context::AssistantPart::Text(t) => text.push_str(t),
                        memoria_context::AssistantPart::ToolCall { id, name, input } => {
                            if !text.is_empty() {
                                messages.push(Message::assistant(std::mem::take(&mut text)));
                            }
                            messages.push(Message {
                                role: Role::Assistant,
                                content: MessageContent::ToolCall { tool_call_id: id.clone(), function: sven_model::FunctionCall { name: name.clone(), arguments: input.to_string() } },
                            });
                        }
                    }
                }
                if !text.is_empty() {
                    messages.push(Message::assistant(text));
                }
            }
            Turn::ToolResult { tool_use_id, content, is_error } => {
                let content = if *is_error { format!("ERROR: {content}") } else { content.clone() };
                messages.push(Message::tool_result(tool_use_id.clone(), content));
            }
        }
    }
    messages
}

/// Drives the main turn loop (§4.10) by calling `model` once per suspension
/// point and, when it requests tool calls, dispatching them through `tools`.
pub struct ModelAgentLoop {
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
}

impl ModelAgentLoop {
    pub fn new(model: Arc<dyn ModelProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self { model, tools }
    }
}

#[async_trait]
impl AgentLoop for ModelAgentLoop {
    fn model_name(&self) -> &str {
        self.model.model_name()
    }

    async fn step(&self, input: AgentStepInput) -> anyhow::Result<AgentStepOutcome> {
        let messages = turns_to_messages(&input.system_prompt, &input.turns);
        let tool_schemas: Vec<ToolSchema> = self.tools.schemas().iter().map(schema_to_tool_schema).collect();
        let (text, calls) = run_completion(self.model.as_ref(), messages, tool_schemas).await?;
        if calls.is_empty() {
            Ok(AgentStepOutcome::Done { text })
        } else {
            Ok(AgentStepOutcome::ToolCalls { text: (!text.is_empty()).then_some(text), calls })
        }
    }

    async fn execute_tool(&self, call: &ToolCallRequest) -> anyhow::Result<(String, bool)> {
        let output = self.tools.execute(&call.name, call.input.clone()).await;
        Ok((output.content, output.is_error))
    }
}

/// One-shot summarizer for the distillation engine (§4.7): a single
/// tool-free completion call per request.
pub struct ModelSummarizer {
    model: Arc<dyn ModelProvider>,
}

impl ModelSummarizer {
    pub fn new(model: Arc<dyn ModelProvider>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    fn name(&self) -> &str {
        self.model.model_name()
    }

    async fn summarize(&self, request: SummarizeRequest) -> anyhow::Result<String> {
        let system = match request.role {
            memoria_summarizer::SummarizerRole::Distillation => {
                format!("Summarize the following conversation range into at most {} tokens, preserving decisions and open questions.", request.token_budget)
            }
            memoria_summarizer::SummarizerRole::HigherOrder => {
                format!("Merge the following order-N summaries into one higher-order summary of at most {} tokens.", request.token_budget)
            }
            memoria_summarizer::SummarizerRole::Reflection => {
                format!("Reflect on the following conversation and note any durable lessons, in at most {} tokens.", request.token_budget)
            }
        };
        let messages = vec![Message::system(system), Message::user(request.content)];
        let (text, _) = run_completion(self.model.as_ref(), messages, vec![]).await?;
        Ok(text)
    }
}

/// Drives the consolidation sub-agent (§4.8): an agentic loop over the
/// `ltm_*` tools that ends when the model calls `finish_consolidation`.
pub struct ModelSubAgent {
    model: Arc<dyn ModelProvider>,
    tool_schemas: Vec<ToolSchema>,
    max_rounds: u32,
}

impl ModelSubAgent {
    pub fn new(model: Arc<dyn ModelProvider>, tool_schemas: Vec<Value>, max_rounds: u32) -> Self {
        Self { model, tool_schemas: tool_schemas.iter().map(schema_to_tool_schema).collect(), max_rounds }
    }
}

#[async_trait]
impl SubAgent for ModelSubAgent {
    async fn run(&self, system_prompt: &str, dispatch: &ToolDispatch<'_>) -> anyhow::Result<SubAgentOutcome> {
        let mut messages = vec![Message::system(system_prompt)];
        let mut counts: HashMap<String, u32> = HashMap::new();

        for _ in 0..self.max_rounds {
            let (text, calls) = run_completion(self.model.as_ref(), messages.clone(), self.tool_schemas.clone()).await?;
            if calls.is_empty() {
                if !text.is_empty() {
                    messages.push(Message::assistant(text));
                }
                messages.push(Message::user("Call finish_consolidation with a short summary when you are done."));
                continue;
            }
            for call in &calls {
                messages.push(Message { role: Role::Assistant, content: MessageContent::ToolCall { tool_call_id: call.id.clone(), function: sven_model::FunctionCall { name: call.name.clone(), arguments: call.input.to_string() } } });
                if call.name == "finish_consolidation" {
                    let summary = call.input["summary"].as_str().unwrap_or_default().to_string();
                    return Ok(SubAgentOutcome {
                        entries_created: *counts.get("ltm_create").unwrap_or(&0),
                        entries_updated: *counts.get("ltm_update").unwrap_or(&0) + *counts.get("ltm_edit").unwrap_or(&0),
                        entries_archived: *counts.get("ltm_archive").unwrap_or(&0),
                        summary,
                    });
                }
                let result = dispatch(memoria_summarizer::SubAgentToolCall { name: call.name.clone(), input: call.input.clone() });
                let result_text = result.unwrap_or_else(|error| format!("ERROR: {error}"));
                if matches!(call.name.as_str(), "ltm_create" | "ltm_update" | "ltm_edit" | "ltm_archive") && !result_text.starts_with("ERROR") {
                    *counts.entry(call.name.clone()).or_insert(0) += 1;
                }
                messages.push(Message::tool_result(call.id.clone(), result_text));
            }
        }
        anyhow::bail!("consolidation sub-agent exceeded {} rounds without calling finish_consolidation", self.max_rounds)
    }
}
