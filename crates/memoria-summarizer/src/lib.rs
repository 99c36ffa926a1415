// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The model provider is explicitly out of scope (§1): this crate only
//! defines the two shapes the curation pipeline needs from it, mirroring the
//! teacher's `ModelProvider` trait (one async method, `Send + Sync`, mockable
//! for tests) without the streaming/catalog machinery a full chat provider
//! needs — distillation only ever does one-shot prompt-in, text-out calls.

use async_trait::async_trait;
use serde_json::Value;

/// Which curation role is invoking the summarizer, so an implementation can
/// pick a role-specific system prompt (§4.7 "a role-specific prompt").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizerRole {
    Distillation,
    HigherOrder,
    Reflection,
}

#[derive(Debug, Clone)]
pub struct SummarizeRequest {
    pub role: SummarizerRole,
    pub content: String,
    pub token_budget: u32,
}

/// One-shot external summarizer (§4.7 "Summarization").
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;
    async fn summarize(&self, request: SummarizeRequest) -> anyhow::Result<String>;
}

/// Deterministic mock: truncates input to a fixed prefix so tests don't need
/// network access, the same role the teacher's `MockProvider` plays for chat
/// completions.
#[derive(Default)]
pub struct MockSummarizer;

#[async_trait]
impl Summarizer for MockSummarizer {
    fn name(&self) -> &str {
        "mock-summarizer"
    }

    async fn summarize(&self, request: SummarizeRequest) -> anyhow::Result<String> {
        let prefix: String = request.content.chars().take(120).collect();
        Ok(format!("[summary] {prefix}"))
    }
}

/// A single tool call the sub-agent wants executed, and the text (or error)
/// the dispatcher callback returned for it.
#[derive(Debug, Clone)]
pub struct SubAgentToolCall {
    pub name: String,
    pub input: Value,
}

/// Outcome of a consolidation sub-agent run (§4.8): counts of mutations plus
/// the textual summary it produced when it called `finish_consolidation`.
#[derive(Debug, Clone, Default)]
pub struct SubAgentOutcome {
    pub entries_created: u32,
    pub entries_updated: u32,
    pub entries_archived: u32,
    pub summary: String,
}

/// A tool-dispatching callback: given a tool name and its JSON input, run it
/// and return the tool-result text (or an error string, per §7's "surfaced
/// to sub-agents as a textual tool-result" policy for conflicts).
pub type ToolDispatch<'a> = dyn Fn(SubAgentToolCall) -> anyhow::Result<String> + Send + Sync + 'a;

/// The agentic loop the consolidation engine hands its prompt and tool
/// dispatcher to. Kept generic over the dispatcher rather than depending on
/// `memoria-tools` directly, since the engine only defines how sub-agents
/// run, not what they reason about (§1).
#[async_trait]
pub trait SubAgent: Send + Sync {
    async fn run(&self, system_prompt: &str, dispatch: &ToolDispatch<'_>) -> anyhow::Result<SubAgentOutcome>;
}

/// Deterministic mock sub-agent: immediately calls `finish_consolidation`
/// with a fixed outcome, without issuing any other tool calls. Useful for
/// testing the curation orchestrator without a real model.
pub struct ScriptedSubAgent {
    outcome: SubAgentOutcome,
}

impl ScriptedSubAgent {
    pub fn new(outcome: SubAgentOutcome) -> Self {
        Self { outcome }
    }

    pub fn noop(summary: impl Into<String>) -> Self {
        Self { outcome: SubAgentOutcome { summary: summary.into(), ..Default::default() } }
    }
}

#[async_trait]
impl SubAgent for ScriptedSubAgent {
    async fn run(&self, _system_prompt: &str, _dispatch: &ToolDispatch<'_>) -> anyhow::Result<SubAgentOutcome> {
        Ok(self.outcome.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_summarizer_echoes_a_prefix() {
        let summarizer = MockSummarizer;
        let out = summarizer
            .summarize(SummarizeRequest { role: SummarizerRole::Distillation, content: "hello world".to_string(), token_budget: 100 })
            .await
            .unwrap();
        assert!(out.contains("hello world"));
    }

    #[tokio::test]
    async fn scripted_sub_agent_returns_fixed_outcome() {
        let agent = ScriptedSubAgent::new(SubAgentOutcome { entries_created: 1, summary: "noted a preference".to_string(), ..Default::default() });
        let dispatch: Box<ToolDispatch> = Box::new(|_call| Ok("ok".to_string()));
        let outcome = agent.run("system prompt", &*dispatch).await.unwrap();
        assert_eq!(outcome.entries_created, 1);
        assert_eq!(outcome.summary, "noted a preference");
    }
}
