// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use memoria_ltm::LtmTree;
use memoria_summarizer::{SubAgent, SubAgentToolCall};
use memoria_temporal::Message;

use crate::error::ConsolidateError;
use crate::noteworthy::is_noteworthy;

const SYSTEM_PROMPT_PREAMBLE: &str = "You are the memory consolidation sub-agent. Read the conversation \
below and decide whether any durable fact about the user, their preferences, or the project should be \
recorded in long-term memory. Use ltm_create/ltm_update/ltm_edit/ltm_rename/ltm_reparent/ltm_archive as \
needed, then call finish_consolidation exactly once with a summary of what you changed.";

/// Outcome of a consolidation pass (§4.8).
#[derive(Debug, Clone, Default)]
pub struct ConsolidationOutcome {
    pub entries_created: u32,
    pub entries_updated: u32,
    pub entries_archived: u32,
    pub summary: String,
    pub skipped: bool,
}

pub struct ConsolidationEngine {
    tree: Arc<LtmTree>,
    sub_agent: Arc<dyn SubAgent>,
}

impl ConsolidationEngine {
    pub fn new(tree: Arc<LtmTree>, sub_agent: Arc<dyn SubAgent>) -> Self {
        Self { tree, sub_agent }
    }

    /// Runs consolidation over `messages` — the same raw range distillation
    /// is about to compress (§4.8: "runs before distillation on the same raw
    /// messages"). Skips trivial turns via the noteworthy heuristic.
    pub async fn run(&self, messages: &[Message]) -> Result<ConsolidationOutcome, ConsolidateError> {
        if !is_noteworthy(messages) {
            return Ok(ConsolidationOutcome { skipped: true, ..Default::default() });
        }

        let system_prompt = self.build_system_prompt()?;
        let (registry, _finish) = memoria_tools::consolidation_registry(self.tree.clone());

        let dispatch = move |call: SubAgentToolCall| -> anyhow::Result<String> {
            let output = futures::executor::block_on(registry.execute(&call.name, call.input));
            if output.is_error {
                Ok(format!("ERROR: {}", output.content))
            } else {
                Ok(output.content)
            }
        };

        let outcome = self.sub_agent.run(&system_prompt, &dispatch).await.map_err(ConsolidateError::SubAgent)?;

        Ok(ConsolidationOutcome {
            entries_created: outcome.entries_created,
            entries_updated: outcome.entries_updated,
            entries_archived: outcome.entries_archived,
            summary: outcome.summary,
            skipped: false,
        })
    }

    fn build_system_prompt(&self) -> Result<String, ConsolidateError> {
        let mut prompt = String::from(SYSTEM_PROMPT_PREAMBLE);
        for slug in ["identity", "behavior", "knowledge"] {
            if let Some(entry) = self.tree.read(slug)? {
                prompt.push_str(&format!("\n\n<{slug}>\n{}\n</{slug}>", entry.body));
            }
        }
        Ok(prompt)
    }
}
