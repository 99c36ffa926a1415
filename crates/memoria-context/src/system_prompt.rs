// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use memoria_kernel::estimate_tokens;
use memoria_ltm::LtmTree;
use serde_json::Value;

const PREAMBLE: &str = "You are a coding assistant with access to a persistent memory store. \
Identity and behavior sections below, if present, are long-term memory you have previously \
written about yourself; treat them as binding instructions, not suggestions.";

/// The static prompt block (§4.6 part 1): identical across turns for a given
/// store state so a model provider's prompt cache can reuse it verbatim.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    pub text: String,
    pub token_estimate: u32,
}

/// Builds the system prompt from current LTM state, the tool schemas the
/// caller has already resolved for this turn's capabilities, and an optional
/// session overlay (§4.6, §3 `session.overlay`).
pub fn build_system_prompt(ltm: &LtmTree, tool_schemas: &[Value], overlay: Option<&str>) -> Result<SystemPrompt, memoria_ltm::LtmError> {
    let mut text = String::from(PREAMBLE);

    if let Some(identity) = ltm.read("identity")? {
        text.push_str("\n\n<identity>\n");
        text.push_str(&identity.body);
        text.push_str("\n</identity>");
    }
    if let Some(behavior) = ltm.read("behavior")? {
        text.push_str("\n\n<behavior>\n");
        text.push_str(&behavior.body);
        text.push_str("\n</behavior>");
    }

    text.push_str("\n\nAvailable tools:\n");
    if tool_schemas.is_empty() {
        text.push_str("(none for this workload)");
    } else {
        for schema in tool_schemas {
            let name = schema.get("name").and_then(Value::as_str).unwrap_or("?");
            let description = schema.get("description").and_then(Value::as_str).unwrap_or("");
            text.push_str(&format!("- {name}: {description}\n"));
        }
    }

    if let Some(overlay) = overlay {
        text.push_str("\n\n<session-overlay>\n");
        text.push_str(overlay);
        text.push_str("\n</session-overlay>");
    }

    let token_estimate = estimate_tokens(&text);
    Ok(SystemPrompt { text, token_estimate })
}
