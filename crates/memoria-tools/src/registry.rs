// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use memoria_kernel::Capabilities;
use serde_json::{json, Value};

use crate::tool::{Tool, ToolOutput};

/// Dynamic dispatch table, grounded on the teacher's `ToolRegistry` but keyed
/// to `Capabilities`' allow-list rather than `AgentMode`, since the engine's
/// gating is per-`TurnContext` rather than a fixed enum of UI modes.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// JSON Schema objects for every registered tool, in the shape a model
    /// provider's tool-definition list expects.
    pub fn schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|t| json!({"name": t.name(), "description": t.description(), "parameters": t.parameters_schema()}))
            .collect()
    }

    /// Schemas restricted to the names `capabilities` allows.
    pub fn schemas_for(&self, capabilities: &Capabilities) -> Vec<Value> {
        self.tools
            .values()
            .filter(|t| capabilities.allows(t.name()))
            .map(|t| json!({"name": t.name(), "description": t.description(), "parameters": t.parameters_schema()}))
            .collect()
    }

    pub async fn execute(&self, name: &str, input: Value) -> ToolOutput {
        match self.tools.get(name) {
            Some(tool) => tool.execute(input).await,
            None => ToolOutput::err(format!("unknown tool: {name}")),
        }
    }
}
