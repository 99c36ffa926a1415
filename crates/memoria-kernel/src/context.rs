// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use crate::workload::{Capabilities, Workload};

/// The two pieces of module-level state named in §9 ("global state"), passed
/// explicitly through a context record instead of living as globals or
/// thread-locals. Only the turn coordinator constructs/mutates one of these
/// per turn; tools and engines only read it.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub workload: Workload,
    pub capabilities: Capabilities,
    /// The current-turn environment map (§5), delivered per user message and
    /// taking precedence over the process environment when spawning
    /// child processes for tools (§6).
    pub environment: HashMap<String, String>,
    /// Token budget this workload's sub-agent context is allowed to use
    /// (`distillation_budget` / `consolidation_budget` / `reflection_budget`
    /// from §6, or `main_agent_context` for `Workload::Main`).
    pub token_budget: u32,
}

impl TurnContext {
    pub fn new(workload: Workload, capabilities: Capabilities, token_budget: u32) -> Self {
        Self { workload, capabilities, environment: HashMap::new(), token_budget }
    }

    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.environment.get(key).map(String::as_str)
    }
}
