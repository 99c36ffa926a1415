// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::BTreeSet;

/// Research, reflection, consolidation and distillation share the same
/// agent-loop shape but differ in tools and prompts (§9). Modeled as a single
/// polymorphic value rather than one struct per kind, mirroring the
/// `AgentMode` enum pattern in `sven_config::schema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Workload {
    Main,
    Consolidation,
    Distillation,
    Reflection,
    Research,
}

impl Workload {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workload::Main => "main",
            Workload::Consolidation => "consolidation",
            Workload::Distillation => "distillation",
            Workload::Reflection => "reflection",
            Workload::Research => "research",
        }
    }
}

/// The capability set a workload is allowed to use: a named set of tool
/// names (dynamic dispatch happens by name, per §9 — no runtime reflection).
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    allowed_tools: BTreeSet<String>,
}

impl Capabilities {
    pub fn new(tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { allowed_tools: tools.into_iter().map(Into::into).collect() }
    }

    pub fn allows(&self, tool_name: &str) -> bool {
        self.allowed_tools.contains(tool_name)
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.allowed_tools.iter().map(String::as_str)
    }
}
