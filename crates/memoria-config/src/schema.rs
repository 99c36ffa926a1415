// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

fn default_main_agent_context() -> u32 {
    180_000
}
fn default_temporal_budget() -> u32 {
    64_000
}
fn default_compaction_threshold() -> u32 {
    80_000
}
fn default_compaction_target() -> u32 {
    60_000
}
fn default_compaction_hard_limit() -> u32 {
    150_000
}
fn default_recency_buffer_messages() -> u32 {
    10
}
fn default_distillation_budget() -> u32 {
    20_000
}
fn default_consolidation_budget() -> u32 {
    20_000
}
fn default_reflection_budget() -> u32 {
    20_000
}
fn default_session_db_path() -> String {
    "memoria.sqlite3".to_string()
}
fn default_worker_stale_after_seconds() -> u64 {
    600
}
fn default_alarm_poll_interval_seconds() -> u64 {
    1
}
fn default_order_compression_threshold() -> u32 {
    4
}

/// Per-tier model identifiers (§6 config table: `model_reasoning` /
/// `workhorse` / `fast`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelTiers {
    pub model_reasoning: Option<String>,
    pub workhorse: Option<String>,
    pub fast: Option<String>,
}

/// Every named configuration item from §6's table, plus the ambient items
/// §12 adds (`session_db_path`, per-order compression thresholds,
/// `worker_stale_after`, `alarm_poll_interval`), following the teacher's
/// named-default-function convention so every field has a well-documented
/// fallback instead of relying on `bool`/`0`/`""` defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelTiers,

    #[serde(default = "default_main_agent_context")]
    pub main_agent_context: u32,
    #[serde(default = "default_temporal_budget")]
    pub temporal_budget: u32,
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: u32,
    #[serde(default = "default_compaction_target")]
    pub compaction_target: u32,
    #[serde(default = "default_compaction_hard_limit")]
    pub compaction_hard_limit: u32,
    #[serde(default = "default_recency_buffer_messages")]
    pub recency_buffer_messages: u32,

    #[serde(default = "default_distillation_budget")]
    pub distillation_budget: u32,
    #[serde(default = "default_consolidation_budget")]
    pub consolidation_budget: u32,
    #[serde(default = "default_reflection_budget")]
    pub reflection_budget: u32,

    #[serde(default = "default_session_db_path")]
    pub session_db_path: String,

    /// Per-order compaction threshold multiplier: order N+1 is considered
    /// once non-subsumed order-N summaries number at least this many times
    /// the typical summary count (§4.7 "Higher-order").
    #[serde(default = "default_order_compression_threshold")]
    pub order_compression_threshold: u32,

    #[serde(default = "default_worker_stale_after_seconds")]
    pub worker_stale_after_seconds: u64,

    #[serde(default = "default_alarm_poll_interval_seconds")]
    pub alarm_poll_interval_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models: ModelTiers::default(),
            main_agent_context: default_main_agent_context(),
            temporal_budget: default_temporal_budget(),
            compaction_threshold: default_compaction_threshold(),
            compaction_target: default_compaction_target(),
            compaction_hard_limit: default_compaction_hard_limit(),
            recency_buffer_messages: default_recency_buffer_messages(),
            distillation_budget: default_distillation_budget(),
            consolidation_budget: default_consolidation_budget(),
            reflection_budget: default_reflection_budget(),
            session_db_path: default_session_db_path(),
            order_compression_threshold: default_order_compression_threshold(),
            worker_stale_after_seconds: default_worker_stale_after_seconds(),
            alarm_poll_interval_seconds: default_alarm_poll_interval_seconds(),
        }
    }
}
