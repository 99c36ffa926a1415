// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Startup sequence: open the store, migrate every component, recover
//! worker/task state left behind by a crash, and wire the turn coordinator.
//! One entry point owns construction order so the binary itself stays a
//! thin event loop.

use std::sync::Arc;
use std::time::Duration;

use memoria_config::Config;
use memoria_consolidate::ConsolidationEngine;
use memoria_context::build_system_prompt;
use memoria_curate::{CurationOrchestrator, CurationThresholds};
use memoria_distill::DistillationEngine;
use memoria_events::EventBus;
use memoria_ids::IdGenerator;
use memoria_ltm::LtmTree;
use memoria_session::SessionStore;
use memoria_store::Store;
use memoria_tasks::TaskSystem;
use memoria_temporal::TemporalLog;
use memoria_tools::consolidation_registry;
use memoria_turn::TurnCoordinator;
use memoria_workers::WorkerRegistry;
use sven_model::ModelProvider;
use tracing::info;

use crate::model_agent::{ModelAgentLoop, ModelSubAgent, ModelSummarizer};

/// Picks a provider for a configured model tier. An unset tier falls back to
/// `sven_model::MockProvider`, the same deterministic stand-in the teacher
/// uses for tests — `model_reasoning`/`workhorse`/`fast` are opaque provider
/// ids per §1, so the engine never assumes any tier is actually configured.
fn provider_for(tier: Option<&str>) -> anyhow::Result<Arc<dyn ModelProvider>> {
    let Some(spec) = tier else {
        return Ok(Arc::new(sven_model::MockProvider));
    };
    let (provider, name) = spec.split_once('/').unwrap_or(("openai", spec));
    let model_config = sven_config::ModelConfig { provider: provider.to_string(), name: name.to_string(), ..Default::default() };
    Ok(Arc::from(sven_model::from_config(&model_config)?))
}

/// Everything the binary's stdin/stdout loop needs after startup.
pub struct Engine {
    pub coordinator: Arc<TurnCoordinator>,
}

/// Runs the full startup sequence from §13: open store → migrate every
/// component → `cleanup_stale()` → construct the turn coordinator.
/// `recover_killed_tasks()` runs lazily, at the top of `TurnCoordinator::run`.
pub fn build(config: &Config, store: Store) -> anyhow::Result<Engine> {
    let log = TemporalLog::open(store.clone(), IdGenerator::new())?;
    let tree = Arc::new(LtmTree::open(store.clone())?);
    let sessions = SessionStore::open(store.clone(), IdGenerator::new())?;
    let tasks = TaskSystem::open(store.clone(), IdGenerator::new(), IdGenerator::new(), IdGenerator::new())?;
    let events = EventBus::new();

    let workers = WorkerRegistry::open(store.clone(), IdGenerator::new())?;
    let stale = workers.cleanup_stale(chrono::Duration::seconds(config.worker_stale_after_seconds as i64))?;
    if !stale.is_empty() {
        info!(count = stale.len(), "marked stale workers failed on startup");
    }

    let (tool_registry, _finish) = consolidation_registry(tree.clone());
    let tool_registry = Arc::new(tool_registry);

    let fast_model = provider_for(config.models.fast.as_deref())?;
    let summarizer = Arc::new(ModelSummarizer::new(fast_model.clone()));
    let distill_workers = WorkerRegistry::open(store.clone(), IdGenerator::new())?;
    let distill = DistillationEngine::new(TemporalLog::open(store.clone(), IdGenerator::new())?, distill_workers, summarizer);

    let sub_agent_model = provider_for(config.models.workhorse.as_deref())?;
    let sub_agent = Arc::new(ModelSubAgent::new(sub_agent_model, tool_registry.schemas(), 32));
    let consolidate = ConsolidationEngine::new(tree.clone(), sub_agent);

    let curate_workers = WorkerRegistry::open(store.clone(), IdGenerator::new())?;
    let curate = CurationOrchestrator::new(TemporalLog::open(store.clone(), IdGenerator::new())?, distill, consolidate, curate_workers, events.clone());

    let thresholds = CurationThresholds {
        compaction_threshold: config.compaction_threshold,
        recency_buffer_messages: config.recency_buffer_messages,
        distillation_group_ceiling_tokens: config.distillation_budget,
        order_compression_threshold: config.order_compression_threshold,
    };

    let main_model = provider_for(config.models.model_reasoning.as_deref())?;
    let agent_loop: Arc<dyn memoria_turn::AgentLoop> = Arc::new(ModelAgentLoop::new(main_model, tool_registry.clone()));

    // The system prompt built here is only used to size-check that LTM's two
    // default entries exist (§6 "creates the two default LTM entries"); the
    // coordinator rebuilds it fresh before every model call (§4.6).
    let _ = build_system_prompt(&tree, &tool_registry.schemas(), None)?;

    let coordinator = Arc::new(TurnCoordinator::new(
        log,
        tree,
        tool_registry.schemas(),
        sessions,
        tasks,
        curate,
        events,
        agent_loop,
        thresholds,
        config.temporal_budget,
        Duration::from_secs(config.alarm_poll_interval_seconds),
    ));

    Ok(Engine { coordinator })
}
