// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::atomic::{AtomicBool, Ordering};

use memoria_consolidate::ConsolidationEngine;
use memoria_distill::{DistillError, DistillationEngine};
use memoria_events::{Event, EventBus};
use memoria_temporal::TemporalLog;
use memoria_workers::{WorkerRegistry, WorkerType};

use crate::error::CurateError;

/// Result of one `run()` call (§4.9).
#[derive(Debug, Clone, Default)]
pub struct CurationResult {
    pub ran: bool,
    pub tokens_before: u32,
    pub tokens_after: u32,
    pub distillations_created: u32,
    /// Number of external summarizer/sub-agent calls made this pass
    /// (consolidation's one sub-agent run, plus one per distillation
    /// summary written at any order) — see DESIGN.md open question
    /// decisions for why this, rather than wall-clock turns, is counted.
    pub turns_used: u32,
}

/// Knobs the orchestrator needs from configuration (§6/§12), grouped so
/// `run()` doesn't take five bare `u32`s.
#[derive(Debug, Clone, Copy)]
pub struct CurationThresholds {
    pub compaction_threshold: u32,
    pub recency_buffer_messages: u32,
    pub distillation_group_ceiling_tokens: u32,
    pub order_compression_threshold: u32,
}

/// Combines consolidation and distillation into one pipeline with a
/// process-wide `in_progress` gate (§4.9).
pub struct CurationOrchestrator {
    log: TemporalLog,
    distill: DistillationEngine,
    consolidate: ConsolidationEngine,
    workers: WorkerRegistry,
    events: EventBus,
    in_progress: AtomicBool,
}

impl CurationOrchestrator {
    pub fn new(
        log: TemporalLog,
        distill: DistillationEngine,
        consolidate: ConsolidationEngine,
        workers: WorkerRegistry,
        events: EventBus,
    ) -> Self {
        Self { log, distill, consolidate, workers, events, in_progress: AtomicBool::new(false) }
    }

    /// Concurrent calls while a prior run is still in flight return
    /// `ran=false` immediately rather than queuing (§4.9).
    pub async fn run(&self, force: bool, thresholds: CurationThresholds) -> Result<CurationResult, CurateError> {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            return Ok(CurationResult::default());
        }
        let result = self.run_inner(force, thresholds).await;
        self.in_progress.store(false, Ordering::SeqCst);
        result
    }

    async fn run_inner(&self, force: bool, thresholds: CurationThresholds) -> Result<CurationResult, CurateError> {
        if !force && !self.distill.should_trigger(thresholds.compaction_threshold)? {
            return Ok(CurationResult::default());
        }

        let tokens_before = self.log.estimate_uncompacted_tokens()?;
        let mut turns_used = 0u32;

        // Phase 1 — consolidation, over the same raw range distillation is
        // about to compress. Failures are logged and never abort phase 2.
        let uncovered = self.log.uncovered_messages()?;
        if let Some(range) = memoria_distill::select_range(&uncovered, thresholds.recency_buffer_messages) {
            let worker = self.workers.create(WorkerType::Consolidation)?;
            self.events.publish(Event::LtmConsolidationStarted { worker_id: worker.id.clone() });
            match self.consolidate.run(range).await {
                Ok(outcome) => {
                    if !outcome.skipped {
                        turns_used += 1;
                    }
                    self.workers.complete(&worker.id)?;
                    self.events.publish(Event::LtmConsolidationComplete {
                        worker_id: worker.id,
                        entries_created: outcome.entries_created,
                        entries_updated: outcome.entries_updated,
                        entries_archived: outcome.entries_archived,
                    });
                }
                Err(error) => {
                    self.workers.fail(&worker.id, &error.to_string())?;
                    tracing::warn!(%error, "consolidation failed; proceeding to distillation");
                }
            }
        }

        // Phase 2 — distillation, always attempted. The worker row is
        // created inside `DistillationEngine::run`, so the id isn't known
        // until the run completes; the started event carries an empty id.
        self.events.publish(Event::TemporalDistillationStarted { worker_id: String::new() });
        let distillations_created = match self
            .distill
            .run(thresholds.recency_buffer_messages, thresholds.distillation_group_ceiling_tokens, thresholds.order_compression_threshold)
            .await
        {
            Ok(outcome) => {
                turns_used += outcome.summaries_created;
                self.events.publish(Event::TemporalDistillationComplete {
                    worker_id: outcome.worker_id,
                    summaries_created: outcome.summaries_created,
                });
                outcome.summaries_created
            }
            Err(DistillError::InvariantViolation(message)) => {
                return Err(CurateError::Distill(DistillError::InvariantViolation(message)));
            }
            Err(error) => {
                tracing::warn!(%error, "distillation failed; will retry next threshold crossing");
                0
            }
        };

        let tokens_after = self.log.estimate_uncompacted_tokens()?;
        Ok(CurationResult { ran: true, tokens_before, tokens_after, distillations_created, turns_used })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria_ids::IdGenerator;
    use memoria_ltm::LtmTree;
    use memoria_store::Store;
    use memoria_summarizer::{MockSummarizer, ScriptedSubAgent};
    use memoria_temporal::MessageKind;
    use memoria_workers::WorkerRegistry;
    use std::sync::Arc;

    fn orchestrator() -> CurationOrchestrator {
        let store = Store::open_in_memory().unwrap();
        let log = TemporalLog::open(store.clone(), IdGenerator::new()).unwrap();
        let distill_workers = WorkerRegistry::open(store.clone(), IdGenerator::new()).unwrap();
        let distill = DistillationEngine::new(
            TemporalLog::open(store.clone(), IdGenerator::new()).unwrap(),
            distill_workers,
            Arc::new(MockSummarizer),
        );
        let tree = Arc::new(LtmTree::open(store.clone()).unwrap());
        let consolidate = ConsolidationEngine::new(tree, Arc::new(ScriptedSubAgent::noop("nothing durable here")));
        let workers = WorkerRegistry::open(store.clone(), IdGenerator::new()).unwrap();
        CurationOrchestrator::new(log, distill, consolidate, workers, EventBus::new())
    }

    fn thresholds() -> CurationThresholds {
        CurationThresholds {
            compaction_threshold: 100,
            recency_buffer_messages: 5,
            distillation_group_ceiling_tokens: 1000,
            order_compression_threshold: 4,
        }
    }

    #[tokio::test]
    async fn does_not_run_below_threshold_unless_forced() {
        let orchestrator = orchestrator();
        orchestrator.log.append_message(MessageKind::User, "hi").unwrap();
        let result = orchestrator.run(false, thresholds()).await.unwrap();
        assert!(!result.ran);
    }

    #[tokio::test]
    async fn force_runs_even_below_threshold() {
        let orchestrator = orchestrator();
        for i in 0..10 {
            orchestrator.log.append_message(MessageKind::User, format!("message {i}")).unwrap();
        }
        let result = orchestrator.run(true, thresholds()).await.unwrap();
        assert!(result.ran);
        assert!(result.tokens_after <= result.tokens_before);
    }

    #[tokio::test]
    async fn concurrent_call_while_in_progress_returns_ran_false() {
        let orchestrator = Arc::new(orchestrator());
        orchestrator.in_progress.store(true, Ordering::SeqCst);
        let result = orchestrator.run(true, thresholds()).await.unwrap();
        assert!(!result.ran);
    }
}
