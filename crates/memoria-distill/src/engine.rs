// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use memoria_summarizer::{SummarizeRequest, Summarizer, SummarizerRole};
use memoria_temporal::{Message, MessageFilter, Summary, TemporalLog};
use memoria_workers::{WorkerRegistry, WorkerType};

use crate::error::DistillError;
use crate::{group, select};

/// Result of one distillation pass (§4.7). `summaries_created` counts every
/// order written this run, including higher-order compressions.
#[derive(Debug, Clone, Default)]
pub struct DistillationOutcome {
    pub summaries_created: u32,
    pub skipped: bool,
    pub worker_id: String,
}

/// Drives the whole pipeline over one store: trigger check, selection,
/// grouping, summarization, higher-order compression, and the post-write
/// invariant check (§4.7).
pub struct DistillationEngine {
    log: TemporalLog,
    workers: WorkerRegistry,
    summarizer: Arc<dyn Summarizer>,
}

impl DistillationEngine {
    pub fn new(log: TemporalLog, workers: WorkerRegistry, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { log, workers, summarizer }
    }

    pub fn should_trigger(&self, compaction_threshold: u32) -> Result<bool, DistillError> {
        let tokens = self.log.estimate_uncompacted_tokens()?;
        let running = self.workers.get_running()?.iter().any(|w| w.kind == WorkerType::Distillation);
        Ok(crate::trigger::should_trigger(tokens, compaction_threshold, running))
    }

    /// Runs one distillation worker end to end. On invariant violation, this
    /// run's writes are undone and the worker is recorded as failed; the
    /// error is returned so the orchestrator can abort the containing turn
    /// (§7 "invariant violation aborts the containing turn entirely").
    pub async fn run(
        &self,
        recency_buffer_messages: u32,
        group_ceiling_tokens: u32,
        order_compression_threshold: u32,
    ) -> Result<DistillationOutcome, DistillError> {
        let worker = self.workers.create(WorkerType::Distillation)?;
        match self.run_inner(recency_buffer_messages, group_ceiling_tokens, order_compression_threshold).await {
            Ok(outcome) => {
                self.workers.complete(&worker.id)?;
                Ok(DistillationOutcome { worker_id: worker.id, ..outcome })
            }
            Err(error) => {
                self.workers.fail(&worker.id, &error.to_string())?;
                Err(error)
            }
        }
    }

    async fn run_inner(
        &self,
        recency_buffer_messages: u32,
        group_ceiling_tokens: u32,
        order_compression_threshold: u32,
    ) -> Result<DistillationOutcome, DistillError> {
        let uncovered = self.log.uncovered_messages()?;
        let Some(range) = select::select_range(&uncovered, recency_buffer_messages) else {
            return Ok(DistillationOutcome { summaries_created: 0, skipped: true, worker_id: String::new() });
        };

        let mut created_ids: Vec<String> = Vec::new();
        let mut touched_subsumed: Vec<String> = Vec::new();

        for group in group::group_for_summarization(range, group_ceiling_tokens) {
            let content = render_group(&group);
            let body = self
                .summarizer
                .summarize(SummarizeRequest { role: SummarizerRole::Distillation, content, token_budget: group_ceiling_tokens })
                .await
                .map_err(DistillError::Summarizer)?;
            let start_id = group.first().unwrap().id.clone();
            let end_id = group.last().unwrap().id.clone();
            let summary = self.log.append_summary(1, &start_id, &end_id, body)?;
            created_ids.push(summary.id);
        }

        self.compress_higher_orders(order_compression_threshold, group_ceiling_tokens, &mut created_ids, &mut touched_subsumed)
            .await?;

        if let Err(error) = self.check_invariants(recency_buffer_messages) {
            self.rollback(&created_ids, &touched_subsumed);
            return Err(error);
        }

        Ok(DistillationOutcome { summaries_created: created_ids.len() as u32, skipped: false, worker_id: String::new() })
    }

    /// §4.7 "Higher-order": repeatedly compresses orders whose non-subsumed
    /// count meets `order_compression_threshold`, until a pass compresses
    /// nothing — the "max order determined by the data" the spec names.
    async fn compress_higher_orders(
        &self,
        order_compression_threshold: u32,
        ceiling_tokens: u32,
        created_ids: &mut Vec<String>,
        touched_subsumed: &mut Vec<String>,
    ) -> Result<(), DistillError> {
        loop {
            let summaries = self.log.get_summaries()?;
            let non_subsumed = memoria_temporal::effective_summaries(&summaries);
            let mut orders: Vec<u32> = non_subsumed.iter().map(|s| s.order).collect();
            orders.sort_unstable();
            orders.dedup();

            let mut compressed_any = false;
            for order in orders {
                let at_order: Vec<Summary> = non_subsumed.iter().filter(|s| s.order == order).cloned().collect();
                if (at_order.len() as u32) < order_compression_threshold {
                    continue;
                }
                for chunk in chunk_by_ceiling(&at_order, ceiling_tokens) {
                    if chunk.len() < 2 {
                        continue;
                    }
                    let content = chunk.iter().map(|s| s.body.clone()).collect::<Vec<_>>().join("\n\n");
                    let body = self
                        .summarizer
                        .summarize(SummarizeRequest { role: SummarizerRole::HigherOrder, content, token_budget: ceiling_tokens })
                        .await
                        .map_err(DistillError::Summarizer)?;
                    let start_id = chunk.first().unwrap().id.clone();
                    let end_id = chunk.last().unwrap().id.clone();
                    let new_summary = self.log.append_summary(order + 1, &start_id, &end_id, body)?;
                    created_ids.push(new_summary.id.clone());
                    for subsumed in &chunk {
                        self.log.mark_subsumed(&subsumed.id, &new_summary.id)?;
                        touched_subsumed.push(subsumed.id.clone());
                    }
                    compressed_any = true;
                }
            }
            if !compressed_any {
                break;
            }
        }
        Ok(())
    }

    fn check_invariants(&self, recency_buffer_messages: u32) -> Result<(), DistillError> {
        let gaps = self.log.find_coverage_gaps()?;
        if !gaps.is_empty() {
            return Err(DistillError::InvariantViolation(format!("coverage gaps: {gaps:?}")));
        }

        let all = self.log.get_messages(&MessageFilter::default())?;
        let keep = recency_buffer_messages as usize;
        if all.len() > keep {
            for message in &all[all.len() - keep..] {
                if self.log.is_covered_by_summary(&message.id)? {
                    return Err(DistillError::InvariantViolation(format!(
                        "recency buffer violated: {} is covered by a summary",
                        message.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn rollback(&self, created_ids: &[String], touched_subsumed: &[String]) {
        for id in touched_subsumed {
            if let Err(error) = self.log.clear_subsumed(id) {
                tracing::error!(%error, summary_id = %id, "failed to roll back subsumption during distillation rollback");
            }
        }
        for id in created_ids {
            if let Err(error) = self.log.delete_summary(id) {
                tracing::error!(%error, summary_id = %id, "failed to roll back summary during distillation rollback");
            }
        }
    }
}

fn render_group(messages: &[Message]) -> String {
    messages.iter().map(|m| format!("[{}] {}", m.kind.as_str(), m.content)).collect::<Vec<_>>().join("\n")
}

fn chunk_by_ceiling(items: &[Summary], ceiling_tokens: u32) -> Vec<Vec<Summary>> {
    let mut out = Vec::new();
    let mut current: Vec<Summary> = Vec::new();
    let mut tokens = 0u32;
    for item in items {
        if !current.is_empty() && tokens + item.token_estimate > ceiling_tokens {
            out.push(std::mem::take(&mut current));
            tokens = 0;
        }
        tokens += item.token_estimate;
        current.push(item.clone());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
