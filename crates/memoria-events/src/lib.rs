// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! In-process event bus (§6). Unlike the teacher's `mpsc::Sender<AgentEvent>`
//! (one async consumer per channel), subscribers here run synchronously
//! within the publisher's suspension point, so the bus holds subscriber
//! closures directly instead of a channel.

use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Named event payloads the engine emits (§6's enumerated list). Each carries
/// a typed payload rather than a free-form map, the way `AgentEvent` does it,
/// but payloads that are themselves JSON-ish (e.g. worker results) are kept
/// as `serde_json::Value` since their shape is caller-defined.
#[derive(Debug, Clone)]
pub enum Event {
    TemporalDistillationStarted { worker_id: String },
    TemporalDistillationComplete { worker_id: String, summaries_created: u32 },
    TemporalSummaryCreated { summary_id: String, order: u32 },
    LtmConsolidationStarted { worker_id: String },
    LtmConsolidationComplete { worker_id: String, entries_created: u32, entries_updated: u32, entries_archived: u32 },
    LtmEntryUpdated { slug: String, version: u32 },
    WorkerStarted { worker_id: String, kind: String },
    WorkerCompleted { worker_id: String },
    WorkerFailed { worker_id: String, error: String },
    AgentTurnStarted { session_id: String },
    AgentTurnCompleted { session_id: String },
    ToolCallStarted { call_id: String, tool_name: String },
    ToolCallCompleted { call_id: String, is_error: bool },
    PresentStateUpdated { payload: Value },
    BackgroundTasksChanged,
}

impl Event {
    /// The `temporal.distillation.started`-style name §6 enumerates events
    /// by, for bus consumers that dispatch by name rather than by variant.
    pub fn name(&self) -> &'static str {
        match self {
            Event::TemporalDistillationStarted { .. } => "temporal.distillation.started",
            Event::TemporalDistillationComplete { .. } => "temporal.distillation.complete",
            Event::TemporalSummaryCreated { .. } => "temporal.summary.created",
            Event::LtmConsolidationStarted { .. } => "ltm.consolidation.started",
            Event::LtmConsolidationComplete { .. } => "ltm.consolidation.complete",
            Event::LtmEntryUpdated { .. } => "ltm.entry.updated",
            Event::WorkerStarted { .. } => "worker.started",
            Event::WorkerCompleted { .. } => "worker.completed",
            Event::WorkerFailed { .. } => "worker.failed",
            Event::AgentTurnStarted { .. } => "agent.turn.started",
            Event::AgentTurnCompleted { .. } => "agent.turn.completed",
            Event::ToolCallStarted { .. } => "tool.call.started",
            Event::ToolCallCompleted { .. } => "tool.call.completed",
            Event::PresentStateUpdated { .. } => "present.state.updated",
            Event::BackgroundTasksChanged => "background.tasks.changed",
        }
    }
}

type Subscriber = Arc<dyn Fn(&Event) + Send + Sync>;

/// Holds zero or more subscriber closures; `publish` calls each in
/// registration order, synchronously, on the publisher's own stack.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: impl Fn(&Event) + Send + Sync + 'static) {
        self.subscribers.lock().unwrap().push(Arc::new(handler));
    }

    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.lock().unwrap().clone();
        for subscriber in subscribers {
            subscriber(&event);
        }
    }
}
