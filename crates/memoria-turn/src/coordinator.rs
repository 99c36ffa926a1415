// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use memoria_context::{build_system_prompt, build_turns};
use memoria_curate::{CurationOrchestrator, CurationThresholds};
use memoria_events::{Event, EventBus};
use memoria_ltm::LtmTree;
use memoria_protocol::{
    AssistantBlock, AssistantBody, AssistantMessage, ControlAction, Inbound, Outbound, ResultMessage, ResultSubtype,
    SystemMessage, SystemSubtype, ToolResultBody, ToolResultMessage, UserContentPart,
};
use memoria_session::SessionStore;
use memoria_tasks::TaskSystem;
use memoria_temporal::{MessageKind, TemporalLog};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::agent_loop::{AgentLoop, AgentStepInput, AgentStepOutcome};
use crate::error::TurnError;

/// Upper bound on model-call rounds within a single turn, mirroring the
/// teacher's `max_tool_rounds` wrap-up rather than looping forever if the
/// agent loop never stops requesting tool calls.
const MAX_ROUNDS_PER_TURN: u32 = 64;

/// Drives one store end to end: turn intake, mid-turn injection, alarm
/// polling, and handing off to curation after each successful turn (§4.10).
pub struct TurnCoordinator {
    log: TemporalLog,
    tree: Arc<LtmTree>,
    tool_schemas: Vec<Value>,
    sessions: SessionStore,
    tasks: TaskSystem,
    curate: CurationOrchestrator,
    events: EventBus,
    agent_loop: Arc<dyn AgentLoop>,
    thresholds: CurationThresholds,
    temporal_budget: u32,
    alarm_poll_interval: Duration,

    mid_turn_queue: Arc<Mutex<VecDeque<String>>>,
    turn_running: Arc<AtomicBool>,
    interrupt_flag: Arc<AtomicBool>,
}

impl TurnCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        log: TemporalLog,
        tree: Arc<LtmTree>,
        tool_schemas: Vec<Value>,
        sessions: SessionStore,
        tasks: TaskSystem,
        curate: CurationOrchestrator,
        events: EventBus,
        agent_loop: Arc<dyn AgentLoop>,
        thresholds: CurationThresholds,
        temporal_budget: u32,
        alarm_poll_interval: Duration,
    ) -> Self {
        Self {
            log,
            tree,
            tool_schemas,
            sessions,
            tasks,
            curate,
            events,
            agent_loop,
            thresholds,
            temporal_budget,
            alarm_poll_interval,
            mid_turn_queue: Arc::new(Mutex::new(VecDeque::new())),
            turn_running: Arc::new(AtomicBool::new(false)),
            interrupt_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// §4.10 "on startup the coordinator calls `recover_killed_tasks()`":
    /// files a report for every task left `running` by a prior crash.
    pub fn recover_on_startup(&self) -> Result<(), TurnError> {
        for task in self.tasks.tasks.recover_killed_tasks()? {
            self.tasks.reports.file("tasks", json!({"task_id": task.id, "task_type": task.task_type}))?;
        }
        Ok(())
    }

    /// The long-running loop: reads `inbound`, routes user messages to a
    /// turn (or the mid-turn queue if one is running), processes control
    /// messages immediately, and polls alarms at `alarm_poll_interval`.
    pub async fn run(self: Arc<Self>, mut inbound: mpsc::Receiver<Inbound>, outbound: mpsc::Sender<Outbound>) -> anyhow::Result<()> {
        self.recover_on_startup()?;
        let mut ticker = tokio::time::interval(self.alarm_poll_interval);
        ticker.tick().await; // first tick fires immediately; consume it.

        loop {
            tokio::select! {
                msg = inbound.recv() => {
                    match msg {
                        None => break,
                        Some(Inbound::Control(control)) => self.handle_control(control.action, &outbound).await,
                        Some(Inbound::User(user)) => {
                            // Spawned so a turn in flight never blocks this
                            // loop from reading further inbound messages —
                            // control messages still preempt immediately,
                            // and further user messages land in the
                            // mid-turn queue the moment they arrive.
                            let content = extract_text(&user.message.content);
                            let this = Arc::clone(&self);
                            let outbound = outbound.clone();
                            tokio::spawn(async move {
                                if let Err(error) = this.handle_user_message(content, &outbound).await {
                                    tracing::error!(%error, "turn handling failed");
                                }
                            });
                        }
                    }
                }
                _ = ticker.tick() => {
                    let this = Arc::clone(&self);
                    let outbound = outbound.clone();
                    tokio::spawn(async move {
                        if let Err(error) = this.poll_alarms(&outbound).await {
                            tracing::error!(%error, "alarm poll failed");
                        }
                    });
                }
            }
        }
        Ok(())
    }

    async fn handle_control(&self, action: ControlAction, outbound: &mpsc::Sender<Outbound>) {
        match action {
            ControlAction::Interrupt => {
                self.interrupt_flag.store(true, Ordering::SeqCst);
                let _ = outbound.send(system(SystemSubtype::Interrupted, json!({}))).await;
            }
            ControlAction::Status => {
                let running = self.turn_running.load(Ordering::SeqCst);
                let queued = self.mid_turn_queue.lock().unwrap().len();
                let _ = outbound.send(system(SystemSubtype::Status, json!({"turn_running": running, "mid_turn_queue_len": queued}))).await;
            }
            ControlAction::Heartbeat => {
                let _ = outbound.send(system(SystemSubtype::HeartbeatAck, json!({}))).await;
            }
        }
    }

    /// Routes an incoming user message: into the mid-turn queue if a turn is
    /// already in flight, or as the start of a new turn otherwise.
    pub async fn handle_user_message(&self, content: String, outbound: &mpsc::Sender<Outbound>) -> Result<(), TurnError> {
        if self.turn_running.swap(true, Ordering::SeqCst) {
            let position = {
                let mut queue = self.mid_turn_queue.lock().unwrap();
                queue.push_back(content);
                queue.len()
            };
            let _ = outbound.send(system(SystemSubtype::Queued, json!({"position": position}))).await;
            return Ok(());
        }
        let result = self.run_turn_chain(content, false, outbound).await;
        self.turn_running.store(false, Ordering::SeqCst);
        result
    }

    /// §4.10 alarm poll: marks due alarms fired, pushes their notes into the
    /// queued-results list, and — if no turn is running — synthesizes a
    /// background-triggered turn from whatever has accumulated there.
    async fn poll_alarms(&self, outbound: &mpsc::Sender<Outbound>) -> Result<(), TurnError> {
        let due = self.tasks.alarms.get_due_alarms(chrono::Utc::now())?;
        for alarm in due {
            self.tasks.alarms.mark_fired(&alarm.id)?;
            self.tasks.queue.push(&alarm.note)?;
        }
        if self.turn_running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.tasks.queue.is_empty()? {
            self.turn_running.store(false, Ordering::SeqCst);
            return Ok(());
        }
        let drained = self.tasks.queue.drain_all()?;
        let content = drained.join("\n");
        let result = self.run_turn_chain(content, true, outbound).await;
        self.turn_running.store(false, Ordering::SeqCst);
        result
    }

    /// Runs one turn to completion, then chains into further
    /// background-triggered turns as long as the queued-results list keeps
    /// refilling (callers must already hold the `turn_running` gate).
    async fn run_turn_chain(&self, mut content: String, mut background: bool, outbound: &mpsc::Sender<Outbound>) -> Result<(), TurnError> {
        loop {
            self.run_one_turn(&content, background, outbound).await?;
            if self.tasks.queue.is_empty()? {
                return Ok(());
            }
            let drained = self.tasks.queue.drain_all()?;
            content = drained.join("\n");
            background = true;
        }
    }

    async fn run_one_turn(&self, content: &str, background_triggered: bool, outbound: &mpsc::Sender<Outbound>) -> Result<(), TurnError> {
        self.interrupt_flag.store(false, Ordering::SeqCst);
        let started_at = Instant::now();
        let session = self.sessions.get()?;

        let label = if background_triggered { "[background] " } else { "" };
        self.log.append_message(MessageKind::User, format!("{label}{content}"))?;
        self.events.publish(Event::AgentTurnStarted { session_id: session.id.clone() });

        let mut num_turns = 0u32;
        let result_subtype;
        let mut final_text: Option<String> = None;

        loop {
            if self.interrupt_flag.load(Ordering::SeqCst) {
                result_subtype = ResultSubtype::Cancelled;
                break;
            }
            if num_turns > 0 {
                self.inject_mid_turn_queue(outbound).await?;
            }
            if num_turns >= MAX_ROUNDS_PER_TURN {
                result_subtype = ResultSubtype::ErrorMaxTurns;
                break;
            }
            num_turns += 1;

            let system_prompt = build_system_prompt(&self.tree, &self.tool_schemas, session.overlay.as_deref())?;
            let turns = build_turns(&self.log, self.temporal_budget)?;
            let input = AgentStepInput { system_prompt: system_prompt.text, turns };

            match self.agent_loop.step(input).await {
                Ok(AgentStepOutcome::Done { text }) => {
                    if !text.is_empty() {
                        self.log.append_message(MessageKind::Assistant, text.clone())?;
                    }
                    let _ = outbound
                        .send(Outbound::Assistant(AssistantMessage {
                            message: AssistantBody {
                                role: "assistant".to_string(),
                                content: vec![AssistantBlock::Text { text: text.clone() }],
                                model: self.agent_loop.model_name().to_string(),
                            },
                            session_id: Some(session.id.clone()),
                        }))
                        .await;
                    final_text = Some(text);
                    result_subtype = ResultSubtype::Success;
                    break;
                }
                Ok(AgentStepOutcome::ToolCalls { text, calls }) => {
                    if let Some(text) = text.filter(|t| !t.is_empty()) {
                        self.log.append_message(MessageKind::Assistant, text)?;
                    }
                    for call in calls {
                        let payload = memoria_context::ToolCallPayload { id: call.id.clone(), name: call.name.clone(), input: call.input.clone() };
                        self.log.append_message(MessageKind::ToolCall, serde_json::to_string(&payload).map_err(|e| TurnError::AgentLoop(e.into()))?)?;
                        self.events.publish(Event::ToolCallStarted { call_id: call.id.clone(), tool_name: call.name.clone() });

                        let (result_text, is_error) = match self.agent_loop.execute_tool(&call).await {
                            Ok(pair) => pair,
                            Err(error) => (format!("ERROR: {error}"), true),
                        };

                        let result_payload = memoria_context::ToolResultPayload {
                            tool_use_id: call.id.clone(),
                            content: result_text.clone(),
                            is_error,
                        };
                        self.log.append_message(
                            MessageKind::ToolResult,
                            serde_json::to_string(&result_payload).map_err(|e| TurnError::AgentLoop(e.into()))?,
                        )?;
                        self.events.publish(Event::ToolCallCompleted { call_id: call.id.clone(), is_error });

                        let _ = outbound
                            .send(Outbound::User(ToolResultMessage {
                                message: ToolResultBody {
                                    role: "user".to_string(),
                                    content: vec![UserContentPart::ToolResult {
                                        tool_use_id: call.id.clone(),
                                        content: result_text,
                                        is_error: Some(is_error),
                                    }],
                                },
                                session_id: Some(session.id.clone()),
                            }))
                            .await;
                    }
                }
                Err(error) => {
                    let _ = outbound.send(system(SystemSubtype::Error, json!({"message": error.to_string()}))).await;
                    result_subtype = ResultSubtype::ErrorDuringExecution;
                    break;
                }
            }
        }

        self.events.publish(Event::AgentTurnCompleted { session_id: session.id.clone() });
        let duration_ms = started_at.elapsed().as_millis() as u64;
        let is_error = matches!(result_subtype, ResultSubtype::ErrorDuringExecution | ResultSubtype::ErrorMaxTurns);
        let _ = outbound
            .send(Outbound::Result(ResultMessage {
                subtype: result_subtype,
                duration_ms,
                is_error,
                num_turns,
                session_id: session.id.clone(),
                result: final_text,
                usage: None,
            }))
            .await;

        if matches!(result_subtype, ResultSubtype::Success) {
            self.run_curation(outbound).await?;
        }
        Ok(())
    }

    /// Drains the FIFO mid-turn queue (§4.10, §8 property 7: FIFO order
    /// preserved) and, if non-empty, appends it as one additional user
    /// message — letting the next `build_turns` call pick it up naturally,
    /// rather than threading it through the agent loop's input separately.
    async fn inject_mid_turn_queue(&self, outbound: &mpsc::Sender<Outbound>) -> Result<(), TurnError> {
        let drained: Vec<String> = {
            let mut queue = self.mid_turn_queue.lock().unwrap();
            queue.drain(..).collect()
        };
        if drained.is_empty() {
            return Ok(());
        }
        let count = drained.len();
        self.log.append_message(MessageKind::User, drained.join("\n"))?;
        let _ = outbound.send(system(SystemSubtype::Injected, json!({"message_count": count}))).await;
        Ok(())
    }

    async fn run_curation(&self, outbound: &mpsc::Sender<Outbound>) -> Result<(), TurnError> {
        match self.curate.run(false, self.thresholds).await {
            Ok(result) if result.ran => {
                let _ = outbound
                    .send(system(
                        SystemSubtype::Consolidation,
                        json!({"tokens_before": result.tokens_before, "tokens_after": result.tokens_after}),
                    ))
                    .await;
                if result.distillations_created > 0 {
                    let _ = outbound.send(system(SystemSubtype::Distillation, json!({"summaries_created": result.distillations_created}))).await;
                }
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(error) => {
                let _ = outbound.send(system(SystemSubtype::Error, json!({"message": error.to_string()}))).await;
                Ok(())
            }
        }
    }
}

fn system(subtype: SystemSubtype, fields: Value) -> Outbound {
    Outbound::System(SystemMessage { subtype, fields })
}

fn extract_text(content: &memoria_protocol::UserContent) -> String {
    match content {
        memoria_protocol::UserContent::Text(text) => text.clone(),
        memoria_protocol::UserContent::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                memoria_protocol::UserContentPart::Text { text } => Some(text.clone()),
                memoria_protocol::UserContentPart::ToolResult { content, .. } => Some(content.clone()),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
