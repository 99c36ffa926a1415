// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde_json::Value;

/// §3 Background task status. `Killed` is the recovery-on-startup terminal
/// state; `Cancelled` is an explicit user/system request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    Killed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Killed => "killed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "killed" => Some(TaskStatus::Killed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

#[derive(Debug, Clone)]
pub struct BackgroundTask {
    pub id: String,
    pub task_type: String,
    pub description: String,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// §3 Alarm — fires monotonically once.
#[derive(Debug, Clone)]
pub struct Alarm {
    pub id: String,
    pub fires_at: DateTime<Utc>,
    pub note: String,
    pub fired: bool,
}

/// §3 Background report — unsurfaced reports are visible to the next user turn.
#[derive(Debug, Clone)]
pub struct BackgroundReport {
    pub id: String,
    pub subsystem: String,
    pub report: Value,
    pub surfaced: bool,
}
