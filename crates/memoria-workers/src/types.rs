// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};

/// §3 Worker kinds — background job types the curation pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerType {
    Distillation,
    Consolidation,
    Reflection,
    Research,
}

impl WorkerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerType::Distillation => "distillation",
            WorkerType::Consolidation => "consolidation",
            WorkerType::Reflection => "reflection",
            WorkerType::Research => "research",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "distillation" => Some(WorkerType::Distillation),
            "consolidation" => Some(WorkerType::Consolidation),
            "reflection" => Some(WorkerType::Reflection),
            "research" => Some(WorkerType::Research),
            _ => None,
        }
    }
}

/// §3 Worker status — transitions monotonically `pending -> running ->
/// (completed|failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Pending => "pending",
            WorkerStatus::Running => "running",
            WorkerStatus::Completed => "completed",
            WorkerStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WorkerStatus::Pending),
            "running" => Some(WorkerStatus::Running),
            "completed" => Some(WorkerStatus::Completed),
            "failed" => Some(WorkerStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Worker {
    pub id: String,
    pub kind: WorkerType,
    pub status: WorkerStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}
