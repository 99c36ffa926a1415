// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::fmt;

/// The kinds the identifier service (§4.1) hands out ids for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Session,
    Message,
    Summary,
    Worker,
    Task,
    Alarm,
    Report,
}

impl IdKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            IdKind::Session => "session",
            IdKind::Message => "message",
            IdKind::Summary => "summary",
            IdKind::Worker => "worker",
            IdKind::Task => "task",
            IdKind::Alarm => "alarm",
            IdKind::Report => "report",
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
