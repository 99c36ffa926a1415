// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Context assembler (SPEC_FULL.md §4.6): two pure, side-effect-free
//! functions building the system prompt and the bounded conversation view
//! from current store state. All mutation goes through `memoria-temporal`'s
//! `append_message`; nothing here writes.

mod system_prompt;
mod turns;

pub use system_prompt::{build_system_prompt, SystemPrompt};
pub use turns::{build_turns, AssistantPart, Turn, ToolCallPayload, ToolResultPayload};
