// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// §4.7 "Trigger": true iff the uncompacted view has grown past
/// `compaction_threshold` and no distillation worker is currently running.
pub fn should_trigger(uncompacted_tokens: u32, compaction_threshold: u32, distillation_running: bool) -> bool {
    !distillation_running && uncompacted_tokens >= compaction_threshold
}
