// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Identifier service (SPEC_FULL.md §4.1).
//!
//! Produces ids of the form `<kind>_<20-digit-decimal>` where the decimal
//! part is a single process-wide monotonic counter seeded from wall-clock
//! milliseconds. Because every kind draws from the same counter, ids sort
//! lexicographically in call order both within a kind and across kinds
//! sharing a store — satisfying §4.1's "for that kind and for all kinds
//! sharing the store's global clock" in the simplest way that needs no
//! per-kind bookkeeping.

use std::sync::Mutex;

use memoria_kernel::IdKind;

/// Width of the zero-padded decimal counter. `u64::MAX` is 20 digits; this
/// keeps lexicographic order identical to numeric order forever.
const COUNTER_WIDTH: usize = 20;

pub struct IdGenerator {
    last: Mutex<u64>,
}

impl IdGenerator {
    /// A fresh generator seeded from the current wall clock.
    pub fn new() -> Self {
        Self { last: Mutex::new(now_millis()) }
    }

    /// Restore a generator that must not reissue any id ≤ `persisted_last`.
    /// Callers that persist the last-issued counter (e.g. the store, on a
    /// dedicated `id_counters` row) use this on startup so ids remain unique
    /// across process restarts per §4.1.
    pub fn resume_from(persisted_last: u64) -> Self {
        Self { last: Mutex::new(persisted_last.max(now_millis())) }
    }

    /// Returns an id strictly greater than every previously returned id, for
    /// this kind and every other kind drawn from this generator.
    pub fn next(&self, kind: IdKind) -> String {
        let mut last = self.last.lock().unwrap();
        let now = now_millis();
        let value = now.max(*last + 1);
        *last = value;
        format!("{}_{:0width$}", kind.prefix(), value, width = COUNTER_WIDTH)
    }

    /// The current counter value, for callers that want to persist it.
    pub fn current(&self) -> u64 {
        *self.last.lock().unwrap()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing_within_a_kind() {
        let gen = IdGenerator::new();
        let a = gen.next(IdKind::Message);
        let b = gen.next(IdKind::Message);
        assert!(b > a);
    }

    #[test]
    fn ids_are_strictly_increasing_across_kinds() {
        let gen = IdGenerator::new();
        let a = gen.next(IdKind::Message);
        let b = gen.next(IdKind::Summary);
        // Compare the numeric suffixes, not the full string (different prefixes).
        let suffix = |s: &str| s.rsplit('_').next().unwrap().to_string();
        assert!(suffix(&b) > suffix(&a));
    }

    #[test]
    fn prefix_matches_kind() {
        let gen = IdGenerator::new();
        let id = gen.next(IdKind::Worker);
        assert!(id.starts_with("worker_"));
    }

    #[test]
    fn resume_from_never_goes_backward() {
        let gen = IdGenerator::new();
        let a = gen.next(IdKind::Task);
        let resumed = IdGenerator::resume_from(gen.current());
        let b = resumed.next(IdKind::Task);
        assert!(b > a);
    }

    #[test]
    fn rapid_calls_still_strictly_increase() {
        let gen = IdGenerator::new();
        let mut prev = gen.next(IdKind::Alarm);
        for _ in 0..1000 {
            let next = gen.next(IdKind::Alarm);
            assert!(next > prev, "{next} should be greater than {prev}");
            prev = next;
        }
    }
}
