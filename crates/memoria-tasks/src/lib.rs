// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod alarms;
mod queue;
mod reports;
mod schema;
mod tasks;
mod types;

use memoria_ids::IdGenerator;
use memoria_kernel::StoreFailure;
use memoria_store::Store;

pub use alarms::AlarmStore;
pub use queue::QueuedResults;
pub use reports::ReportInbox;
pub use tasks::TaskStore;
pub use types::{Alarm, BackgroundReport, BackgroundTask, TaskStatus};

/// Facade over the four tables that make up component #6 (§3, §4.10):
/// background tasks, alarms, the mid-turn queued-results list, and the
/// background-report inbox. One `migrate` call wires up all four.
pub struct TaskSystem {
    pub tasks: TaskStore,
    pub alarms: AlarmStore,
    pub queue: QueuedResults,
    pub reports: ReportInbox,
}

impl TaskSystem {
    /// `task_ids`/`alarm_ids`/`report_ids` each draw from a single `IdKind`
    /// exclusively, so separate generator instances are as monotonic as one
    /// shared instance would be — no two of these ever stamp the same kind.
    pub fn open(
        store: Store,
        task_ids: IdGenerator,
        alarm_ids: IdGenerator,
        report_ids: IdGenerator,
    ) -> Result<Self, StoreFailure> {
        schema::migrate(&store)?;
        Ok(Self {
            tasks: TaskStore::open(store.clone(), task_ids)?,
            alarms: AlarmStore::open(store.clone(), alarm_ids)?,
            queue: QueuedResults::open(store.clone())?,
            reports: ReportInbox::open(store, report_ids)?,
        })
    }
}
