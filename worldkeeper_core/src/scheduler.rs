//! Durable delayed-task scheduler.
//!
//! Tasks are records in the store keyed by `task/<due>/<id>`, so a prefix
//! scan yields them earliest-first. A task is removed in the same
//! transaction that runs its handler: a committed step never runs twice,
//! and a crash before commit leaves the task due for another attempt.

use crate::encounter::Encounter;
use crate::error::{WorldError, WorldResult};
use crate::model::Tile;
use crate::store::{keys, StoreTx};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use worldkeeper_env::WorldId;

/// Work the scheduler knows how to run. Every variant carries its complete
/// continuation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Task {
    /// Start the world's engine if it is `inactive`
    #[serde(rename_all = "camelCase")]
    RestartInactiveWorld { world_id: WorldId },

    /// Queue `createAgent` for each required roster agent that is missing
    #[serde(rename_all = "camelCase")]
    EnsureRequiredAgents { world_id: WorldId },

    /// Open a ledger account for every player lacking one
    #[serde(rename_all = "camelCase")]
    BackfillAccounts { world_id: WorldId },

    /// Finish a join once the core has materialized the human's player
    #[serde(rename_all = "camelCase")]
    CompleteJoin {
        world_id: WorldId,
        token_identifier: String,
        attempt: u32,
    },

    /// One tick of the encounter arrival/dwell check
    #[serde(rename_all = "camelCase")]
    MonitorEncounter {
        encounter: Encounter,
        attempt: u32,
        both_arrival_ts: Option<u64>,
    },

    /// Transfer, clear scripted state, schedule relocation
    #[serde(rename_all = "camelCase")]
    ResolveEncounter { encounter: Encounter, forced: bool },

    /// Release both participants towards tiles drawn at resolve time
    #[serde(rename_all = "camelCase")]
    RelocateAfterEncounter {
        encounter: Encounter,
        pursuer_destination: Tile,
        quarry_destination: Tile,
    },
}

impl Task {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Task::RestartInactiveWorld { .. } => "restartInactiveWorld",
            Task::EnsureRequiredAgents { .. } => "ensureRequiredAgents",
            Task::BackfillAccounts { .. } => "backfillAccounts",
            Task::CompleteJoin { .. } => "completeJoin",
            Task::MonitorEncounter { .. } => "monitorEncounter",
            Task::ResolveEncounter { .. } => "resolveEncounter",
            Task::RelocateAfterEncounter { .. } => "relocateAfterEncounter",
        }
    }

    /// World the task operates on.
    pub fn world_id(&self) -> WorldId {
        match self {
            Task::RestartInactiveWorld { world_id }
            | Task::EnsureRequiredAgents { world_id }
            | Task::BackfillAccounts { world_id }
            | Task::CompleteJoin { world_id, .. } => *world_id,
            Task::MonitorEncounter { encounter, .. }
            | Task::ResolveEncounter { encounter, .. }
            | Task::RelocateAfterEncounter { encounter, .. } => encounter.world_id,
        }
    }
}

/// A queued task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: u64,
    /// Epoch ms at or after which the task runs
    pub due_ms: u64,
    pub task: Task,
    /// Failed attempts so far
    pub failures: u32,
    /// Epoch ms at which the task was first queued
    pub scheduled_at: u64,
}

impl ScheduledTask {
    pub(crate) fn key(&self) -> String {
        keys::task(self.due_ms, self.id)
    }
}

/// A task that exhausted its retry budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadTask {
    pub task: ScheduledTask,
    pub error: String,
    pub failed_at: u64,
}

/// Retry policy for failed tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_ms: u64,
    pub max_failures: u32,
}

impl RetryPolicy {
    /// Delay before the next attempt after `failures` failed ones.
    pub fn backoff_ms(&self, failures: u32) -> u64 {
        self.base_ms.saturating_mul(1u64 << failures.min(32))
    }
}

/// Queues `task` to run `delay_ms` after the transaction's logical time.
pub fn run_after(tx: &StoreTx<'_>, delay_ms: u64, task: Task) -> WorldResult<u64> {
    let id = tx.generate_id()?;
    let scheduled = ScheduledTask {
        id,
        due_ms: tx.now().saturating_add(delay_ms),
        task,
        failures: 0,
        scheduled_at: tx.now(),
    };
    debug!("Scheduled {} #{} in {}ms", scheduled.task.name(), id, delay_ms);
    tx.put(&scheduled.key(), &scheduled)?;
    Ok(id)
}

/// Claims a due task by deleting its record.
///
/// Returns `false` when the record is already gone, i.e. another worker
/// committed this step first; the caller must then skip the handler.
pub fn claim(tx: &StoreTx<'_>, task: &ScheduledTask) -> WorldResult<bool> {
    tx.remove(&task.key())
}

/// Records a failed attempt.
///
/// The task is re-queued after an exponential backoff, or moved to the
/// dead-letter area once `policy.max_failures` is reached. Does nothing if
/// the task is no longer queued.
pub fn record_failure(
    tx: &StoreTx<'_>,
    task: &ScheduledTask,
    err: &WorldError,
    policy: RetryPolicy,
) -> WorldResult<()> {
    if !tx.remove(&task.key())? {
        return Ok(());
    }
    let failures = task.failures + 1;
    if failures >= policy.max_failures {
        error!(
            "Task {} #{} failed {} times, dead-lettering: {}",
            task.task.name(),
            task.id,
            failures,
            err
        );
        let dead = DeadTask {
            task: ScheduledTask {
                failures,
                ..task.clone()
            },
            error: err.to_string(),
            failed_at: tx.now(),
        };
        return tx.put(&keys::dead(task.id), &dead);
    }

    let delay = policy.backoff_ms(task.failures);
    warn!(
        "Task {} #{} failed (attempt {}), retrying in {}ms: {}",
        task.task.name(),
        task.id,
        failures,
        delay,
        err
    );
    let retry = ScheduledTask {
        due_ms: tx.now().saturating_add(delay),
        failures,
        ..task.clone()
    };
    tx.put(&retry.key(), &retry)
}
