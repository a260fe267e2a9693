//! Lifecycle supervisor.
//!
//! Keeps an engine running only while someone is watching its world:
//!
//! ```text
//!            touch (status inactive)
//!   inactive ------------------------> running
//!      ^                                  |  \
//!      |   idle sweep (lastViewed stale)  |   \ dead sweep (clock stalled)
//!      +----------------------------------+    +--> kick, still running
//!
//!   stoppedByDeveloper: left alone by touch and both sweeps
//! ```
//!
//! Every function here is one handler body: it runs inside a single store
//! transaction and re-reads the status it acts on.

use crate::config::WorldConfig;
use crate::engine::{kick_engine, start_engine, stop_engine};
use crate::error::{WorldError, WorldResult};
use crate::input::{submit, InputCommand};
use crate::model::{Engine, Status, World, WorldDescriptions, WorldStatus};
use crate::scheduler::{run_after, Task};
use crate::store::StoreTx;
use tracing::{debug, info, warn};
use worldkeeper_env::{EngineId, WorldId};

/// Bootstraps a world: empty player set, fresh engine, `running` status and
/// empty descriptions. The engine is started in the same transaction.
///
/// At most one world is ever the default: the claim is recorded under its
/// own key in this transaction, and a second claim fails with a
/// precondition error.
pub fn create_world(
    tx: &StoreTx<'_>,
    world_id: WorldId,
    engine_id: EngineId,
    is_default: bool,
) -> WorldResult<WorldStatus> {
    if is_default {
        if let Some(existing) = tx.default_world()? {
            return Err(WorldError::precondition(format!("default world {} already exists", existing)));
        }
        tx.put_default_world(world_id)?;
    }
    tx.put_world(&World::new(world_id))?;
    tx.put_engine(&Engine::new(engine_id))?;
    tx.put_descriptions(world_id, &WorldDescriptions::default())?;
    let status = WorldStatus {
        world_id,
        engine_id,
        is_default,
        status: Status::Running,
        last_viewed: tx.now(),
    };
    tx.put_status(&status)?;
    start_engine(tx, world_id)?;
    info!("🌍 Created world {} (engine {}, default: {})", world_id, engine_id, is_default);
    Ok(status)
}

/// Liveness signal from an observer.
///
/// `lastViewed` is written at most once per half heartbeat interval and
/// never moves backwards. Queues the maintenance tasks that keep the world
/// playable; an `inactive` world additionally gets a restart task.
pub fn touch(tx: &StoreTx<'_>, config: &WorldConfig, world_id: WorldId) -> WorldResult<WorldStatus> {
    let mut status = tx.require_status(world_id)?;
    let now = tx.now();

    let stale_before = now.saturating_sub(config.heartbeat_interval_ms / 2);
    if status.last_viewed == 0 || status.last_viewed < stale_before {
        status.last_viewed = status.last_viewed.max(now);
        tx.put_status(&status)?;
    }

    match status.status {
        Status::StoppedByDeveloper => {
            debug!("World {} is stopped by developer, not restarting.", world_id);
        }
        Status::Inactive => {
            run_after(tx, 0, Task::RestartInactiveWorld { world_id })?;
        }
        Status::Running => {}
    }

    run_after(tx, 0, Task::EnsureRequiredAgents { world_id })?;
    run_after(tx, 0, Task::BackfillAccounts { world_id })?;
    Ok(status)
}

/// Restarts the world if it is still `inactive`. Returns whether it did.
pub fn restart_inactive(tx: &StoreTx<'_>, world_id: WorldId) -> WorldResult<bool> {
    let Some(mut status) = tx.status(world_id)? else {
        warn!("Restart requested for unknown world {}", world_id);
        return Ok(false);
    };
    if status.status != Status::Inactive {
        return Ok(false);
    }
    info!("Restarting inactive world {}...", world_id);
    status.status = Status::Running;
    tx.put_status(&status)?;
    start_engine(tx, world_id)?;
    Ok(true)
}

/// Stops the world if it is `running` and unobserved for longer than the
/// idle timeout. Returns whether it did.
pub fn stop_if_idle(tx: &StoreTx<'_>, config: &WorldConfig, world_id: WorldId) -> WorldResult<bool> {
    let Some(mut status) = tx.status(world_id)? else {
        return Ok(false);
    };
    if status.status != Status::Running
        || tx.now().saturating_sub(status.last_viewed) <= config.idle_timeout_ms
    {
        return Ok(false);
    }
    info!("Stopping inactive world {}", world_id);
    status.status = Status::Inactive;
    tx.put_status(&status)?;
    stop_engine(tx, world_id)?;
    Ok(true)
}

/// Kicks the world's engine if it is `running` but its clock has fallen
/// more than twice the step period behind. Returns whether it did.
///
/// A running world whose engine record is missing is an error. An engine
/// that has never reported a time is not considered dead.
pub fn kick_if_dead(tx: &StoreTx<'_>, config: &WorldConfig, world_id: WorldId) -> WorldResult<bool> {
    let Some(status) = tx.status(world_id)? else {
        return Ok(false);
    };
    if status.status != Status::Running {
        return Ok(false);
    }
    let engine = tx.require_engine(status.engine_id)?;
    let timeout = tx.now().saturating_sub(config.dead_engine_threshold_ms());
    match engine.current_time {
        Some(current) if current < timeout => {
            warn!("Restarting dead engine {}...", engine.id);
            kick_engine(tx, world_id)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Queues `createAgent` for every required roster agent the world lacks.
///
/// An agent already requested within the last `agent_request_ttl_ms` is
/// skipped, so repeated heartbeats do not pile up duplicate requests while
/// the core has not caught up. Only a running world gets requests; a
/// stopped engine would never drain them. Returns how many were queued.
pub fn ensure_required_agents(tx: &StoreTx<'_>, config: &WorldConfig, world_id: WorldId) -> WorldResult<usize> {
    let Some(status) = tx.status(world_id)? else {
        return Ok(0);
    };
    if status.status != Status::Running {
        debug!("World {} is {}, not requesting agents", world_id, status.status);
        return Ok(0);
    }
    let now = tx.now();
    let mut descriptions = tx.descriptions(world_id)?;
    let mut queued = 0;

    for name in &config.required_agents {
        if descriptions.by_name(name).is_some() {
            continue;
        }
        let Some(index) = config.roster_index(name) else {
            warn!("Required agent {} is not in the roster", name);
            continue;
        };
        if descriptions.agent_pending(index, now, config.agent_request_ttl_ms) {
            continue;
        }
        submit(tx, status.engine_id, InputCommand::CreateAgent { description_index: index })?;
        descriptions.pending_agents.insert(index, now);
        queued += 1;
        info!("Requested agent {} for world {}", name, world_id);
    }

    if queued > 0 {
        tx.put_descriptions(world_id, &descriptions)?;
    }
    Ok(queued)
}

/// Operator stop: the world stays down until [`resume_by_developer`].
pub fn stop_by_developer(tx: &StoreTx<'_>, world_id: WorldId) -> WorldResult<()> {
    let mut status = tx.require_status(world_id)?;
    if status.status == Status::StoppedByDeveloper {
        return Ok(());
    }
    let was_running = status.status == Status::Running;
    status.status = Status::StoppedByDeveloper;
    tx.put_status(&status)?;
    if was_running {
        stop_engine(tx, world_id)?;
    }
    info!("World {} stopped by developer", world_id);
    Ok(())
}

/// Operator resume of a developer-stopped world.
pub fn resume_by_developer(tx: &StoreTx<'_>, world_id: WorldId) -> WorldResult<()> {
    let mut status = tx.require_status(world_id)?;
    if status.status != Status::StoppedByDeveloper {
        return Ok(());
    }
    status.status = Status::Running;
    tx.put_status(&status)?;
    start_engine(tx, world_id)?;
    info!("World {} resumed by developer", world_id);
    Ok(())
}
