//! Engine control and the simulation core boundary.
//!
//! The simulation core (movement, conversations, agent behaviour) is an
//! external collaborator. This module owns the engine *record* and tells the
//! core what happened to it through [`SimulationCore::notify`], always after
//! the transaction that changed the record has committed.

use crate::error::WorldResult;
use crate::input::InputId;
use crate::store::StoreTx;
use tracing::{debug, info, warn};
use worldkeeper_env::{EngineId, WorldId};

/// Something the simulation core needs to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSignal {
    /// Engine was started; run it under `generation`
    Started { engine_id: EngineId, generation: u64 },

    /// Engine was stopped; loops under older generations must exit
    Stopped { engine_id: EngineId, generation: u64 },

    /// Engine was restarted in place after a stall
    Kicked { engine_id: EngineId, generation: u64 },

    /// New input waiting in the log
    InputPending { input: InputId },
}

impl EngineSignal {
    pub fn engine_id(&self) -> EngineId {
        match self {
            EngineSignal::Started { engine_id, .. }
            | EngineSignal::Stopped { engine_id, .. }
            | EngineSignal::Kicked { engine_id, .. } => *engine_id,
            EngineSignal::InputPending { input } => input.engine_id,
        }
    }
}

/// Boundary to the simulation core.
///
/// Implementations must be cheap and non-blocking: they are called on the
/// request path right after a commit.
pub trait SimulationCore: Send + Sync {
    fn notify(&self, signal: &EngineSignal);
}

/// Core that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCore;

impl SimulationCore for NullCore {
    fn notify(&self, signal: &EngineSignal) {
        debug!("Null core dropping {:?}", signal);
    }
}

/// Starts the world's engine.
///
/// Time is forcibly advanced to the present: the stopped window is skipped
/// rather than simulated. Starting a running engine is a no-op.
pub fn start_engine(tx: &StoreTx<'_>, world_id: WorldId) -> WorldResult<()> {
    let status = tx.require_status(world_id)?;
    let mut engine = tx.require_engine(status.engine_id)?;
    if engine.running {
        warn!("Engine {} for world {} is already running", engine.id, world_id);
        return Ok(());
    }
    engine.current_time = Some(tx.now());
    engine.running = true;
    engine.generation_number += 1;
    tx.put_engine(&engine)?;

    info!("Started engine {} (generation {})", engine.id, engine.generation_number);
    tx.signal(EngineSignal::Started {
        engine_id: engine.id,
        generation: engine.generation_number,
    });
    Ok(())
}

/// Stops the world's engine. Stopping a stopped engine is a no-op.
pub fn stop_engine(tx: &StoreTx<'_>, world_id: WorldId) -> WorldResult<()> {
    let status = tx.require_status(world_id)?;
    let mut engine = tx.require_engine(status.engine_id)?;
    if !engine.running {
        warn!("Engine {} for world {} isn't currently running", engine.id, world_id);
        return Ok(());
    }
    engine.running = false;
    engine.generation_number += 1;
    tx.put_engine(&engine)?;

    info!("Stopped engine {} (generation {})", engine.id, engine.generation_number);
    tx.signal(EngineSignal::Stopped {
        engine_id: engine.id,
        generation: engine.generation_number,
    });
    Ok(())
}

/// Restarts the world's engine in place, leaving `running` untouched.
pub fn kick_engine(tx: &StoreTx<'_>, world_id: WorldId) -> WorldResult<()> {
    let status = tx.require_status(world_id)?;
    let mut engine = tx.require_engine(status.engine_id)?;
    engine.generation_number += 1;
    tx.put_engine(&engine)?;

    tx.signal(EngineSignal::Kicked {
        engine_id: engine.id,
        generation: engine.generation_number,
    });
    Ok(())
}
