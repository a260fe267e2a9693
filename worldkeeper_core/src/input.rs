//! Ordered input pipeline.
//!
//! Commands are appended to a per-engine log and consumed by the simulation
//! core strictly in submission order. The pipeline validates the *shape* of
//! a command (its name and argument fields) but never its meaning; whether a
//! `moveTo` is reachable is the core's business when it reads the entry.

use crate::engine::EngineSignal;
use crate::error::{WorldError, WorldResult};
use crate::model::{PlayerId, Tile};
use crate::store::{keys, StoreTx};
use serde::{Deserialize, Serialize};
use tracing::debug;
use worldkeeper_env::EngineId;

/// Handle to a submitted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputId {
    pub engine_id: EngineId,
    pub number: u64,
}

impl std::fmt::Display for InputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.engine_id, self.number)
    }
}

/// Every command the simulation core accepts, with its fixed argument shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args", rename_all = "camelCase")]
pub enum InputCommand {
    /// A human enters the world
    #[serde(rename_all = "camelCase")]
    Join {
        name: String,
        character: String,
        description: String,
        token_identifier: String,
    },

    /// A human leaves the world
    #[serde(rename_all = "camelCase")]
    Leave { player_id: PlayerId },

    /// Autonomous movement request; `None` stops
    #[serde(rename_all = "camelCase")]
    MoveTo {
        player_id: PlayerId,
        destination: Option<Tile>,
    },

    /// Scripted movement overriding autonomous behaviour; `None` releases
    #[serde(rename_all = "camelCase")]
    ForceMoveTo {
        player_id: PlayerId,
        destination: Option<Tile>,
    },

    /// Show an activity banner for `duration_ms`
    #[serde(rename_all = "camelCase")]
    SetActivity {
        player_id: PlayerId,
        description: String,
        emoji: Option<String>,
        duration_ms: u64,
    },

    /// Scale movement speed; `None` resets to normal
    #[serde(rename_all = "camelCase")]
    SetSpeedMultiplier {
        player_id: PlayerId,
        multiplier: Option<f64>,
    },

    /// Materialize a roster agent
    #[serde(rename_all = "camelCase")]
    CreateAgent { description_index: usize },
}

impl InputCommand {
    /// Parses a loosely-typed `(name, args)` pair into a command.
    ///
    /// Unknown names and arguments of the wrong shape are rejected here,
    /// before anything reaches the log.
    pub fn parse(name: &str, args: serde_json::Value) -> WorldResult<Self> {
        let envelope = serde_json::json!({ "name": name, "args": args });
        serde_json::from_value(envelope)
            .map_err(|e| WorldError::invalid_input(format!("{}: {}", name, e)))
    }

    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            InputCommand::Join { .. } => "join",
            InputCommand::Leave { .. } => "leave",
            InputCommand::MoveTo { .. } => "moveTo",
            InputCommand::ForceMoveTo { .. } => "forceMoveTo",
            InputCommand::SetActivity { .. } => "setActivity",
            InputCommand::SetSpeedMultiplier { .. } => "setSpeedMultiplier",
            InputCommand::CreateAgent { .. } => "createAgent",
        }
    }

    /// Player the command targets, if any.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            InputCommand::Leave { player_id }
            | InputCommand::MoveTo { player_id, .. }
            | InputCommand::ForceMoveTo { player_id, .. }
            | InputCommand::SetActivity { player_id, .. }
            | InputCommand::SetSpeedMultiplier { player_id, .. } => Some(*player_id),
            InputCommand::Join { .. } | InputCommand::CreateAgent { .. } => None,
        }
    }
}

/// One immutable entry of an engine's input log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRecord {
    pub id: InputId,
    pub command: InputCommand,
    /// Epoch ms at submission
    pub submitted_at: u64,
}

/// Appends `command` to the engine's log and returns its handle.
///
/// The engine record's `next_input_number` is read and bumped inside the
/// same transaction, so concurrent submissions to one engine serialize into
/// a single total order.
pub fn submit(tx: &StoreTx<'_>, engine_id: EngineId, command: InputCommand) -> WorldResult<InputId> {
    let mut engine = tx.require_engine(engine_id)?;
    let id = InputId {
        engine_id,
        number: engine.next_input_number,
    };
    engine.next_input_number += 1;
    tx.put_engine(&engine)?;

    debug!("Input {} {}", id, command.name());
    let record = InputRecord {
        id,
        command,
        submitted_at: tx.now(),
    };
    tx.put(&keys::input(id), &record)?;
    tx.signal(EngineSignal::InputPending { input: id });
    Ok(id)
}

/// Whether the core has consumed an input yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    Pending,
    Processed,
}

/// Reports whether the core has consumed `id`.
pub fn input_status(tx: &StoreTx<'_>, id: InputId) -> WorldResult<InputStatus> {
    if tx.get::<InputRecord>(&keys::input(id))?.is_none() {
        return Err(WorldError::not_found("input", id));
    }
    let engine = tx.require_engine(id.engine_id)?;
    Ok(match engine.processed_input_number {
        Some(done) if id.number <= done => InputStatus::Processed,
        _ => InputStatus::Pending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Engine;
    use crate::store::Store;
    use serde_json::json;

    fn store_with_engine() -> (Store, EngineId) {
        let store = Store::temporary().unwrap();
        let engine_id = EngineId::from_seed(1);
        store
            .transact(0, |tx| tx.put_engine(&Engine::new(engine_id)))
            .unwrap();
        (store, engine_id)
    }

    #[test]
    fn test_parse_known_command() {
        let cmd = InputCommand::parse(
            "setSpeedMultiplier",
            json!({ "playerId": 3, "multiplier": 1.8 }),
        )
        .unwrap();
        assert_eq!(
            cmd,
            InputCommand::SetSpeedMultiplier {
                player_id: PlayerId(3),
                multiplier: Some(1.8)
            }
        );
    }

    #[test]
    fn test_parse_null_destination_cancels() {
        let cmd = InputCommand::parse("forceMoveTo", json!({ "playerId": 1, "destination": null })).unwrap();
        assert_eq!(
            cmd,
            InputCommand::ForceMoveTo {
                player_id: PlayerId(1),
                destination: None
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_name() {
        let err = InputCommand::parse("teleport", json!({ "playerId": 1 })).unwrap_err();
        assert!(matches!(err, WorldError::InvalidInput(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = InputCommand::parse("createAgent", json!({ "descriptionIndex": "two" })).unwrap_err();
        assert!(matches!(err, WorldError::InvalidInput(_)));
    }

    #[test]
    fn test_submit_preserves_order() {
        let (store, engine_id) = store_with_engine();

        for i in 0..5 {
            store
                .transact(100 + i, |tx| {
                    submit(tx, engine_id, InputCommand::CreateAgent { description_index: i as usize })
                })
                .unwrap();
        }

        let log = store.inputs_after(engine_id, None, 100).unwrap();
        let numbers: Vec<u64> = log.iter().map(|r| r.id.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(log[2].submitted_at, 102);
        assert_eq!(log[2].command, InputCommand::CreateAgent { description_index: 2 });

        let tail = store.inputs_after(engine_id, Some(3), 100).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].id.number, 4);
    }

    #[test]
    fn test_submit_to_missing_engine_fails() {
        let store = Store::temporary().unwrap();
        let err = store
            .transact(0, |tx| submit(tx, EngineId::from_seed(42), InputCommand::CreateAgent { description_index: 0 }))
            .unwrap_err();
        assert!(matches!(err, WorldError::NotFound { kind: "engine", .. }));
        assert!(store.inputs_after(EngineId::from_seed(42), None, 10).unwrap().is_empty());
    }

    #[test]
    fn test_submit_signals_input_pending() {
        let (store, engine_id) = store_with_engine();
        let (id, signals) = store
            .transact(0, |tx| submit(tx, engine_id, InputCommand::Leave { player_id: PlayerId(1) }))
            .unwrap();
        assert_eq!(signals, vec![EngineSignal::InputPending { input: id }]);
    }

    #[test]
    fn test_input_status_follows_cursor() {
        let (store, engine_id) = store_with_engine();
        let (id, _) = store
            .transact(0, |tx| submit(tx, engine_id, InputCommand::Leave { player_id: PlayerId(1) }))
            .unwrap();

        let (status, _) = store.transact(0, |tx| input_status(tx, id)).unwrap();
        assert_eq!(status, InputStatus::Pending);

        store
            .transact(0, |tx| {
                let mut engine = tx.require_engine(engine_id)?;
                engine.processed_input_number = Some(id.number);
                tx.put_engine(&engine)
            })
            .unwrap();

        let (status, _) = store.transact(0, |tx| input_status(tx, id)).unwrap();
        assert_eq!(status, InputStatus::Processed);
    }
}
