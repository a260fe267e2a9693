//! Human players joining and leaving a world.
//!
//! Joining is two-phase: the request only queues a `join` input, and a
//! follow-up [`Task::CompleteJoin`] waits for the simulation core to
//! materialize the player, then opens their ledger account and charges the
//! join fee.

use crate::config::WorldConfig;
use crate::error::{WorldError, WorldResult};
use crate::input::{submit, InputCommand, InputId};
use crate::ledger::settle_join;
use crate::model::PlayerId;
use crate::scheduler::{run_after, Task};
use crate::store::StoreTx;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use worldkeeper_env::WorldId;

/// Name used when the identity carries none.
pub const DEFAULT_NAME: &str = "Me";

/// Authenticated caller, resolved upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub token_identifier: String,
    pub name: Option<String>,
}

impl Identity {
    pub fn new(token_identifier: impl Into<String>) -> Self {
        Self {
            token_identifier: token_identifier.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// `join` input queued
    Joining(InputId),
    /// Already in the world; only the completion step was re-run
    AlreadyPresent(PlayerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed(PlayerId),
    /// Player not there yet, another attempt queued
    Retrying,
    /// Retry budget exhausted
    GaveUp,
    /// World is gone
    Abandoned,
}

/// Queues a `join` for `identity` with a character picked by `entropy`.
pub fn join(
    tx: &StoreTx<'_>,
    config: &WorldConfig,
    world_id: WorldId,
    identity: &Identity,
    entropy: u64,
) -> WorldResult<JoinOutcome> {
    let world = tx.require_world(world_id)?;
    let completion = Task::CompleteJoin {
        world_id,
        token_identifier: identity.token_identifier.clone(),
        attempt: 0,
    };

    if let Some(existing) = world.human_player(&identity.token_identifier) {
        debug!("{} already in world {}", existing.id, world_id);
        run_after(tx, 0, completion)?;
        return Ok(JoinOutcome::AlreadyPresent(existing.id));
    }

    if config.characters.is_empty() {
        return Err(WorldError::precondition("no characters configured"));
    }
    let character = &config.characters[(entropy % config.characters.len() as u64) as usize];
    let status = tx.require_status(world_id)?;
    let name = identity.display_name();
    let input = submit(
        tx,
        status.engine_id,
        InputCommand::Join {
            name: name.to_string(),
            character: character.clone(),
            description: format!("{} is a human player", name),
            token_identifier: identity.token_identifier.clone(),
        },
    )?;
    run_after(tx, 0, completion)?;
    info!("{} joining world {} as {}", name, world_id, character);
    Ok(JoinOutcome::Joining(input))
}

/// Queues a `leave` for the identity's player. Absent players are a no-op.
pub fn leave(tx: &StoreTx<'_>, world_id: WorldId, identity: &Identity) -> WorldResult<Option<InputId>> {
    let world = tx.require_world(world_id)?;
    let Some(player) = world.human_player(&identity.token_identifier) else {
        return Ok(None);
    };
    let status = tx.require_status(world_id)?;
    let input = submit(tx, status.engine_id, InputCommand::Leave { player_id: player.id })?;
    Ok(Some(input))
}

/// Finishes a join once the player exists, retrying on a fixed delay until
/// `config.join_retry_limit` attempts have been made.
///
/// Completion grants `config.starting_balance` and pays `config.join_fee`
/// into the treasury. Completing the same player again charges nothing.
pub fn complete_join(
    tx: &StoreTx<'_>,
    config: &WorldConfig,
    world_id: WorldId,
    token_identifier: &str,
    attempt: u32,
) -> WorldResult<CompletionOutcome> {
    let Some(world) = tx.world(world_id)? else {
        return Ok(CompletionOutcome::Abandoned);
    };
    let Some(player) = world.human_player(token_identifier) else {
        if attempt + 1 >= config.join_retry_limit {
            warn!(
                "Player for {} never appeared in world {} after {} attempts",
                token_identifier,
                world_id,
                attempt + 1
            );
            return Ok(CompletionOutcome::GaveUp);
        }
        run_after(
            tx,
            config.join_retry_delay_ms,
            Task::CompleteJoin {
                world_id,
                token_identifier: token_identifier.to_string(),
                attempt: attempt + 1,
            },
        )?;
        return Ok(CompletionOutcome::Retrying);
    };
    if settle_join(tx, world_id, player.id, config.starting_balance, config.join_fee)?.is_none() {
        debug!("Join of {} in world {} was already completed", player.id, world_id);
    }
    Ok(CompletionOutcome::Completed(player.id))
}
