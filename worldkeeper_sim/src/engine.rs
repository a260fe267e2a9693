//! Reference simulation core.
//!
//! `SimEngine` is the minimal consumer of the input pipeline the harness
//! needs: it follows engine lifecycle signals, drains each running engine's
//! input log in number order, walks players toward their destinations and
//! stamps `currentTime` once per step. It is not a pathfinder; players move
//! in a straight line.

use nalgebra::Vector2;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use worldkeeper_core::model::{Activity, AgentDescription, PlayerDescription};
use worldkeeper_core::{
    AgentProfile, EngineSignal, InputCommand, Player, PlayerId, Position, SimulationCore, Store, Tile,
    World, WorldDescriptions, WorldResult,
};
use worldkeeper_env::{EngineId, WorldId};

/// Walking speed before multipliers (tiles per second)
pub const BASE_SPEED: f64 = 0.75;

/// Inputs drained per engine per step
pub const INPUT_BATCH: usize = 256;

/// Corner of the spawn block new players are placed in
pub const SPAWN_ORIGIN: Tile = Tile { x: 24, y: 24 };

/// Width of the spawn block
const SPAWN_COLUMNS: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    generation: u64,
    stalled: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process simulation core driven by the harness clock.
pub struct SimEngine {
    roster: Vec<AgentProfile>,

    /// Engines this core believes it is running, by generation
    runs: Mutex<HashMap<EngineId, Run>>,

    /// Input numbers applied per engine, in application order
    applied: Mutex<HashMap<EngineId, Vec<u64>>>,

    /// `InputPending` signals received
    input_signals: AtomicU64,
}

impl SimEngine {
    pub fn new(roster: Vec<AgentProfile>) -> Self {
        Self {
            roster,
            runs: Mutex::new(HashMap::new()),
            applied: Mutex::new(HashMap::new()),
            input_signals: AtomicU64::new(0),
        }
    }

    /// True while a run loop for `engine_id` is live (stalled or not).
    pub fn is_running(&self, engine_id: EngineId) -> bool {
        lock(&self.runs).contains_key(&engine_id)
    }

    /// Freezes the run loop of `engine_id` until it is kicked or restarted.
    /// Returns false when no run loop exists.
    pub fn stall(&self, engine_id: EngineId) -> bool {
        match lock(&self.runs).get_mut(&engine_id) {
            Some(run) => {
                warn!("⏸  Stalling engine {}", engine_id);
                run.stalled = true;
                true
            }
            None => false,
        }
    }

    pub fn is_stalled(&self, engine_id: EngineId) -> bool {
        lock(&self.runs).get(&engine_id).is_some_and(|r| r.stalled)
    }

    /// Input numbers applied so far for `engine_id`.
    pub fn applied_inputs(&self, engine_id: EngineId) -> Vec<u64> {
        lock(&self.applied).get(&engine_id).cloned().unwrap_or_default()
    }

    pub fn input_signals(&self) -> u64 {
        self.input_signals.load(Ordering::Relaxed)
    }

    /// Advances every live, unstalled engine to `now`, `dt_ms` after the
    /// previous step. Returns the number of inputs applied.
    pub fn step(&self, store: &Store, now: u64, dt_ms: u64) -> WorldResult<usize> {
        let mut applied = 0;
        for status in store.statuses()? {
            let run = lock(&self.runs).get(&status.engine_id).copied();
            match run {
                Some(run) if !run.stalled => {
                    applied += self.step_engine(store, status.world_id, status.engine_id, run.generation, now, dt_ms)?;
                }
                _ => {}
            }
        }
        Ok(applied)
    }

    fn step_engine(
        &self,
        store: &Store,
        world_id: WorldId,
        engine_id: EngineId,
        generation: u64,
        now: u64,
        dt_ms: u64,
    ) -> WorldResult<usize> {
        let Some(engine) = store.engine(engine_id)? else {
            return Ok(0);
        };
        let inputs = store.inputs_after(engine_id, engine.processed_input_number, INPUT_BATCH)?;

        let (numbers, _) = store.transact(now, |tx| {
            let mut engine = tx.require_engine(engine_id)?;
            if !engine.running || engine.generation_number != generation {
                return Ok(None);
            }
            let mut world = tx.require_world(world_id)?;
            let mut desc = tx.descriptions(world_id)?;

            let mut numbers = Vec::new();
            for record in &inputs {
                if Some(record.id.number) <= engine.processed_input_number {
                    continue;
                }
                self.apply(&mut world, &mut desc, &record.command, now);
                engine.processed_input_number = Some(record.id.number);
                numbers.push(record.id.number);
            }
            advance(&mut world, now, dt_ms);
            engine.current_time = Some(now);

            tx.put_world(&world)?;
            tx.put_descriptions(world_id, &desc)?;
            tx.put_engine(&engine)?;
            Ok(Some(numbers))
        })?;

        let Some(numbers) = numbers else {
            debug!("Engine {} generation {} superseded, exiting run loop", engine_id, generation);
            let mut runs = lock(&self.runs);
            if runs.get(&engine_id).is_some_and(|r| r.generation == generation) {
                runs.remove(&engine_id);
            }
            return Ok(0);
        };
        let count = numbers.len();
        if count > 0 {
            lock(&self.applied).entry(engine_id).or_default().extend(numbers);
        }
        Ok(count)
    }

    fn apply(&self, world: &mut World, desc: &mut WorldDescriptions, command: &InputCommand, now: u64) {
        match command {
            InputCommand::Join {
                name,
                character,
                description,
                token_identifier,
            } => {
                if world.human_player(token_identifier).is_some() {
                    debug!("{} already joined", token_identifier);
                    return;
                }
                let id = spawn(world, Some(token_identifier.clone()), now);
                desc.players.push(PlayerDescription {
                    player_id: id,
                    name: name.clone(),
                    character: character.clone(),
                    description: description.clone(),
                });
                info!("👋 {} joined as {}", name, id);
            }
            InputCommand::Leave { player_id } => {
                world.players.retain(|p| p.id != *player_id);
            }
            InputCommand::CreateAgent { description_index } => {
                desc.pending_agents.remove(description_index);
                let Some(profile) = self.roster.get(*description_index) else {
                    warn!("No roster entry {}", description_index);
                    return;
                };
                if desc.by_name(&profile.name).is_some() {
                    debug!("{} already exists", profile.name);
                    return;
                }
                let id = spawn(world, None, now);
                desc.players.push(PlayerDescription {
                    player_id: id,
                    name: profile.name.clone(),
                    character: profile.character.clone(),
                    description: profile.identity.clone(),
                });
                desc.agents.push(AgentDescription {
                    player_id: id,
                    description_index: *description_index,
                });
                info!("🤖 Created {} as {}", profile.name, id);
            }
            other => {
                let Some(player_id) = other.player_id() else {
                    return;
                };
                let Some(player) = world.player_mut(player_id) else {
                    debug!("{} for missing player {}", other.name(), player_id);
                    return;
                };
                player.last_input = now;
                match other {
                    InputCommand::MoveTo { destination, .. } => player.destination = *destination,
                    InputCommand::ForceMoveTo { destination, .. } => player.forced_destination = *destination,
                    InputCommand::SetSpeedMultiplier { multiplier, .. } => player.speed_multiplier = *multiplier,
                    InputCommand::SetActivity {
                        description,
                        emoji,
                        duration_ms,
                        ..
                    } => {
                        player.activity = (!description.is_empty()).then(|| Activity {
                            description: description.clone(),
                            emoji: emoji.clone(),
                            until: now + duration_ms,
                        });
                    }
                    _ => {}
                }
            }
        }
    }
}

impl SimulationCore for SimEngine {
    fn notify(&self, signal: &EngineSignal) {
        match *signal {
            EngineSignal::Started { engine_id, generation } | EngineSignal::Kicked { engine_id, generation } => {
                debug!("Run loop for {} at generation {}", engine_id, generation);
                lock(&self.runs).insert(
                    engine_id,
                    Run {
                        generation,
                        stalled: false,
                    },
                );
            }
            EngineSignal::Stopped { engine_id, .. } => {
                lock(&self.runs).remove(&engine_id);
            }
            EngineSignal::InputPending { .. } => {
                self.input_signals.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Places a new player in the spawn block.
fn spawn(world: &mut World, human: Option<String>, now: u64) -> PlayerId {
    let id = world.allocate_player_id();
    let slot = id.0 % (SPAWN_COLUMNS * SPAWN_COLUMNS);
    let position = Position::new(
        (SPAWN_ORIGIN.x as u64 + slot % SPAWN_COLUMNS) as f64 + 0.5,
        (SPAWN_ORIGIN.y as u64 + slot / SPAWN_COLUMNS) as f64 + 0.5,
    );
    world.players.push(Player::new(id, position, human, now));
    id
}

/// Moves every player `dt_ms` worth toward its target tile's center.
fn advance(world: &mut World, now: u64, dt_ms: u64) {
    for player in &mut world.players {
        if player.activity.as_ref().is_some_and(|a| a.until <= now) {
            player.activity = None;
        }
        let Some(target) = player.forced_destination.or(player.destination) else {
            continue;
        };
        let goal = Vector2::new(target.x as f64 + 0.5, target.y as f64 + 0.5);
        let here = Vector2::new(player.position.x, player.position.y);
        let delta = goal - here;
        let distance = delta.norm();
        let reach = BASE_SPEED * player.speed_multiplier.unwrap_or(1.0) * dt_ms as f64 / 1000.0;

        if distance <= reach {
            // A forced arrival also drops whatever walk it interrupted
            player.position = Position::new(goal.x, goal.y);
            player.forced_destination = None;
            player.destination = None;
        } else {
            let next = here + delta * (reach / distance);
            player.position = Position::new(next.x, next.y);
        }
    }
}
