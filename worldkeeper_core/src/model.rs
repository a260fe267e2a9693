//! Persisted world records.
//!
//! Everything here is owned by the store and only ever changed inside a
//! store transaction. Players are written exclusively by the simulation
//! core in response to inputs; the supervisor and the choreographer only
//! read them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use worldkeeper_env::{EngineId, WorldId};

/// Player identifier, unique within one world (`p:<n>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p:{}", self.0)
    }
}

/// Integer map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position at the tile's origin corner.
    pub fn position(&self) -> Position {
        Position::new(self.x as f64, self.y as f64)
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Continuous map position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Tile containing this position (floor on both axes).
    pub fn tile(&self) -> Tile {
        Tile::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

/// Banner shown over a player while an activity lasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub description: String,
    pub emoji: Option<String>,
    /// Epoch ms at which the activity ends
    pub until: u64,
}

/// A participant in a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,

    /// Identity token of the controlling human, `None` for agents
    pub human: Option<String>,

    pub position: Position,

    /// Autonomous movement target (`moveTo`)
    pub destination: Option<Tile>,

    /// Scripted movement target (`forceMoveTo`), overrides `destination`
    pub forced_destination: Option<Tile>,

    pub speed_multiplier: Option<f64>,

    pub activity: Option<Activity>,

    /// Epoch ms of the last input that touched this player
    pub last_input: u64,
}

impl Player {
    pub fn new(id: PlayerId, position: Position, human: Option<String>, now: u64) -> Self {
        Self {
            id,
            human,
            position,
            destination: None,
            forced_destination: None,
            speed_multiplier: None,
            activity: None,
            last_input: now,
        }
    }

    pub fn is_human(&self) -> bool {
        self.human.is_some()
    }

    /// Whether the player stands on the given tile.
    pub fn is_on(&self, tile: Tile) -> bool {
        self.position.tile() == tile
    }
}

/// The set of players currently present in one world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    pub id: WorldId,
    pub players: Vec<Player>,
    pub next_player_number: u64,
}

impl World {
    pub fn new(id: WorldId) -> Self {
        Self {
            id,
            players: Vec::new(),
            next_player_number: 1,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Player controlled by the given human identity.
    pub fn human_player(&self, token_identifier: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.human.as_deref() == Some(token_identifier))
    }

    /// Allocates the next player id.
    pub fn allocate_player_id(&mut self) -> PlayerId {
        let id = PlayerId(self.next_player_number);
        self.next_player_number += 1;
        id
    }
}

/// Lifecycle state of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Running,
    Inactive,
    StoppedByDeveloper,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Running => "running",
            Status::Inactive => "inactive",
            Status::StoppedByDeveloper => "stoppedByDeveloper",
        };
        f.write_str(s)
    }
}

/// One per world: engine binding, lifecycle status and last observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldStatus {
    pub world_id: WorldId,
    pub engine_id: EngineId,
    pub is_default: bool,
    pub status: Status,
    /// Epoch ms of the last recorded observation
    pub last_viewed: u64,
}

/// The simulation instance bound to a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engine {
    pub id: EngineId,

    /// Logical clock advanced by the simulation core (epoch ms)
    pub current_time: Option<u64>,

    pub running: bool,

    /// Bumped on every start/stop/kick so a superseded core loop can exit
    pub generation_number: u64,

    /// Number the next submitted input receives
    pub next_input_number: u64,

    /// Highest input number the core has consumed
    pub processed_input_number: Option<u64>,
}

impl Engine {
    pub fn new(id: EngineId) -> Self {
        Self {
            id,
            current_time: None,
            running: false,
            generation_number: 0,
            next_input_number: 1,
            processed_input_number: None,
        }
    }
}

/// Static identity metadata of a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDescription {
    pub player_id: PlayerId,
    pub name: String,
    pub character: String,
    pub description: String,
}

/// Links an agent-controlled player to its roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescription {
    pub player_id: PlayerId,
    pub description_index: usize,
}

/// All descriptions of one world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDescriptions {
    pub players: Vec<PlayerDescription>,
    pub agents: Vec<AgentDescription>,

    /// Roster index -> epoch ms of a queued `createAgent` the core has not
    /// consumed yet
    pub pending_agents: BTreeMap<usize, u64>,
}

impl WorldDescriptions {
    pub fn by_name(&self, name: &str) -> Option<&PlayerDescription> {
        self.players.iter().find(|d| d.name == name)
    }

    pub fn by_player(&self, player_id: PlayerId) -> Option<&PlayerDescription> {
        self.players.iter().find(|d| d.player_id == player_id)
    }

    /// Whether an agent request for this roster entry is still in flight.
    pub fn agent_pending(&self, index: usize, now: u64, ttl_ms: u64) -> bool {
        self.pending_agents
            .get(&index)
            .is_some_and(|requested| now.saturating_sub(*requested) < ttl_ms)
    }
}
