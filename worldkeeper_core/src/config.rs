//! Service configuration.

use crate::error::{WorldError, WorldResult};
use crate::model::Tile;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A non-player character the simulation core can create from its roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    /// Display name; also how the supervisor looks the agent up
    pub name: String,

    /// Character sheet / sprite key
    pub character: String,

    /// Short identity blurb
    pub identity: String,
}

impl AgentProfile {
    fn new(name: &str, character: &str, identity: &str) -> Self {
        Self {
            name: name.to_string(),
            character: character.to_string(),
            identity: identity.to_string(),
        }
    }
}

/// Defaults for the pursuit encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncounterConfig {
    /// Name of the pursuing participant
    pub pursuer: String,

    /// Name of the pursued participant (whose balance is forfeited)
    pub quarry: String,

    /// Optional third participant sent to an unrelated location
    pub bystander: Option<String>,

    /// Shared destination tile for pursuer and quarry
    pub destination: Tile,

    /// Where the bystander is dispatched
    pub bystander_destination: Tile,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            pursuer: "Sheriff".to_string(),
            quarry: "Outlaw".to_string(),
            bystander: Some("Mayor".to_string()),
            destination: Tile::new(5, 45),
            bystander_destination: Tile::new(44, 13),
        }
    }
}

/// Configuration for the Worldkeeper service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldConfig {
    /// Clients heartbeat a world at this cadence (ms). `lastViewed` writes
    /// are throttled to half of it.
    pub heartbeat_interval_ms: u64,

    /// A running world unobserved for longer than this is stopped (ms)
    pub idle_timeout_ms: u64,

    /// Expected period of one simulation core step (ms). An engine whose
    /// clock lags by twice this is considered dead.
    pub engine_action_duration_ms: u64,

    /// Delay between attempts to finish a join (ms)
    pub join_retry_delay_ms: u64,

    /// Maximum number of join completion attempts
    pub join_retry_limit: u32,

    /// Base backoff for a failed scheduled task (ms); doubled per failure
    pub task_retry_base_ms: u64,

    /// Failures after which a scheduled task is dead-lettered
    pub max_task_failures: u32,

    /// Upper bound on how long the scheduler loop sleeps (ms)
    pub scheduler_poll_interval_ms: u64,

    /// How long a queued `createAgent` request suppresses duplicates (ms)
    pub agent_request_ttl_ms: u64,

    /// Opening balance granted to a human once their join completes
    pub starting_balance: f64,

    /// Paid by a joining human into the world treasury, once per join
    pub join_fee: f64,

    /// Characters a joining human may be assigned
    pub characters: Vec<String>,

    /// Content roster indexed by `createAgent { descriptionIndex }`
    pub roster: Vec<AgentProfile>,

    /// Roster names that must always exist in every world
    pub required_agents: Vec<String>,

    /// Encounter defaults
    pub encounter: EncounterConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 60_000,
            idle_timeout_ms: 5 * 60_000,
            engine_action_duration_ms: 30_000,
            join_retry_delay_ms: 1_000,
            join_retry_limit: 30,
            task_retry_base_ms: 1_000,
            max_task_failures: 5,
            scheduler_poll_interval_ms: 250,
            agent_request_ttl_ms: 60_000,
            starting_balance: 10.0,
            join_fee: 1.0,
            characters: ["f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            roster: vec![
                AgentProfile::new("Sheriff", "f1", "Keeps the peace and never lets a suspect out of sight."),
                AgentProfile::new("Outlaw", "f4", "Always one step ahead of the law, carrying stolen coin."),
                AgentProfile::new("Mayor", "f6", "Runs the town and rushes to every emergency."),
                AgentProfile::new("Merchant", "f7", "Trades anything with anyone."),
            ],
            required_agents: vec![
                "Mayor".to_string(),
                "Sheriff".to_string(),
                "Outlaw".to_string(),
            ],
            encounter: EncounterConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Loads a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> WorldResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            WorldError::Storage(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Position of a roster entry by name.
    pub fn roster_index(&self, name: &str) -> Option<usize> {
        self.roster.iter().position(|p| p.name == name)
    }

    /// An engine is dead once its clock lags behind `now` by this much.
    pub fn dead_engine_threshold_ms(&self) -> u64 {
        self.engine_action_duration_ms * 2
    }
}
