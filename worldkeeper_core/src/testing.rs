//! Shared fixtures for unit tests.

use crate::config::WorldConfig;
use crate::engine::{EngineSignal, SimulationCore};
use crate::ledger::balance;
use crate::model::{AgentDescription, Player, PlayerDescription, PlayerId, Position, Tile};
use crate::store::Store;
use crate::supervisor::create_world;
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use worldkeeper_env::{EngineId, WorldContext, WorldId};

/// 2023-11-14T22:13:20Z
pub(crate) const T0: u64 = 1_700_000_000_000;

/// A store holding one running world.
pub(crate) struct Fixture {
    pub store: Store,
    pub config: WorldConfig,
    pub world_id: WorldId,
    pub engine_id: EngineId,
}

impl Fixture {
    /// World with the named roster agents standing around (20, 20).
    pub fn with_agents(names: &[&str]) -> Self {
        let store = Store::temporary().unwrap();
        let world_id = WorldId::from_seed(1);
        let engine_id = EngineId::from_seed(1);
        store
            .transact(T0, |tx| create_world(tx, world_id, engine_id, true))
            .unwrap();
        let fx = Self {
            store,
            config: WorldConfig::default(),
            world_id,
            engine_id,
        };
        for (i, name) in names.iter().enumerate() {
            fx.add_agent(name, Position::new(20.0 + i as f64, 20.0));
        }
        fx
    }

    pub fn add_agent(&self, name: &str, position: Position) -> PlayerId {
        let index = self.config.roster_index(name).unwrap();
        let (id, _) = self
            .store
            .transact(T0, |tx| {
                let mut world = tx.require_world(self.world_id)?;
                let mut desc = tx.descriptions(self.world_id)?;
                let id = world.allocate_player_id();
                world.players.push(Player::new(id, position, None, T0));
                desc.players.push(PlayerDescription {
                    player_id: id,
                    name: name.to_string(),
                    character: self.config.roster[index].character.clone(),
                    description: self.config.roster[index].identity.clone(),
                });
                desc.agents.push(AgentDescription {
                    player_id: id,
                    description_index: index,
                });
                tx.put_world(&world)?;
                tx.put_descriptions(self.world_id, &desc)?;
                Ok(id)
            })
            .unwrap();
        id
    }

    pub fn add_human(&self, token: &str) -> PlayerId {
        let (id, _) = self
            .store
            .transact(T0, |tx| {
                let mut world = tx.require_world(self.world_id)?;
                let id = world.allocate_player_id();
                world
                    .players
                    .push(Player::new(id, Position::new(1.0, 1.0), Some(token.to_string()), T0));
                tx.put_world(&world)?;
                Ok(id)
            })
            .unwrap();
        id
    }

    pub fn find_player(&self, name: &str) -> Option<PlayerId> {
        self.store
            .descriptions(self.world_id)
            .unwrap()
            .and_then(|d| d.by_name(name).map(|p| p.player_id))
    }

    pub fn player(&self, name: &str) -> PlayerId {
        self.find_player(name).unwrap()
    }

    /// Puts a player on a tile, bypassing the simulation core.
    pub fn teleport(&self, name: &str, tile: Tile) {
        let id = self.player(name);
        self.store
            .transact(T0, |tx| {
                let mut world = tx.require_world(self.world_id)?;
                if let Some(p) = world.player_mut(id) {
                    p.position = Position::new(tile.x as f64 + 0.5, tile.y as f64 + 0.5);
                }
                tx.put_world(&world)
            })
            .unwrap();
    }

    pub fn balance(&self, name: &str) -> f64 {
        self.balance_of(self.player(name))
    }

    pub fn balance_of(&self, id: PlayerId) -> f64 {
        self.store
            .transact(T0, |tx| balance(tx, self.world_id, id))
            .unwrap()
            .0
    }

    /// Drops a player from the world, as a processed `leave` would.
    pub fn remove_player(&self, id: PlayerId) {
        self.store
            .transact(T0, |tx| {
                let mut world = tx.require_world(self.world_id)?;
                world.players.retain(|p| p.id != id);
                tx.put_world(&world)
            })
            .unwrap();
    }
}

/// Hand-cranked clock with counting entropy.
pub(crate) struct ManualContext {
    now_ms: AtomicU64,
    entropy: AtomicU64,
    sleeps: Mutex<Vec<u64>>,
}

impl ManualContext {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
            entropy: AtomicU64::new(0),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Every duration passed to `sleep`, in ms.
    pub fn sleeps(&self) -> Vec<u64> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorldContext for ManualContext {
    fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms.load(Ordering::SeqCst))
    }

    fn system_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.now_ms.load(Ordering::SeqCst))
    }

    async fn sleep(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.sleeps.lock().unwrap().push(ms);
        self.advance(ms);
        tokio::task::yield_now().await;
    }

    fn spawn<F>(&self, _name: &str, _future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
    }

    fn random_u64(&self) -> u64 {
        self.entropy.fetch_add(1, Ordering::SeqCst)
    }

    fn seed(&self) -> u64 {
        0
    }
}

/// Core that records every signal it receives.
#[derive(Default)]
pub(crate) struct RecordingCore {
    pub signals: Mutex<Vec<EngineSignal>>,
}

impl SimulationCore for RecordingCore {
    fn notify(&self, signal: &EngineSignal) {
        self.signals.lock().unwrap().push(*signal);
    }
}
