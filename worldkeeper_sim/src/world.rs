//! SimWorld - The simulation harness container.

use crate::context::SimContext;
use crate::engine::SimEngine;
use crate::oracle::Oracle;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use worldkeeper_core::{PlayerId, Store, WorldConfig, WorldKeeper, WorldResult};
use worldkeeper_env::{WorldContext, WorldId};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Virtual time per tick (ms)
    pub tick_ms: u64,

    /// Maximum simulation duration in seconds
    pub max_duration_secs: f64,

    /// Whether a client heartbeats the default world
    pub observed: bool,

    /// How often an observing client heartbeats (ms)
    pub heartbeat_period_ms: u64,

    /// Period of the idle and dead-engine sweeps (ms)
    pub sweep_interval_ms: u64,

    /// Service configuration under test
    pub world: WorldConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_ms: 250,
            max_duration_secs: 120.0,
            observed: true,
            heartbeat_period_ms: 5_000,
            sweep_interval_ms: 60_000,
            world: WorldConfig::default(),
        }
    }
}

/// The SimWorld - one store, one keeper, one simulation core, one clock.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    /// Service under test
    pub keeper: WorldKeeper<SimContext>,

    /// Reference simulation core
    pub engine: Arc<SimEngine>,

    /// Invariant checker
    pub oracle: Oracle,

    /// The default world
    pub world_id: WorldId,

    /// Current tick count
    tick_count: u64,

    last_heartbeat: Option<u64>,
    next_sweep: u64,
    tasks_run: u64,
}

impl SimWorld {
    /// Creates a SimWorld on a temporary store with its default world.
    pub fn new(config: SimConfig) -> WorldResult<Self> {
        let context = SimContext::shared(config.seed);
        let engine = Arc::new(SimEngine::new(config.world.roster.clone()));
        let keeper = WorldKeeper::new(
            context.clone(),
            Store::temporary()?,
            config.world.clone(),
            engine.clone(),
        );
        let world_id = keeper.create_world(true)?.world_id;
        let next_sweep = context.now_ms() + config.sweep_interval_ms;

        Ok(Self {
            config,
            context,
            keeper,
            engine,
            oracle: Oracle::new(),
            world_id,
            tick_count: 0,
            last_heartbeat: None,
            next_sweep,
            tasks_run: 0,
        })
    }

    pub fn store(&self) -> &Store {
        self.keeper.store()
    }

    pub fn now_ms(&self) -> u64 {
        self.context.now_ms()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tasks_run(&self) -> u64 {
        self.tasks_run
    }

    /// Simulated seconds since the run began.
    pub fn elapsed_secs(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    /// Starts or stops the simulated client heartbeat.
    pub fn set_observed(&mut self, observed: bool) {
        self.config.observed = observed;
        if !observed {
            self.last_heartbeat = None;
        }
    }

    /// Advances the simulation by one tick:
    /// 1. move the clock
    /// 2. heartbeat the default world if observed
    /// 3. step the simulation core
    /// 4. drain due scheduled tasks
    /// 5. run the sweeps when their period elapses
    /// 6. check invariants
    pub fn tick(&mut self) -> WorldResult<()> {
        let dt = self.config.tick_ms;
        self.context.advance_time(Duration::from_millis(dt));
        self.tick_count += 1;
        let now = self.now_ms();

        if self.config.observed
            && self
                .last_heartbeat
                .map_or(true, |t| now - t >= self.config.heartbeat_period_ms)
        {
            self.keeper.heartbeat_world(self.world_id)?;
            self.last_heartbeat = Some(now);
        }

        self.engine.step(self.store(), now, dt)?;
        self.drain_tasks()?;

        if now >= self.next_sweep {
            self.next_sweep = now + self.config.sweep_interval_ms;
            let stopped = self.keeper.stop_inactive_worlds()?;
            let kicked = match self.keeper.restart_dead_worlds() {
                Ok(n) => n,
                Err(e) => {
                    error!("Dead-engine sweep failed: {}", e);
                    0
                }
            };
            debug!("Sweep at tick {}: stopped={} kicked={}", self.tick_count, stopped, kicked);
        }

        self.oracle.check(self.keeper.store(), self.tick_count)?;
        Ok(())
    }

    /// Runs ticks until `done` holds or `max_secs` of virtual time pass.
    /// Returns whether `done` was reached.
    pub fn run_until<F>(&mut self, max_secs: f64, mut done: F) -> WorldResult<bool>
    where
        F: FnMut(&SimWorld) -> WorldResult<bool>,
    {
        let deadline = self.elapsed_secs() + max_secs;
        while self.elapsed_secs() < deadline {
            self.tick()?;
            if done(self)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs ticks for `secs` of virtual time.
    pub fn run_for(&mut self, secs: f64) -> WorldResult<()> {
        self.run_until(secs, |_| Ok(false)).map(|_| ())
    }

    /// Runs every due task, including ones that become due as a result.
    fn drain_tasks(&mut self) -> WorldResult<()> {
        loop {
            let ran = self.keeper.run_due_tasks()?;
            self.tasks_run += ran as u64;
            if ran == 0 {
                return Ok(());
            }
        }
    }

    /// Looks a player up by display name in the default world.
    pub fn player(&self, name: &str) -> WorldResult<Option<PlayerId>> {
        Ok(self
            .keeper
            .game_descriptions(self.world_id)?
            .by_name(name)
            .map(|d| d.player_id))
    }

    /// Credits a player and tells the oracle about the minted money.
    pub fn credit(&mut self, player_id: PlayerId, amount: f64) -> WorldResult<f64> {
        let balance = self.keeper.credit(self.world_id, player_id, amount)?;
        self.oracle.record_credit(amount);
        Ok(balance)
    }

    pub fn balance(&self, player_id: PlayerId) -> WorldResult<f64> {
        self.keeper.balance(self.world_id, player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldkeeper_core::Status;

    #[test]
    fn test_new_world_is_running() {
        let world = SimWorld::new(SimConfig::default()).unwrap();
        let state = world.keeper.world_state(world.world_id).unwrap();
        assert_eq!(state.status.status, Status::Running);
        assert!(world.engine.is_running(state.status.engine_id));
    }

    #[test]
    fn test_observed_world_gets_required_agents() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        let found = world
            .run_until(5.0, |w| Ok(w.player("Outlaw")?.is_some()))
            .unwrap();
        assert!(found);

        // Accounts follow on the next heartbeat's backfill
        world.run_for(6.0).unwrap();
        for name in ["Mayor", "Sheriff", "Outlaw"] {
            let id = world.player(name).unwrap().unwrap();
            assert!(world.store().account(world.world_id, id).unwrap().is_some());
        }
        assert!(world.oracle.is_clean());
    }

    #[test]
    fn test_same_seed_same_world() {
        let run = |seed| {
            let mut world = SimWorld::new(SimConfig {
                seed,
                ..Default::default()
            })
            .unwrap();
            world.run_for(3.0).unwrap();
            (world.world_id, world.keeper.world_state(world.world_id).unwrap().world)
        };
        assert_eq!(run(9), run(9));
        assert_ne!(run(9).0, run(10).0);
    }
}
