//! Scenario runner - executes lifecycle and choreography scenarios.

use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};
use worldkeeper_core::encounter::{DWELL_THRESHOLD_MS, MONITOR_INTERVAL_MS, SAFETY_CAP};
use worldkeeper_core::{
    EncounterConfig, Identity, InputCommand, InputStatus, JoinOutcome, PlayerId, Status, Task, Tile, WorldError,
    WorldResult, TREASURY,
};

/// Ok, or why the scenario failed.
type Verdict = Result<(), String>;

/// Fails the scenario with a message unless the condition holds.
macro_rules! require {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Ok(Err(format!($($arg)+)));
        }
    };
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMetrics {
    /// Scheduled task handlers that committed
    pub tasks_run: u64,

    /// Tasks that ended in the dead-letter set
    pub dead_tasks: usize,

    /// Inputs applied by the simulation core
    pub inputs_applied: usize,

    /// Encounters resolved
    pub encounters_resolved: u64,

    /// Total amount moved by encounter transfers
    pub amount_transferred: f64,

    /// Dead-engine kicks observed
    pub kicks: u64,

    /// Invariant violations reported by the oracle
    pub violations: usize,
}

/// The three encounter participants, resolved by name.
#[derive(Debug, Clone, Copy)]
struct Cast {
    pursuer: PlayerId,
    quarry: PlayerId,
    bystander: Option<PlayerId>,
}

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Longest any single wait inside a scenario may last (seconds)
    max_duration_secs: f64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            max_duration_secs: 120.0,
        }
    }

    /// Sets the maximum duration of a single wait.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    fn sim_config(&self, scenario: ScenarioId) -> SimConfig {
        let mut config = SimConfig {
            seed: self.seed,
            max_duration_secs: self.max_duration_secs,
            ..Default::default()
        };
        match scenario {
            ScenarioId::IdleShutdown => {
                config.observed = false;
                config.tick_ms = 1_000;
            }
            ScenarioId::DeadEngine | ScenarioId::DeveloperStop => config.tick_ms = 500,
            _ => {}
        }
        config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut metrics = ScenarioMetrics::default();
        let mut world = match SimWorld::new(self.sim_config(scenario)) {
            Ok(world) => world,
            Err(e) => {
                return ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    total_ticks: 0,
                    final_time_secs: 0.0,
                    failure_reason: Some(format!("setup failed: {}", e)),
                    metrics,
                }
            }
        };

        let outcome = match scenario {
            ScenarioId::EncounterDwell => self.run_encounter_dwell(&mut world, &mut metrics),
            ScenarioId::SafetyCap => self.run_safety_cap(&mut world, &mut metrics),
            ScenarioId::IdleShutdown => self.run_idle_shutdown(&mut world),
            ScenarioId::DeadEngine => self.run_dead_engine(&mut world, &mut metrics),
            ScenarioId::DeveloperStop => self.run_developer_stop(&mut world),
            ScenarioId::LedgerConservation => self.run_ledger_conservation(&mut world, &mut metrics),
            ScenarioId::JoinBackfill => self.run_join_backfill(&mut world),
            ScenarioId::InputOrdering => self.run_input_ordering(&mut world),
        };
        let mut verdict = outcome.unwrap_or_else(|e| Err(format!("world error: {}", e)));

        metrics.tasks_run = world.tasks_run();
        metrics.violations = world.oracle.violations().len();
        metrics.dead_tasks = world.store().dead_tasks().map(|d| d.len()).unwrap_or_default();
        if let Ok(state) = world.keeper.world_state(world.world_id) {
            metrics.inputs_applied = world.engine.applied_inputs(state.status.engine_id).len();
        }
        if verdict.is_ok() {
            if let Some(v) = world.oracle.violations().first() {
                verdict = Err(format!("invariant violated at tick {}: {}", v.tick, v.message));
            }
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: verdict.is_ok(),
            total_ticks: world.tick_count(),
            final_time_secs: world.elapsed_secs(),
            failure_reason: verdict.err(),
            metrics,
        }
    }

    /// Waits for the heartbeat-driven agent bootstrap to produce the
    /// configured pursuer and quarry.
    fn cast(&self, world: &mut SimWorld) -> WorldResult<Option<Cast>> {
        let encounter = world.config.world.encounter.clone();
        let ready = world.run_until(self.max_duration_secs, |w| {
            Ok(w.player(&encounter.pursuer)?.is_some() && w.player(&encounter.quarry)?.is_some())
        })?;
        if !ready {
            return Ok(None);
        }
        let bystander = match &encounter.bystander {
            Some(name) => world.player(name)?,
            None => None,
        };
        Ok(world.player(&encounter.pursuer)?.zip(world.player(&encounter.quarry)?).map(
            |(pursuer, quarry)| Cast {
                pursuer,
                quarry,
                bystander,
            },
        ))
    }

    /// Runs until the quarry's balance is gone. Returns the seconds it took.
    fn await_resolution(&self, world: &mut SimWorld, cast: Cast) -> WorldResult<Option<f64>> {
        let started = world.elapsed_secs();
        let done = world.run_until(self.max_duration_secs, |w| Ok(w.balance(cast.quarry)? == 0.0))?;
        Ok(done.then(|| world.elapsed_secs() - started))
    }

    /// DST-001: EncounterDwell - pursuit, dwell, single transfer, relocation.
    ///
    /// Both participants walk to the shared tile; once both have stood there
    /// for the dwell threshold the quarry's balance moves to the pursuer.
    ///
    /// **Assertion**: Exactly one transfer of the full balance, no sooner
    /// than the dwell threshold, followed by relocation orders for both.
    fn run_encounter_dwell(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> WorldResult<Verdict> {
        info!("DST-001: EncounterDwell - pursuit and dwell");

        let Some(cast) = self.cast(world)? else {
            return Ok(Err("required agents never appeared".into()));
        };
        world.credit(cast.quarry, 5.0)?;
        let encounter = world.keeper.trigger_encounter(world.world_id)?;

        let Some(took) = self.await_resolution(world, cast)? else {
            return Ok(Err(format!("no resolution within {}s", self.max_duration_secs)));
        };
        info!("  ✓ Resolved after {:.1}s", took);
        metrics.encounters_resolved += 1;
        metrics.amount_transferred += 5.0;

        require!(
            took * 1000.0 >= DWELL_THRESHOLD_MS as f64,
            "resolved after {:.1}s, before the dwell threshold",
            took
        );
        require!(
            took * 1000.0 < ((SAFETY_CAP as u64 + 1) * MONITOR_INTERVAL_MS) as f64,
            "resolved after {:.1}s; the safety cap fired instead of the dwell",
            took
        );
        require!(world.balance(cast.pursuer)? == 5.0, "pursuer holds {}", world.balance(cast.pursuer)?);

        // Let relocation run, then make sure nothing moves money again
        world.run_for(30.0)?;
        let entries = world.keeper.transactions(world.world_id, cast.pursuer)?;
        require!(entries.len() == 1, "pursuer has {} ledger entries", entries.len());
        require!(world.balance(cast.quarry)? == 0.0, "quarry balance came back");

        let state = world.keeper.world_state(world.world_id)?;
        let relocations: Vec<PlayerId> = world
            .store()
            .inputs_after(state.status.engine_id, None, usize::MAX)?
            .into_iter()
            .filter_map(|r| match r.command {
                InputCommand::ForceMoveTo {
                    player_id,
                    destination: Some(tile),
                } if tile != encounter.destination => Some(player_id),
                _ => None,
            })
            .collect();
        require!(
            relocations.contains(&cast.pursuer) && relocations.contains(&cast.quarry),
            "missing relocation orders: {:?}",
            relocations
        );

        for id in [Some(cast.pursuer), Some(cast.quarry), cast.bystander].into_iter().flatten() {
            let Some(player) = state.world.player(id) else {
                return Ok(Err(format!("{} disappeared", id)));
            };
            require!(player.speed_multiplier.is_none(), "{} still has a speed override", id);
            require!(player.activity.is_none(), "{} still shows an activity", id);
        }
        let leftover = world
            .store()
            .pending_tasks()?
            .into_iter()
            .filter(|t| {
                matches!(
                    t.task,
                    Task::MonitorEncounter { .. } | Task::ResolveEncounter { .. } | Task::RelocateAfterEncounter { .. }
                )
            })
            .count();
        require!(leftover == 0, "{} encounter tasks still queued", leftover);
        Ok(Ok(()))
    }

    /// DST-002: SafetyCap - forced resolution when participants never meet.
    ///
    /// **Assertion**: Resolution happens after the safety cap's worth of
    /// monitor checks, and the transfer still happens exactly once.
    fn run_safety_cap(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> WorldResult<Verdict> {
        info!("DST-002: SafetyCap - unreachable destination");

        let Some(cast) = self.cast(world)? else {
            return Ok(Err("required agents never appeared".into()));
        };
        world.credit(cast.quarry, 12.5)?;
        let request = EncounterConfig {
            destination: Tile::new(-1_000, -1_000),
            ..world.config.world.encounter.clone()
        };
        world.keeper.trigger_encounter_with(world.world_id, &request)?;

        let Some(took) = self.await_resolution(world, cast)? else {
            return Ok(Err(format!("no resolution within {}s", self.max_duration_secs)));
        };
        info!("  ✓ Forced resolution after {:.1}s", took);
        metrics.encounters_resolved += 1;
        metrics.amount_transferred += 12.5;

        let cap_secs = (SAFETY_CAP as u64 * MONITOR_INTERVAL_MS) as f64 / 1000.0;
        require!(took >= cap_secs, "resolved after {:.1}s, before the cap ({}s)", took, cap_secs);
        require!(took < cap_secs + 5.0, "resolved after {:.1}s, long after the cap", took);
        require!(world.balance(cast.pursuer)? == 12.5, "pursuer holds {}", world.balance(cast.pursuer)?);

        world.run_for(5.0)?;
        let entries = world.keeper.transactions(world.world_id, cast.pursuer)?;
        require!(entries.len() == 1, "pursuer has {} ledger entries", entries.len());
        Ok(Ok(()))
    }

    /// DST-003: IdleShutdown - unobserved worlds stop and come back on demand.
    ///
    /// **Assertion**: The world is stopped only after the idle timeout, its
    /// engine is told to stop, and one heartbeat restarts it with a fresh
    /// clock rather than replaying the idle period.
    fn run_idle_shutdown(&self, world: &mut SimWorld) -> WorldResult<Verdict> {
        info!("DST-003: IdleShutdown - nobody watching");

        let config = world.config.clone();
        let engine_id = world.keeper.world_state(world.world_id)?.status.engine_id;
        let budget = (config.world.idle_timeout_ms + 2 * config.sweep_interval_ms) as f64 / 1000.0;

        let world_id = world.world_id;
        let stopped = world.run_until(budget, |w| {
            Ok(w.keeper.world_state(world_id)?.status.status == Status::Inactive)
        })?;
        require!(stopped, "world still running after {}s unobserved", budget);
        let idle_for = world.elapsed_secs();
        info!("  ⏹  Stopped after {:.0}s unobserved", idle_for);
        require!(
            idle_for * 1000.0 > config.world.idle_timeout_ms as f64,
            "stopped after {:.0}s, inside the idle timeout",
            idle_for
        );
        require!(!world.engine.is_running(engine_id), "core still running a stopped engine");

        // Stay dark for a while; nothing should wake it
        world.run_for(config.sweep_interval_ms as f64 / 1000.0)?;
        require!(
            world.keeper.world_state(world_id)?.status.status == Status::Inactive,
            "world woke up on its own"
        );

        world.set_observed(true);
        let restarted = world.run_until(10.0, |w| {
            Ok(w.keeper.world_state(world_id)?.status.status == Status::Running)
        })?;
        require!(restarted, "heartbeat did not restart the world");
        world.run_for(1.0)?;

        let state = world.keeper.world_state(world_id)?;
        let lag = world.now_ms() - state.engine.current_time.unwrap_or(0);
        require!(lag <= config.tick_ms, "restarted engine clock lags by {}ms", lag);
        require!(world.engine.is_running(engine_id), "core never restarted the engine");
        Ok(Ok(()))
    }

    /// DST-004: DeadEngine - a frozen engine is kicked back to life.
    ///
    /// **Assertion**: The sweep bumps the generation of an engine whose clock
    /// lags by more than twice the step period, without touching the world's
    /// status, and the new run loop advances the clock again.
    fn run_dead_engine(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> WorldResult<Verdict> {
        info!("DST-004: DeadEngine - stalled run loop");

        let config = world.config.clone();
        world.run_for(2.0)?;
        let before = world.keeper.world_state(world.world_id)?;
        let engine_id = before.status.engine_id;
        require!(world.engine.stall(engine_id), "no run loop to stall");

        let budget = (config.world.dead_engine_threshold_ms() + 2 * config.sweep_interval_ms) as f64 / 1000.0;
        let generation = before.engine.generation_number;
        let stalled_at = world.elapsed_secs();
        let kicked = world.run_until(budget, |w| {
            Ok(w.keeper.world_state(w.world_id)?.engine.generation_number > generation)
        })?;
        require!(kicked, "engine never kicked within {:.0}s", budget);
        metrics.kicks += 1;

        let dark = world.elapsed_secs() - stalled_at;
        info!("  ⚡ Kicked after {:.0}s stalled", dark);
        require!(
            dark * 1000.0 > config.world.dead_engine_threshold_ms() as f64,
            "kicked after {:.0}s, inside the threshold",
            dark
        );

        world.run_for(2.0)?;
        let after = world.keeper.world_state(world.world_id)?;
        require!(after.status.status == Status::Running, "status became {}", after.status.status);
        require!(after.engine.running, "engine not running after kick");
        require!(after.engine.generation_number == generation + 1, "kicked more than once");
        let lag = world.now_ms() - after.engine.current_time.unwrap_or(0);
        require!(lag <= config.tick_ms, "kicked engine clock lags by {}ms", lag);
        Ok(Ok(()))
    }

    /// DST-005: DeveloperStop - operator stops are sticky.
    ///
    /// **Assertion**: Heartbeats and sweeps never restart a world stopped by
    /// a developer; resuming does.
    fn run_developer_stop(&self, world: &mut SimWorld) -> WorldResult<Verdict> {
        info!("DST-005: DeveloperStop - sticky stop");

        let world_id = world.world_id;
        let engine_id = world.keeper.world_state(world_id)?.status.engine_id;
        world.run_for(2.0)?;
        world.keeper.stop_by_developer(world_id)?;
        require!(!world.engine.is_running(engine_id), "core still running after developer stop");

        let watch = (3 * world.config.sweep_interval_ms) as f64 / 1000.0;
        let woke = world.run_until(watch, |w| {
            let state = w.keeper.world_state(world_id)?;
            Ok(state.status.status != Status::StoppedByDeveloper || state.engine.running)
        })?;
        require!(!woke, "developer-stopped world was restarted");
        let restarts = world
            .store()
            .pending_tasks()?
            .into_iter()
            .filter(|t| matches!(t.task, Task::RestartInactiveWorld { .. }))
            .count();
        require!(restarts == 0, "{} restarts queued for a developer-stopped world", restarts);

        world.keeper.resume_by_developer(world_id)?;
        world.run_for(1.0)?;
        let state = world.keeper.world_state(world_id)?;
        require!(state.status.status == Status::Running, "resume left status {}", state.status.status);
        require!(world.engine.is_running(engine_id), "core not running after resume");
        Ok(Ok(()))
    }

    /// DST-006: LedgerConservation - money is neither created nor lost.
    ///
    /// Random credits land on the cast between back-to-back encounters.
    ///
    /// **Assertion**: After every encounter the quarry holds nothing, the
    /// pursuer gained exactly what the quarry held, and the oracle's
    /// conservation check never fires.
    fn run_ledger_conservation(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> WorldResult<Verdict> {
        info!("DST-006: LedgerConservation - random credits and encounters");

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_mul(0x9e3779b97f4a7c15));
        let Some(cast) = self.cast(world)? else {
            return Ok(Err("required agents never appeared".into()));
        };
        let everyone: Vec<PlayerId> = [Some(cast.pursuer), Some(cast.quarry), cast.bystander]
            .into_iter()
            .flatten()
            .collect();

        for round in 0..3 {
            for _ in 0..rng.gen_range(2..6) {
                let who = everyone[rng.gen_range(0..everyone.len())];
                let cents: u32 = rng.gen_range(1..5_000);
                world.credit(who, cents as f64 / 100.0)?;
            }
            let cents: u32 = rng.gen_range(1..5_000);
            world.credit(cast.quarry, cents as f64 / 100.0)?;

            let owed = world.balance(cast.quarry)?;
            let had = world.balance(cast.pursuer)?;
            world.keeper.trigger_encounter(world.world_id)?;
            if self.await_resolution(world, cast)?.is_none() {
                return Ok(Err(format!("round {} never resolved", round)));
            }
            // Relocation lands before the next round's orders
            world.run_for(2.0)?;

            let has = world.balance(cast.pursuer)?;
            require!(
                (has - had - owed).abs() < crate::oracle::LEDGER_EPSILON,
                "round {}: pursuer went {} -> {}, expected +{}",
                round,
                had,
                has,
                owed
            );
            metrics.encounters_resolved += 1;
            metrics.amount_transferred += owed;
            debug!("  round {}: moved {:.2}", round, owed);
        }

        let total = crate::oracle::Oracle::total_balance(world.store())?;
        require!(
            (total - world.oracle.minted()).abs() < crate::oracle::LEDGER_EPSILON,
            "total {} but minted {}",
            total,
            world.oracle.minted()
        );
        Ok(Ok(()))
    }

    /// DST-007: JoinBackfill - humans join, pay the fee, and leave.
    ///
    /// **Assertion**: Every joined human ends up in the world holding the
    /// opening grant minus the join fee, and the treasury holds one fee per
    /// join; re-joining charges nothing; leaving removes them; anonymous
    /// callers are refused.
    fn run_join_backfill(&self, world: &mut SimWorld) -> WorldResult<Verdict> {
        info!("DST-007: JoinBackfill - human membership");

        let world_id = world.world_id;
        let identities = [
            Identity::new("token-alice").with_name("Alice"),
            Identity::new("token-bob").with_name("Bob"),
            Identity::new("token-anon"),
        ];

        let anonymous = world.keeper.join_world(world_id, None);
        require!(
            matches!(anonymous, Err(WorldError::NotLoggedIn)),
            "anonymous join returned {:?}",
            anonymous
        );

        for identity in &identities {
            let outcome = world.keeper.join_world(world_id, Some(identity))?;
            require!(matches!(outcome, JoinOutcome::Joining(_)), "first join returned {:?}", outcome);
        }

        let config = world.keeper.config().clone();
        let settled = config.starting_balance - config.join_fee.min(config.starting_balance);
        let joined = world.run_until(self.max_duration_secs, |w| {
            let state = w.keeper.world_state(world_id)?;
            for identity in &identities {
                let Some(player) = state.world.human_player(&identity.token_identifier) else {
                    return Ok(false);
                };
                match w.store().account(world_id, player.id)? {
                    Some(account) if (account.balance - settled).abs() < crate::oracle::LEDGER_EPSILON => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        })?;
        require!(joined, "humans never completed their joins");
        let fees = config.starting_balance - settled;
        let collected = world.store().account(world_id, TREASURY)?.map_or(0.0, |a| a.balance);
        require!(
            (collected - 3.0 * fees).abs() < crate::oracle::LEDGER_EPSILON,
            "treasury holds {} after three joins",
            collected
        );

        let descriptions = world.keeper.game_descriptions(world_id)?;
        require!(descriptions.by_name("Alice").is_some(), "Alice has no description");
        require!(descriptions.by_name("Me").is_some(), "anonymous name did not default");

        let again = world.keeper.join_world(world_id, Some(&identities[0]))?;
        require!(matches!(again, JoinOutcome::AlreadyPresent(_)), "re-join returned {:?}", again);
        world.run_for(2.0)?;
        let collected = world.store().account(world_id, TREASURY)?.map_or(0.0, |a| a.balance);
        require!(
            (collected - 3.0 * fees).abs() < crate::oracle::LEDGER_EPSILON,
            "re-join charged again: treasury holds {}",
            collected
        );

        let left = world.keeper.leave_world(world_id, Some(&identities[1]))?;
        require!(left.is_some(), "leave queued nothing");
        world.run_for(1.0)?;
        let state = world.keeper.world_state(world_id)?;
        require!(state.world.human_player("token-bob").is_none(), "Bob is still in the world");
        require!(state.world.human_player("token-alice").is_some(), "Alice left too");

        let humans = state.world.players.iter().filter(|p| p.is_human()).count();
        require!(humans == 2, "{} humans after re-join and leave", humans);
        Ok(Ok(()))
    }

    /// DST-008: InputOrdering - exactly once, in submission order.
    ///
    /// Inputs are submitted in bursts, through both the typed and the
    /// JSON entry points, while the core keeps stepping.
    ///
    /// **Assertion**: The core applies input numbers 1..=N each exactly once
    /// in increasing order; malformed inputs are refused without consuming a
    /// number.
    fn run_input_ordering(&self, world: &mut SimWorld) -> WorldResult<Verdict> {
        info!("DST-008: InputOrdering - interleaved submitters");

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ 0x5bd1e995);
        let Some(cast) = self.cast(world)? else {
            return Ok(Err("required agents never appeared".into()));
        };
        let engine_id = world.keeper.world_state(world.world_id)?.status.engine_id;
        let players = [cast.pursuer, cast.quarry];

        let bad = world
            .keeper
            .send_input(engine_id, "moveTo", serde_json::json!({ "playerId": "nobody" }));
        require!(matches!(bad, Err(WorldError::InvalidInput(_))), "malformed input returned {:?}", bad);

        let mut submitted = Vec::new();
        for burst in 0..10 {
            for _ in 0..20 {
                let player = players[rng.gen_range(0..players.len())];
                let tile = Tile::new(rng.gen_range(0..64), rng.gen_range(0..64));
                let id = if rng.gen_bool(0.5) {
                    world.keeper.submit_input(
                        engine_id,
                        InputCommand::MoveTo {
                            player_id: player,
                            destination: Some(tile),
                        },
                    )?
                } else {
                    world.keeper.send_input(
                        engine_id,
                        "setSpeedMultiplier",
                        serde_json::json!({ "playerId": player.0, "multiplier": rng.gen_range(0.5..2.0) }),
                    )?
                };
                submitted.push(id);
            }
            debug!("  burst {} submitted", burst);
            world.tick()?;
        }
        world.run_for(2.0)?;

        let applied = world.engine.applied_inputs(engine_id);
        let last = submitted.last().map_or(0, |id| id.number);
        let expected: Vec<u64> = (1..=last).collect();
        require!(
            applied == expected,
            "core applied {} inputs out of order or twice (expected 1..={})",
            applied.len(),
            last
        );
        for id in &submitted {
            let status = world.keeper.input_status(*id)?;
            require!(status == InputStatus::Processed, "{} still {:?}", id, status);
        }
        let engine = world.keeper.world_state(world.world_id)?.engine;
        require!(
            engine.next_input_number == last + 1,
            "next input number {} after {} submissions",
            engine.next_input_number,
            last
        );
        Ok(Ok(()))
    }
}
