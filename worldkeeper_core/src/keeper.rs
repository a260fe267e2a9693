//! The `WorldKeeper` service facade.
//!
//! Every public operation maps to one or more store transactions. Time and
//! entropy come from the [`WorldContext`], read once before the transaction
//! opens, and engine signals reach the [`SimulationCore`] only after commit.

use crate::config::{EncounterConfig, WorldConfig};
use crate::encounter::{self, Encounter, StartOutcome};
use crate::engine::SimulationCore;
use crate::error::{WorldError, WorldResult};
use crate::input::{self, InputCommand, InputId, InputStatus};
use crate::ledger::{self, LedgerEntry};
use crate::membership::{self, Identity, JoinOutcome};
use crate::model::{Engine, PlayerId, Status, World, WorldDescriptions, WorldStatus};
use crate::scheduler::{self, RetryPolicy, ScheduledTask, Task};
use crate::store::{Store, StoreTx};
use crate::supervisor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use worldkeeper_env::{EngineId, WorldContext, WorldId};

/// Upper bound on tasks run per scheduler pass.
const TASK_BATCH: usize = 64;

/// Cap on the doubling applied after consecutive failed scheduler passes.
const MAX_PASS_BACKOFF_STEPS: u32 = 6;

/// Snapshot returned by [`WorldKeeper::world_state`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    pub world: World,
    pub engine: Engine,
    pub status: WorldStatus,
}

/// Lifecycle supervisor, input pipeline, scheduler and choreographer behind
/// one handle.
pub struct WorldKeeper<C: WorldContext> {
    ctx: Arc<C>,
    store: Store,
    config: WorldConfig,
    core: Arc<dyn SimulationCore>,
}

impl<C: WorldContext> WorldKeeper<C> {
    pub fn new(ctx: Arc<C>, store: Store, config: WorldConfig, core: Arc<dyn SimulationCore>) -> Self {
        Self {
            ctx,
            store,
            config,
            core,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<C> {
        &self.ctx
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_ms: self.config.task_retry_base_ms,
            max_failures: self.config.max_task_failures,
        }
    }

    /// Runs one handler at the context's current time and forwards its
    /// signals to the core once committed.
    fn transact<T, F>(&self, handler: F) -> WorldResult<T>
    where
        F: Fn(&StoreTx<'_>) -> WorldResult<T>,
    {
        let (value, signals) = self.store.transact(self.ctx.now_ms(), handler)?;
        for signal in &signals {
            self.core.notify(signal);
        }
        Ok(value)
    }

    // ========================================================================
    // WORLDS
    // ========================================================================

    /// Creates and starts a new world. At most one world may be the default;
    /// the check and the claim commit together.
    pub fn create_world(&self, is_default: bool) -> WorldResult<WorldStatus> {
        let world_id = WorldId::from_seed(self.ctx.random_u64());
        let engine_id = EngineId::from_seed(self.ctx.random_u64());
        self.transact(|tx| supervisor::create_world(tx, world_id, engine_id, is_default))
    }

    pub fn default_world_status(&self) -> WorldResult<Option<WorldStatus>> {
        match self.store.default_world()? {
            Some(world_id) => self.store.status(world_id),
            None => Ok(None),
        }
    }

    /// Keep-alive from an observer of the world.
    pub fn heartbeat_world(&self, world_id: WorldId) -> WorldResult<WorldStatus> {
        self.transact(|tx| supervisor::touch(tx, &self.config, world_id))
    }

    pub fn world_state(&self, world_id: WorldId) -> WorldResult<WorldState> {
        let (state, _) = self.store.transact(self.ctx.now_ms(), |tx| {
            let world = tx.require_world(world_id)?;
            let status = tx
                .status(world_id)?
                .ok_or_else(|| WorldError::not_found("world status", world_id))?;
            let engine = tx.require_engine(status.engine_id)?;
            Ok(WorldState { world, engine, status })
        })?;
        Ok(state)
    }

    pub fn game_descriptions(&self, world_id: WorldId) -> WorldResult<WorldDescriptions> {
        if self.store.world(world_id)?.is_none() {
            return Err(WorldError::not_found("world", world_id));
        }
        Ok(self.store.descriptions(world_id)?.unwrap_or_default())
    }

    pub fn stop_by_developer(&self, world_id: WorldId) -> WorldResult<()> {
        self.transact(|tx| supervisor::stop_by_developer(tx, world_id))
    }

    pub fn resume_by_developer(&self, world_id: WorldId) -> WorldResult<()> {
        self.transact(|tx| supervisor::resume_by_developer(tx, world_id))
    }

    // ========================================================================
    // SWEEPS
    // ========================================================================

    /// Stops every running world nobody has looked at within the idle
    /// timeout. Returns how many were stopped.
    pub fn stop_inactive_worlds(&self) -> WorldResult<usize> {
        let mut stopped = 0;
        for status in self.store.statuses()? {
            if status.status != Status::Running {
                continue;
            }
            if self.transact(|tx| supervisor::stop_if_idle(tx, &self.config, status.world_id))? {
                stopped += 1;
            }
        }
        Ok(stopped)
    }

    /// Kicks every running engine whose clock has stalled. A running world
    /// without an engine record aborts the sweep with `NotFound`.
    pub fn restart_dead_worlds(&self) -> WorldResult<usize> {
        let mut kicked = 0;
        for status in self.store.statuses()? {
            if status.status != Status::Running {
                continue;
            }
            if self.transact(|tx| supervisor::kick_if_dead(tx, &self.config, status.world_id))? {
                kicked += 1;
            }
        }
        Ok(kicked)
    }

    // ========================================================================
    // PLAYERS & INPUTS
    // ========================================================================

    pub fn join_world(&self, world_id: WorldId, identity: Option<&Identity>) -> WorldResult<JoinOutcome> {
        let identity = identity.ok_or(WorldError::NotLoggedIn)?;
        let entropy = self.ctx.random_u64();
        self.transact(|tx| membership::join(tx, &self.config, world_id, identity, entropy))
    }

    pub fn leave_world(&self, world_id: WorldId, identity: Option<&Identity>) -> WorldResult<Option<InputId>> {
        let identity = identity.ok_or(WorldError::NotLoggedIn)?;
        self.transact(|tx| membership::leave(tx, world_id, identity))
    }

    /// Loosely-typed submission: `args` must match the shape of `name`.
    pub fn send_input(&self, engine_id: EngineId, name: &str, args: serde_json::Value) -> WorldResult<InputId> {
        let command = InputCommand::parse(name, args)?;
        self.submit_input(engine_id, command)
    }

    pub fn submit_input(&self, engine_id: EngineId, command: InputCommand) -> WorldResult<InputId> {
        self.transact(|tx| input::submit(tx, engine_id, command.clone()))
    }

    pub fn input_status(&self, id: InputId) -> WorldResult<InputStatus> {
        self.transact(|tx| input::input_status(tx, id))
    }

    // ========================================================================
    // ENCOUNTERS
    // ========================================================================

    /// Starts the configured encounter in `world_id`.
    pub fn trigger_encounter(&self, world_id: WorldId) -> WorldResult<Encounter> {
        self.trigger_encounter_with(world_id, &self.config.encounter)
    }

    /// Starts an encounter with explicit participants and destinations.
    ///
    /// When a required participant is missing the agent-ensuring task is
    /// committed first and then a `Precondition` error is returned.
    pub fn trigger_encounter_with(&self, world_id: WorldId, request: &EncounterConfig) -> WorldResult<Encounter> {
        match self.transact(|tx| encounter::start(tx, world_id, request))? {
            StartOutcome::Started(encounter) => Ok(encounter),
            StartOutcome::MissingParticipants(names) => Err(WorldError::precondition(format!(
                "{} missing; ensured and please retry",
                names.join(", ")
            ))),
        }
    }

    // ========================================================================
    // LEDGER
    // ========================================================================

    pub fn balance(&self, world_id: WorldId, player_id: PlayerId) -> WorldResult<f64> {
        Ok(self.store.account(world_id, player_id)?.map_or(0.0, |a| a.balance))
    }

    pub fn transactions(&self, world_id: WorldId, player_id: PlayerId) -> WorldResult<Vec<LedgerEntry>> {
        self.store.ledger_entries(world_id, player_id)
    }

    pub fn credit(&self, world_id: WorldId, player_id: PlayerId, amount: f64) -> WorldResult<f64> {
        self.transact(|tx| ledger::credit(tx, world_id, player_id, amount))
    }

    // ========================================================================
    // SCHEDULER
    // ========================================================================

    fn execute(&self, tx: &StoreTx<'_>, task: &Task, entropy: u64) -> WorldResult<()> {
        match task {
            Task::RestartInactiveWorld { world_id } => {
                supervisor::restart_inactive(tx, *world_id)?;
            }
            Task::EnsureRequiredAgents { world_id } => {
                supervisor::ensure_required_agents(tx, &self.config, *world_id)?;
            }
            Task::BackfillAccounts { world_id } => {
                if tx.world(*world_id)?.is_some() {
                    ledger::backfill_missing_accounts(tx, *world_id)?;
                }
            }
            Task::CompleteJoin {
                world_id,
                token_identifier,
                attempt,
            } => {
                membership::complete_join(tx, &self.config, *world_id, token_identifier, *attempt)?;
            }
            Task::MonitorEncounter {
                encounter,
                attempt,
                both_arrival_ts,
            } => {
                encounter::monitor(tx, encounter, *attempt, *both_arrival_ts)?;
            }
            Task::ResolveEncounter { encounter, forced } => {
                encounter::resolve(tx, encounter, *forced, entropy)?;
            }
            Task::RelocateAfterEncounter {
                encounter,
                pursuer_destination,
                quarry_destination,
            } => {
                encounter::relocate(tx, encounter, *pursuer_destination, *quarry_destination)?;
            }
        }
        Ok(())
    }

    fn run_task(&self, task: &ScheduledTask) -> WorldResult<bool> {
        let entropy = self.ctx.random_u64();
        let result = self.transact(|tx| {
            if !scheduler::claim(tx, task)? {
                return Ok(false);
            }
            self.execute(tx, &task.task, entropy)?;
            Ok(true)
        });
        match result {
            Ok(ran) => Ok(ran),
            Err(e @ (WorldError::Storage(_) | WorldError::Conflict)) => Err(e),
            Err(e) => {
                self.transact(|tx| scheduler::record_failure(tx, task, &e, self.retry_policy()))?;
                Ok(false)
            }
        }
    }

    /// Runs every task due now. Returns how many handlers committed.
    ///
    /// Tasks queued by this pass with no delay are picked up by the next
    /// pass.
    pub fn run_due_tasks(&self) -> WorldResult<usize> {
        let due = self.store.due_tasks(self.ctx.now_ms(), TASK_BATCH)?;
        let mut ran = 0;
        for task in &due {
            if self.run_task(task)? {
                debug!("Ran {} #{}", task.task.name(), task.id);
                ran += 1;
            } else {
                debug!("Skipped {} #{}", task.task.name(), task.id);
            }
        }
        Ok(ran)
    }

    /// Drives the scheduler forever, sleeping until the next task is due
    /// but never longer than the configured poll interval.
    pub async fn run_scheduler(&self) {
        info!("⏱️  Scheduler started (poll {}ms)", self.config.scheduler_poll_interval_ms);
        let mut failed_passes = 0u32;
        loop {
            let busy = match self.run_due_tasks() {
                Ok(ran) => {
                    failed_passes = 0;
                    ran >= TASK_BATCH
                }
                Err(e) => {
                    // The failing task is still due; back off instead of
                    // hammering the store.
                    let delay = self
                        .retry_policy()
                        .backoff_ms(failed_passes.min(MAX_PASS_BACKOFF_STEPS));
                    failed_passes = failed_passes.saturating_add(1);
                    error!(
                        "Scheduler pass failed ({} in a row), retrying in {}ms: {}",
                        failed_passes, delay, e
                    );
                    self.ctx.sleep(Duration::from_millis(delay.max(1))).await;
                    continue;
                }
            };
            if busy {
                continue;
            }
            let poll = self.config.scheduler_poll_interval_ms;
            let wait = match self.store.next_due() {
                Ok(Some(due)) => due.saturating_sub(self.ctx.now_ms()).min(poll),
                _ => poll,
            };
            self.ctx.sleep(Duration::from_millis(wait.max(1))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::{DWELL_THRESHOLD_MS, SAFETY_CAP};
    use crate::engine::EngineSignal;
    use crate::model::{Player, Position, Tile};
    use crate::testing::{ManualContext, RecordingCore, T0};
    use approx::assert_relative_eq;

    struct Harness {
        keeper: WorldKeeper<ManualContext>,
        core: Arc<RecordingCore>,
        world_id: WorldId,
    }

    impl Harness {
        fn new() -> Self {
            let ctx = Arc::new(ManualContext::new(T0));
            let core = Arc::new(RecordingCore::default());
            let keeper = WorldKeeper::new(ctx, Store::temporary().unwrap(), WorldConfig::default(), core.clone());
            let world_id = keeper.create_world(true).unwrap().world_id;
            Self { keeper, core, world_id }
        }

        fn advance(&self, ms: u64) {
            self.keeper.context().advance(ms);
        }

        /// Runs tasks until nothing more is due at the current time.
        fn drain(&self) -> usize {
            let mut total = 0;
            loop {
                let ran = self.keeper.run_due_tasks().unwrap();
                if ran == 0 && self.keeper.store().due_tasks(self.keeper.context().now_ms(), 1).unwrap().is_empty() {
                    return total;
                }
                total += ran;
            }
        }

        /// Plays the core's part for `createAgent`: every requested roster
        /// agent appears at the given position.
        fn spawn_agents(&self, at: Position) {
            let engine_id = self.keeper.world_state(self.world_id).unwrap().engine.id;
            let inputs = self.keeper.store().inputs_after(engine_id, None, 100).unwrap();
            let config = self.keeper.config().clone();
            let world_id = self.world_id;
            self.keeper
                .store()
                .transact(0, |tx| {
                    let mut world = tx.require_world(world_id)?;
                    let mut desc = tx.descriptions(world_id)?;
                    for record in &inputs {
                        let InputCommand::CreateAgent { description_index } = record.command else {
                            continue;
                        };
                        let profile = &config.roster[description_index];
                        if desc.by_name(&profile.name).is_some() {
                            continue;
                        }
                        let id = world.allocate_player_id();
                        world.players.push(Player::new(id, at, None, T0));
                        desc.players.push(crate::model::PlayerDescription {
                            player_id: id,
                            name: profile.name.clone(),
                            character: profile.character.clone(),
                            description: profile.identity.clone(),
                        });
                        desc.pending_agents.remove(&description_index);
                    }
                    tx.put_world(&world)?;
                    tx.put_descriptions(world_id, &desc)
                })
                .unwrap();
        }

        fn player(&self, name: &str) -> PlayerId {
            self.keeper
                .game_descriptions(self.world_id)
                .unwrap()
                .by_name(name)
                .unwrap()
                .player_id
        }
    }

    #[test]
    fn test_create_world_notifies_core_after_commit() {
        let h = Harness::new();
        let signals = h.core.signals.lock().unwrap().clone();
        assert!(matches!(signals[..], [EngineSignal::Started { generation: 1, .. }]));
        assert_eq!(h.keeper.default_world_status().unwrap().unwrap().world_id, h.world_id);
        assert!(matches!(
            h.keeper.create_world(true),
            Err(WorldError::Precondition(_))
        ));
    }

    #[test]
    fn test_heartbeat_materializes_required_agents_and_accounts() {
        let h = Harness::new();
        h.keeper.heartbeat_world(h.world_id).unwrap();
        h.drain();
        h.spawn_agents(Position::new(30.0, 30.0));

        h.advance(1_000);
        h.keeper.heartbeat_world(h.world_id).unwrap();
        h.drain();

        let desc = h.keeper.game_descriptions(h.world_id).unwrap();
        assert_eq!(desc.players.len(), 3);
        for p in &desc.players {
            assert!(h.keeper.store().account(h.world_id, p.player_id).unwrap().is_some());
        }
    }

    #[test]
    fn test_trigger_encounter_missing_participants() {
        let h = Harness::new();
        let err = h.keeper.trigger_encounter(h.world_id).unwrap_err();
        assert!(matches!(err, WorldError::Precondition(_)));

        let pending = h.keeper.store().pending_tasks().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].task, Task::EnsureRequiredAgents { world_id: h.world_id });
    }

    fn encounter_ready(h: &Harness) -> Encounter {
        h.keeper.heartbeat_world(h.world_id).unwrap();
        h.drain();
        h.spawn_agents(Position::new(30.5, 30.5));
        h.keeper.credit(h.world_id, h.player("Outlaw"), 5.0).unwrap();
        h.keeper.trigger_encounter(h.world_id).unwrap()
    }

    fn teleport(h: &Harness, player: PlayerId, tile: Tile) {
        let world_id = h.world_id;
        h.keeper
            .store()
            .transact(0, |tx| {
                let mut world = tx.require_world(world_id)?;
                if let Some(p) = world.player_mut(player) {
                    p.position = tile.position();
                }
                tx.put_world(&world)
            })
            .unwrap();
    }

    #[test]
    fn test_encounter_resolves_once_after_dwell() {
        let h = Harness::new();
        let enc = encounter_ready(&h);
        teleport(&h, enc.pursuer, enc.destination);
        teleport(&h, enc.quarry, enc.destination);
        let arrived_at = h.keeper.context().now_ms();

        let mut resolved_at = None;
        for _ in 0..(DWELL_THRESHOLD_MS / 500 + 8) {
            h.advance(500);
            h.drain();
            if resolved_at.is_none() && h.keeper.balance(h.world_id, enc.pursuer).unwrap() > 0.0 {
                resolved_at = Some(h.keeper.context().now_ms());
            }
        }

        let resolved_at = resolved_at.expect("encounter never resolved");
        assert!(resolved_at - arrived_at <= DWELL_THRESHOLD_MS + 2_000);
        assert_relative_eq!(h.keeper.balance(h.world_id, enc.quarry).unwrap(), 0.0);
        assert_relative_eq!(h.keeper.balance(h.world_id, enc.pursuer).unwrap(), 5.0);
        assert_eq!(h.keeper.transactions(h.world_id, enc.pursuer).unwrap().len(), 1);
        assert!(h.keeper.store().pending_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_encounter_safety_cap_resolves_without_arrival() {
        let h = Harness::new();
        let enc = encounter_ready(&h);
        let started = h.keeper.context().now_ms();

        for _ in 0..(SAFETY_CAP + 5) {
            h.advance(1_000);
            h.drain();
        }

        assert_relative_eq!(h.keeper.balance(h.world_id, enc.pursuer).unwrap(), 5.0);
        let entry = &h.keeper.transactions(h.world_id, enc.pursuer).unwrap()[0];
        assert!(entry.timestamp >= started + (SAFETY_CAP as u64 + 1) * 1_000);
    }

    #[test]
    fn test_failing_task_is_dead_lettered() {
        let h = Harness::new();
        let engine_id = h.keeper.world_state(h.world_id).unwrap().engine.id;
        h.keeper
            .store()
            .transact(0, |tx| {
                let mut status = tx.require_status(h.world_id)?;
                status.status = Status::Inactive;
                tx.put_status(&status)?;
                tx.remove(&crate::store::keys::engine(engine_id)).map(|_| ())
            })
            .unwrap();

        h.keeper.heartbeat_world(h.world_id).unwrap();
        for _ in 0..64 {
            h.drain();
            h.advance(60_000);
        }

        let dead = h.keeper.store().dead_tasks().unwrap();
        assert!(dead
            .iter()
            .any(|d| d.task.task == Task::RestartInactiveWorld { world_id: h.world_id }));
        for d in &dead {
            assert_eq!(d.task.failures, h.keeper.config().max_task_failures);
            assert!(d.error.contains("engine"));
        }
        assert!(h.keeper.store().pending_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_dead_sweep_kicks_and_idle_sweep_stops() {
        let h = Harness::new();
        let config = h.keeper.config().clone();

        h.advance(config.dead_engine_threshold_ms() + 1);
        assert_eq!(h.keeper.restart_dead_worlds().unwrap(), 1);
        assert!(matches!(
            h.core.signals.lock().unwrap().last(),
            Some(EngineSignal::Kicked { .. })
        ));

        h.advance(config.idle_timeout_ms);
        assert_eq!(h.keeper.stop_inactive_worlds().unwrap(), 1);
        assert_eq!(h.keeper.world_state(h.world_id).unwrap().status.status, Status::Inactive);
        assert_eq!(h.keeper.restart_dead_worlds().unwrap(), 0);
    }

    #[test]
    fn test_join_requires_identity() {
        let h = Harness::new();
        assert_eq!(h.keeper.join_world(h.world_id, None), Err(WorldError::NotLoggedIn));
        assert_eq!(h.keeper.leave_world(h.world_id, None), Err(WorldError::NotLoggedIn));
    }

    #[test]
    fn test_send_input_validates_shape() {
        let h = Harness::new();
        let engine_id = h.keeper.world_state(h.world_id).unwrap().engine.id;

        let id = h
            .keeper
            .send_input(engine_id, "moveTo", serde_json::json!({ "playerId": 1, "destination": { "x": 3, "y": 4 } }))
            .unwrap();
        assert_eq!(h.keeper.input_status(id).unwrap(), InputStatus::Pending);

        let err = h
            .keeper
            .send_input(engine_id, "moveTo", serde_json::json!({ "destination": 4 }))
            .unwrap_err();
        assert!(matches!(err, WorldError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_run_scheduler_sleeps_on_context_clock() {
        let h = Harness::new();
        h.keeper.heartbeat_world(h.world_id).unwrap();
        let before = h.keeper.context().now_ms();

        let _ = tokio::time::timeout(Duration::from_millis(50), h.keeper.run_scheduler()).await;

        assert!(h.keeper.store().pending_tasks().unwrap().is_empty());
        assert!(h.keeper.context().now_ms() > before);
    }

    #[tokio::test]
    async fn test_run_scheduler_backs_off_on_store_errors() {
        let h = Harness::new();
        // A task record that cannot be decoded fails every pass.
        h.keeper
            .store()
            .transact(0, |tx| tx.put(&crate::store::keys::task(0, 1), &"not a task"))
            .unwrap();
        assert!(h.keeper.run_due_tasks().is_err());

        let _ = tokio::time::timeout(Duration::from_millis(50), h.keeper.run_scheduler()).await;

        let base = h.keeper.config().task_retry_base_ms;
        let sleeps = h.keeper.context().sleeps();
        assert!(sleeps.len() >= 3);
        assert_eq!(sleeps[..3], [base, base * 2, base * 4]);
        let cap = base << MAX_PASS_BACKOFF_STEPS;
        assert!(sleeps.iter().all(|&ms| ms <= cap));
    }

    #[test]
    fn test_concurrent_default_world_creation_yields_one_default() {
        for _ in 0..10 {
            let ctx = Arc::new(ManualContext::new(T0));
            let keeper = Arc::new(WorldKeeper::new(
                ctx,
                Store::temporary().unwrap(),
                WorldConfig::default(),
                Arc::new(RecordingCore::default()),
            ));
            let barrier = Arc::new(std::sync::Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let keeper = keeper.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        keeper.create_world(true)
                    })
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let created: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(created.len(), 1);
            assert!(results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, WorldError::Precondition(_))));
            let defaults: Vec<_> = keeper
                .store()
                .statuses()
                .unwrap()
                .into_iter()
                .filter(|s| s.is_default)
                .collect();
            assert_eq!(defaults.len(), 1);
            assert_eq!(defaults[0].world_id, created[0].world_id);
            assert_eq!(keeper.default_world_status().unwrap().unwrap().world_id, created[0].world_id);
        }
    }
}
