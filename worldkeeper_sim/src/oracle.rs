//! Invariant oracle for simulation.
//!
//! The Oracle keeps the harness's independent view of what must hold in the
//! store after every tick:
//! - A world is `running` exactly when its engine is running
//! - `lastViewed` and engine generations never move backwards
//! - The processed input cursor never passes the last submitted input
//! - Every balance equals the sum of its ledger entries and is never negative
//! - Money is only minted by credits and opening grants; transfers and join
//!   fees conserve the total

use serde::Serialize;
use std::collections::HashMap;
use worldkeeper_core::{EntryKind, Status, Store, WorldResult};
use worldkeeper_env::{EngineId, WorldId};

/// Tolerance for ledger float comparisons
pub const LEDGER_EPSILON: f64 = 1e-6;

/// One broken invariant.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    /// Tick at which it was observed
    pub tick: u64,

    pub message: String,
}

/// Ground-truth bookkeeping for invariant checks.
#[derive(Debug, Default)]
pub struct Oracle {
    last_viewed: HashMap<WorldId, u64>,
    generations: HashMap<EngineId, u64>,
    minted: f64,
    violations: Vec<Violation>,
}

impl Oracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records money entering the system through a credit.
    pub fn record_credit(&mut self, amount: f64) {
        self.minted += amount;
    }

    /// Total credited so far.
    pub fn minted(&self) -> f64 {
        self.minted
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Sum of every account balance in every world.
    pub fn total_balance(store: &Store) -> WorldResult<f64> {
        let mut total = 0.0;
        for status in store.statuses()? {
            total += store.accounts(status.world_id)?.iter().map(|a| a.balance).sum::<f64>();
        }
        Ok(total)
    }

    /// Checks every invariant against the store. Returns the number of new
    /// violations found.
    pub fn check(&mut self, store: &Store, tick: u64) -> WorldResult<usize> {
        let before = self.violations.len();
        let mut granted = 0.0;

        for status in store.statuses()? {
            let world_id = status.world_id;

            match store.engine(status.engine_id)? {
                Some(engine) => {
                    let should_run = status.status == Status::Running;
                    if engine.running != should_run {
                        self.fail(
                            tick,
                            format!("world {} is {} but engine running={}", world_id, status.status, engine.running),
                        );
                    }
                    let prev = self.generations.insert(engine.id, engine.generation_number);
                    if prev.is_some_and(|g| engine.generation_number < g) {
                        self.fail(tick, format!("engine {} generation went backwards", engine.id));
                    }
                    if engine
                        .processed_input_number
                        .is_some_and(|done| done >= engine.next_input_number)
                    {
                        self.fail(tick, format!("engine {} processed unsubmitted input", engine.id));
                    }
                }
                None => self.fail(tick, format!("world {} has no engine", world_id)),
            }

            let prev = self.last_viewed.insert(world_id, status.last_viewed);
            if prev.is_some_and(|v| status.last_viewed < v) {
                self.fail(tick, format!("lastViewed of {} went backwards", world_id));
            }

            for account in store.accounts(world_id)? {
                if account.balance < 0.0 || !account.balance.is_finite() {
                    self.fail(tick, format!("{} has balance {}", account.player_id, account.balance));
                }
                let entries = store.ledger_entries(world_id, account.player_id)?;
                let history: f64 = entries.iter().map(|e| e.amount).sum();
                granted += entries
                    .iter()
                    .filter(|e| e.kind == EntryKind::Grant)
                    .map(|e| e.amount)
                    .sum::<f64>();
                if (history - account.balance).abs() > LEDGER_EPSILON {
                    self.fail(
                        tick,
                        format!(
                            "{} balance {} disagrees with ledger sum {}",
                            account.player_id, account.balance, history
                        ),
                    );
                }
            }
        }

        let total = Self::total_balance(store)?;
        let minted = self.minted + granted;
        if (total - minted).abs() > LEDGER_EPSILON {
            self.fail(
                tick,
                format!("total balance {} but {} was minted ({} granted)", total, minted, granted),
            );
        }

        Ok(self.violations.len() - before)
    }

    fn fail(&mut self, tick: u64, message: String) {
        tracing::error!("❌ Invariant violated at tick {}: {}", tick, message);
        self.violations.push(Violation { tick, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldkeeper_core::supervisor::create_world;
    use worldkeeper_core::{ledger, PlayerId};

    const T0: u64 = 1_704_067_200_000;

    fn setup() -> (Store, WorldId) {
        let store = Store::temporary().unwrap();
        let world_id = WorldId::from_seed(3);
        store
            .transact(T0, |tx| create_world(tx, world_id, EngineId::from_seed(3), true))
            .unwrap();
        (store, world_id)
    }

    #[test]
    fn test_clean_world_passes() {
        let (store, world_id) = setup();
        let mut oracle = Oracle::new();

        store
            .transact(T0, |tx| ledger::credit(tx, world_id, PlayerId(1), 5.0))
            .unwrap();
        oracle.record_credit(5.0);
        store
            .transact(T0, |tx| ledger::transfer_all(tx, world_id, PlayerId(1), PlayerId(2)))
            .unwrap();

        assert_eq!(oracle.check(&store, 0).unwrap(), 0);
        assert!(oracle.is_clean());
        assert_eq!(oracle.minted(), 5.0);
    }

    #[test]
    fn test_unrecorded_money_is_flagged() {
        let (store, world_id) = setup();
        let mut oracle = Oracle::new();

        store
            .transact(T0, |tx| ledger::credit(tx, world_id, PlayerId(1), 2.5))
            .unwrap();

        assert_eq!(oracle.check(&store, 4).unwrap(), 1);
        assert_eq!(oracle.violations()[0].tick, 4);
        assert!(oracle.violations()[0].message.contains("minted"));
    }

    #[test]
    fn test_join_grants_and_fees_conserve_money() {
        let (store, world_id) = setup();
        let mut oracle = Oracle::new();

        for player in [PlayerId(1), PlayerId(2)] {
            store
                .transact(T0, |tx| ledger::settle_join(tx, world_id, player, 10.0, 1.0))
                .unwrap();
        }
        store
            .transact(T0, |tx| ledger::transfer_all(tx, world_id, PlayerId(1), PlayerId(2)))
            .unwrap();

        assert_eq!(oracle.check(&store, 0).unwrap(), 0);
        assert_eq!(Oracle::total_balance(&store).unwrap(), 20.0);
        assert_eq!(store.account(world_id, ledger::TREASURY).unwrap().unwrap().balance, 2.0);
    }

    #[test]
    fn test_status_engine_mismatch_is_flagged() {
        let (store, world_id) = setup();
        let mut oracle = Oracle::new();

        store
            .transact(T0, |tx| {
                let mut status = tx.require_status(world_id)?;
                status.status = Status::Inactive;
                tx.put_status(&status)
            })
            .unwrap();

        assert_eq!(oracle.check(&store, 1).unwrap(), 1);
        assert!(oracle.violations()[0].message.contains("inactive"));
    }

    #[test]
    fn test_last_viewed_regression_is_flagged() {
        let (store, world_id) = setup();
        let mut oracle = Oracle::new();
        assert_eq!(oracle.check(&store, 0).unwrap(), 0);

        store
            .transact(T0, |tx| {
                let mut status = tx.require_status(world_id)?;
                status.last_viewed -= 1;
                tx.put_status(&status)
            })
            .unwrap();

        assert_eq!(oracle.check(&store, 1).unwrap(), 1);
    }
}
