//! Sled-backed state store.
//!
//! All records live in one sled tree under human-readable prefixed keys:
//!
//! ```text
//! world/<world>                          World
//! status/<world>                         WorldStatus
//! engine/<engine>                        Engine
//! desc/<world>                           WorldDescriptions
//! input/<engine>/<number:020>            InputRecord      (append-only)
//! account/<world>/<player:020>           Account
//! txn/<world>/<player:020>/<ts>/<seq>    LedgerEntry      (append-only)
//! joined/<world>/<player:020>            JoinSettlement
//! task/<due:020>/<id:020>                ScheduledTask
//! dead/<id:020>                          DeadTask
//! default_world                          WorldId of the default world
//! ```
//!
//! Keeping everything in one tree lets every handler run as a single sled
//! transaction. Zero-padded numbers make lexicographic key order match
//! numeric order, so input logs, ledger histories and the task queue are
//! read back in order by a plain prefix scan.

use crate::engine::EngineSignal;
use crate::error::{WorldError, WorldResult};
use crate::input::{InputId, InputRecord};
use crate::ledger::{Account, LedgerEntry};
use crate::model::{Engine, PlayerId, World, WorldDescriptions, WorldStatus};
use crate::scheduler::{DeadTask, ScheduledTask};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use std::cell::RefCell;
use std::path::Path;
use worldkeeper_env::{EngineId, WorldId};

const TREE_NAME: &str = "worldkeeper";

pub(crate) mod keys {
    use super::*;

    pub fn world(id: WorldId) -> String {
        format!("world/{}", id.key())
    }

    pub fn status(id: WorldId) -> String {
        format!("status/{}", id.key())
    }

    pub const STATUS_PREFIX: &str = "status/";

    pub const DEFAULT_WORLD: &str = "default_world";

    pub fn engine(id: EngineId) -> String {
        format!("engine/{}", id.key())
    }

    pub fn descriptions(id: WorldId) -> String {
        format!("desc/{}", id.key())
    }

    pub fn input_prefix(engine: EngineId) -> String {
        format!("input/{}/", engine.key())
    }

    pub fn input(id: InputId) -> String {
        format!("{}{:020}", input_prefix(id.engine_id), id.number)
    }

    pub fn account_prefix(world: WorldId) -> String {
        format!("account/{}/", world.key())
    }

    pub fn account(world: WorldId, player: PlayerId) -> String {
        format!("{}{:020}", account_prefix(world), player.0)
    }

    pub fn ledger_prefix(world: WorldId, player: PlayerId) -> String {
        format!("txn/{}/{:020}/", world.key(), player.0)
    }

    pub fn ledger_entry(world: WorldId, player: PlayerId, timestamp: u64, seq: u64) -> String {
        format!("{}{:020}/{:020}", ledger_prefix(world, player), timestamp, seq)
    }

    pub fn join_settlement(world: WorldId, player: PlayerId) -> String {
        format!("joined/{}/{:020}", world.key(), player.0)
    }

    pub const TASK_PREFIX: &str = "task/";

    pub fn task(due_ms: u64, id: u64) -> String {
        format!("{}{:020}/{:020}", TASK_PREFIX, due_ms, id)
    }

    pub const DEAD_PREFIX: &str = "dead/";

    pub fn dead(id: u64) -> String {
        format!("{}{:020}", DEAD_PREFIX, id)
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> WorldResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn encode<T: Serialize>(value: &T) -> WorldResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Handle to the persistent state. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    tree: sled::Tree,
}

impl Store {
    /// Open a persistent store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> WorldResult<Self> {
        let db = sled::open(path)
            .map_err(|e| WorldError::Storage(format!("Failed to open sled DB: {}", e)))?;
        Self::from_db(db)
    }

    /// Create a temporary store (tests and simulations)
    pub fn temporary() -> WorldResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config
            .open()
            .map_err(|e| WorldError::Storage(format!("Failed to open temp DB: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> WorldResult<Self> {
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { db, tree })
    }

    /// Runs `handler` as one atomic unit of work.
    ///
    /// `now` is the handler's logical time; it is fixed for every retry of
    /// the transaction. Signals queued by the handler are returned only once
    /// the transaction has committed.
    pub fn transact<T, F>(&self, now: u64, handler: F) -> WorldResult<(T, Vec<EngineSignal>)>
    where
        F: Fn(&StoreTx<'_>) -> WorldResult<T>,
    {
        let result = self.tree.transaction(|tree| {
            let tx = StoreTx::new(tree, now);
            match handler(&tx) {
                Ok(value) => Ok((value, tx.into_signals())),
                Err(WorldError::Conflict) => Err(ConflictableTransactionError::Conflict),
                Err(e) => Err(ConflictableTransactionError::Abort(e)),
            }
        });
        match result {
            Ok(committed) => Ok(committed),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    /// Flushes dirty pages to disk.
    pub fn flush(&self) -> WorldResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> WorldResult<Option<T>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> WorldResult<Vec<T>> {
        let mut out = Vec::new();
        for item in self.tree.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    pub fn world(&self, id: WorldId) -> WorldResult<Option<World>> {
        self.get(&keys::world(id))
    }

    pub fn status(&self, id: WorldId) -> WorldResult<Option<WorldStatus>> {
        self.get(&keys::status(id))
    }

    /// Id of the default world, if one was created.
    pub fn default_world(&self) -> WorldResult<Option<WorldId>> {
        self.get(keys::DEFAULT_WORLD)
    }

    /// Every world status, in key order.
    pub fn statuses(&self) -> WorldResult<Vec<WorldStatus>> {
        self.scan(keys::STATUS_PREFIX)
    }

    pub fn engine(&self, id: EngineId) -> WorldResult<Option<Engine>> {
        self.get(&keys::engine(id))
    }

    pub fn descriptions(&self, world: WorldId) -> WorldResult<Option<WorldDescriptions>> {
        self.get(&keys::descriptions(world))
    }

    pub fn input(&self, id: InputId) -> WorldResult<Option<InputRecord>> {
        self.get(&keys::input(id))
    }

    /// Inputs of `engine` numbered strictly after `after`, in submission
    /// order, at most `limit` of them.
    pub fn inputs_after(
        &self,
        engine: EngineId,
        after: Option<u64>,
        limit: usize,
    ) -> WorldResult<Vec<InputRecord>> {
        let prefix = keys::input_prefix(engine);
        let start = keys::input(InputId {
            engine_id: engine,
            number: after.map_or(0, |n| n + 1),
        });
        let mut out = Vec::new();
        for item in self.tree.range(start.into_bytes()..) {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) || out.len() >= limit {
                break;
            }
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    pub fn account(&self, world: WorldId, player: PlayerId) -> WorldResult<Option<Account>> {
        self.get(&keys::account(world, player))
    }

    /// Every account of a world, by player id.
    pub fn accounts(&self, world: WorldId) -> WorldResult<Vec<Account>> {
        self.scan(&keys::account_prefix(world))
    }

    /// A player's ledger history, oldest first.
    pub fn ledger_entries(&self, world: WorldId, player: PlayerId) -> WorldResult<Vec<LedgerEntry>> {
        self.scan(&keys::ledger_prefix(world, player))
    }

    /// Tasks due at or before `now`, earliest first.
    pub fn due_tasks(&self, now: u64, limit: usize) -> WorldResult<Vec<ScheduledTask>> {
        let mut out = Vec::new();
        for item in self.tree.scan_prefix(keys::TASK_PREFIX.as_bytes()) {
            let (_, value) = item?;
            let task: ScheduledTask = decode(&value)?;
            if task.due_ms > now || out.len() >= limit {
                break;
            }
            out.push(task);
        }
        Ok(out)
    }

    /// Due time of the earliest queued task.
    pub fn next_due(&self) -> WorldResult<Option<u64>> {
        match self.tree.scan_prefix(keys::TASK_PREFIX.as_bytes()).next() {
            Some(item) => {
                let (_, value) = item?;
                let task: ScheduledTask = decode(&value)?;
                Ok(Some(task.due_ms))
            }
            None => Ok(None),
        }
    }

    /// Every queued task, earliest first.
    pub fn pending_tasks(&self) -> WorldResult<Vec<ScheduledTask>> {
        self.scan(keys::TASK_PREFIX)
    }

    /// Tasks that exhausted their retry budget.
    pub fn dead_tasks(&self) -> WorldResult<Vec<DeadTask>> {
        self.scan(keys::DEAD_PREFIX)
    }
}

/// View of the store inside one transaction.
pub struct StoreTx<'a> {
    tree: &'a TransactionalTree,
    now: u64,
    signals: RefCell<Vec<EngineSignal>>,
}

impl<'a> StoreTx<'a> {
    fn new(tree: &'a TransactionalTree, now: u64) -> Self {
        Self {
            tree,
            now,
            signals: RefCell::new(Vec::new()),
        }
    }

    /// Logical time of this handler (epoch ms).
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Queues a signal for the simulation core, delivered after commit.
    pub fn signal(&self, signal: EngineSignal) {
        self.signals.borrow_mut().push(signal);
    }

    fn into_signals(self) -> Vec<EngineSignal> {
        self.signals.into_inner()
    }

    /// Monotonic id, unique across the store.
    pub fn generate_id(&self) -> WorldResult<u64> {
        Ok(self.tree.generate_id()?)
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, key: &str) -> WorldResult<Option<T>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn put<T: Serialize>(&self, key: &str, value: &T) -> WorldResult<()> {
        self.tree.insert(key.as_bytes().to_vec(), encode(value)?)?;
        Ok(())
    }

    pub(crate) fn remove(&self, key: &str) -> WorldResult<bool> {
        Ok(self.tree.remove(key.as_bytes().to_vec())?.is_some())
    }

    pub fn world(&self, id: WorldId) -> WorldResult<Option<World>> {
        self.get(&keys::world(id))
    }

    pub fn require_world(&self, id: WorldId) -> WorldResult<World> {
        self.world(id)?.ok_or_else(|| WorldError::not_found("world", id))
    }

    pub fn put_world(&self, world: &World) -> WorldResult<()> {
        self.put(&keys::world(world.id), world)
    }

    pub fn status(&self, id: WorldId) -> WorldResult<Option<WorldStatus>> {
        self.get(&keys::status(id))
    }

    pub fn require_status(&self, id: WorldId) -> WorldResult<WorldStatus> {
        self.status(id)?.ok_or_else(|| WorldError::not_found("world", id))
    }

    pub fn put_status(&self, status: &WorldStatus) -> WorldResult<()> {
        self.put(&keys::status(status.world_id), status)
    }

    pub fn default_world(&self) -> WorldResult<Option<WorldId>> {
        self.get(keys::DEFAULT_WORLD)
    }

    pub fn put_default_world(&self, id: WorldId) -> WorldResult<()> {
        self.put(keys::DEFAULT_WORLD, &id)
    }

    pub fn engine(&self, id: EngineId) -> WorldResult<Option<Engine>> {
        self.get(&keys::engine(id))
    }

    pub fn require_engine(&self, id: EngineId) -> WorldResult<Engine> {
        self.engine(id)?.ok_or_else(|| WorldError::not_found("engine", id))
    }

    pub fn put_engine(&self, engine: &Engine) -> WorldResult<()> {
        self.put(&keys::engine(engine.id), engine)
    }

    /// Descriptions of a world; an absent record reads as empty.
    pub fn descriptions(&self, world: WorldId) -> WorldResult<WorldDescriptions> {
        Ok(self.get(&keys::descriptions(world))?.unwrap_or_default())
    }

    pub fn put_descriptions(&self, world: WorldId, desc: &WorldDescriptions) -> WorldResult<()> {
        self.put(&keys::descriptions(world), desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn status(world: WorldId) -> WorldStatus {
        WorldStatus {
            world_id: world,
            engine_id: EngineId::from_seed(world.as_uuid().as_u128() as u64),
            is_default: false,
            status: Status::Running,
            last_viewed: 0,
        }
    }

    #[test]
    fn test_committed_writes_are_visible() {
        let store = Store::temporary().unwrap();
        let world = WorldId::from_seed(1);

        store
            .transact(10, |tx| tx.put_world(&World::new(world)))
            .unwrap();

        assert_eq!(store.world(world).unwrap(), Some(World::new(world)));
    }

    #[test]
    fn test_aborted_handler_writes_nothing() {
        let store = Store::temporary().unwrap();
        let world = WorldId::from_seed(1);

        let result: WorldResult<((), _)> = store.transact(10, |tx| {
            tx.put_world(&World::new(world))?;
            Err(WorldError::precondition("nope"))
        });

        assert_eq!(result.unwrap_err(), WorldError::precondition("nope"));
        assert_eq!(store.world(world).unwrap(), None);
    }

    #[test]
    fn test_signals_returned_after_commit() {
        let store = Store::temporary().unwrap();
        let engine = EngineId::from_seed(3);

        let ((), signals) = store
            .transact(10, |tx| {
                tx.signal(EngineSignal::Kicked { engine_id: engine, generation: 1 });
                Ok(())
            })
            .unwrap();

        assert_eq!(signals.len(), 1);
    }

    #[test]
    fn test_statuses_scan_all_worlds() {
        let store = Store::temporary().unwrap();
        let a = WorldId::from_seed(1);
        let b = WorldId::from_seed(2);

        store
            .transact(0, |tx| {
                tx.put_status(&status(a))?;
                tx.put_status(&status(b))
            })
            .unwrap();

        let all = store.statuses().unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_require_missing_engine_is_not_found() {
        let store = Store::temporary().unwrap();
        let engine = EngineId::from_seed(9);

        let err = store.transact(0, |tx| tx.require_engine(engine)).unwrap_err();
        assert!(matches!(err, WorldError::NotFound { kind: "engine", .. }));
    }
}
