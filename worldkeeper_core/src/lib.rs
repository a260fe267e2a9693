//! Worldkeeper Core - World-Engine Lifecycle Supervisor
//!
//! Keeps long-running world simulations alive only while they are observed,
//! and feeds them work in a deterministic order:
//! 1. **Lifecycle Supervisor**: running / inactive / stoppedByDeveloper, idle
//!    shutdown and dead-engine kicks
//! 2. **Input Pipeline**: per-engine, totally ordered command log
//! 3. **Durable Scheduler**: delayed tasks stored next to the state they touch
//! 4. **Encounter Choreographer**: a self-rescheduling pursuit that ends in a
//!    ledger transfer
//!
//! All state lives in one sled tree; each handler is one sled transaction.

pub mod config;
pub mod encounter;
pub mod engine;
pub mod error;
pub mod input;
pub mod keeper;
pub mod ledger;
pub mod membership;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenience
pub use config::{AgentProfile, EncounterConfig, WorldConfig};
pub use encounter::Encounter;
pub use engine::{EngineSignal, NullCore, SimulationCore};
pub use error::{WorldError, WorldResult};
pub use input::{InputCommand, InputId, InputRecord, InputStatus};
pub use keeper::{WorldKeeper, WorldState};
pub use ledger::{Account, EntryKind, JoinSettlement, LedgerEntry, TREASURY};
pub use membership::{Identity, JoinOutcome};
pub use model::{Engine, Player, PlayerId, Position, Status, Tile, World, WorldDescriptions, WorldStatus};
pub use scheduler::{DeadTask, ScheduledTask, Task};
pub use store::{Store, StoreTx};
