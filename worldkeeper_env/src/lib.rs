//! Worldkeeper Environment Abstraction Layer
//!
//! This crate provides the abstraction allowing the Worldkeeper supervisor,
//! scheduler and choreographer to run in both **Production** (tokio) and
//! **Simulation** (virtual clock) environments.
//!
//! # Core Concept
//!
//! Every source of non-determinism is intercepted:
//! - Time (`now()`, `now_ms()`, `sleep()`)
//! - Randomness (`random_u64()`)
//!
//! By deriving all entropy from a single 64-bit seed, any scheduling or
//! encounter bug becomes reproducible via its seed number.
//!
//! # Example
//!
//! ```ignore
//! use worldkeeper_env::WorldContext;
//!
//! async fn clock_loop<Ctx: WorldContext>(ctx: &Ctx) {
//!     loop {
//!         ctx.sleep(Duration::from_secs(30)).await;
//!         sweep(ctx.now_ms());
//!     }
//! }
//! ```

mod context;
mod types;
mod tokio_impl;

pub use context::WorldContext;
pub use types::{EngineId, WorldId};
pub use tokio_impl::TokioContext;
