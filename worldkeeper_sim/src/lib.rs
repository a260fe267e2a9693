//! Worldkeeper Deterministic Simulation Testing (DST) Harness
//!
//! This crate provides a controlled simulation environment where the
//! lifecycle supervisor, the durable scheduler and the encounter
//! choreographer run against a reference simulation core deterministically.
//!
//! # Core Principle: One Clock, One Seed
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Virtual clock advances only when the harness ticks
//! - **Randomness**: All entropy derived from a single 64-bit seed
//! - **Scheduling**: Due tasks are drained synchronously every tick
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (Virtual Clock + ChaCha8 entropy)         │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                        │                            │
//! │  ┌────▼────────┐  signals ┌────▼────┐                       │
//! │  │ WorldKeeper │─────────►│SimEngine│                       │
//! │  │ + scheduler │◄─────────│  (core) │                       │
//! │  └─────────────┘  store   └─────────┘                       │
//! │       ▲                        ▲                            │
//! │       │                        │                            │
//! │  ┌────┴────────────────────────┴────┐                       │
//! │  │            Oracle                │                       │
//! │  │  (Lifecycle + Ledger Invariants) │                       │
//! │  └──────────────────────────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use worldkeeper_sim::{SimWorld, SimConfig};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     ..Default::default()
//! };
//!
//! let mut world = SimWorld::new(config)?;
//! world.run_for(60.0)?;
//! assert!(world.oracle.is_clean());
//! ```

mod context;
mod engine;
mod oracle;
mod runner;
mod world;
pub mod scenarios;

pub use context::SimContext;
pub use engine::SimEngine;
pub use oracle::{Oracle, Violation};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, SimWorld};
