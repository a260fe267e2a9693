//! Core environment context trait for Worldkeeper services.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the lifecycle supervisor,
/// the durable scheduler and the encounter choreographer can run in both
/// production (tokio) and deterministic simulation.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, `rand::random`
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// Every source of non-determinism a handler touches (wall clock, entropy)
/// goes through this trait. Handlers read `now_ms()` once and draw entropy
/// before opening a store transaction, so a replay with the same seed
/// produces the same store contents.
#[async_trait]
pub trait WorldContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time.
    ///
    /// In simulation, this is derived from virtual clock + epoch offset.
    fn system_time(&self) -> SystemTime;

    /// Returns the wall-clock time as milliseconds since the Unix epoch.
    ///
    /// All persisted timestamps (`lastViewed`, `currentTime`, task due
    /// times, ledger transactions) use this unit.
    fn now_ms(&self) -> u64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Draws 64 bits of entropy.
    ///
    /// Handlers that need randomness (relocation tiles, character picks)
    /// draw it here, outside the store transaction, and seed a local RNG
    /// with it so that a retried transaction makes the same choices.
    fn random_u64(&self) -> u64;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;
}
