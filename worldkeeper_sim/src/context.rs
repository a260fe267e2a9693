//! Virtual clock and seeded entropy for simulated runs.

use async_trait::async_trait;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use worldkeeper_env::WorldContext;

/// Wall-clock instant at which every simulated run starts (2024-01-01T00:00Z).
pub const SIM_START_MS: u64 = 1_704_067_200_000;

/// `WorldContext` whose clock moves only when the harness advances it or a
/// task sleeps, and whose entropy is a ChaCha8 stream keyed by the seed.
///
/// Two contexts built from the same seed hand the keeper identical
/// timestamps and identical world and engine ids.
pub struct SimContext {
    seed: u64,
    elapsed_ms: AtomicU64,
    entropy: Mutex<ChaCha8Rng>,
}

impl SimContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            elapsed_ms: AtomicU64::new(0),
            entropy: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Moves the clock forward; sub-millisecond remainders are dropped.
    pub fn advance_time(&self, by: Duration) {
        self.elapsed_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorldContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }

    fn system_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.now_ms())
    }

    fn now_ms(&self) -> u64 {
        SIM_START_MS + self.elapsed_ms.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
        tokio::task::yield_now().await;
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tracing::debug!("Spawning {} on the simulated clock", name);
        tokio::spawn(future);
    }

    fn random_u64(&self) -> u64 {
        self.entropy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_u64()
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
