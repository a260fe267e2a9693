//! The long-running service: scheduler, core stepping, sweeps, the optional
//! keep-alive and the control socket, all on one task.

use crate::control::serve_control;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use worldkeeper_core::{WorldKeeper, WorldResult};
use worldkeeper_env::WorldContext;
use worldkeeper_sim::SimEngine;

/// Periods of the service's background loops.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Simulation core step period
    pub tick: Duration,

    /// Period of the idle and dead-engine sweeps
    pub sweep: Duration,

    /// Heartbeat the default world on this period, standing in for an
    /// observer. `None` leaves liveness to control clients.
    pub keep_alive: Option<Duration>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            sweep: Duration::from_secs(60),
            keep_alive: None,
        }
    }
}

/// Serves until `shutdown` resolves, creating the default world first if
/// the store has none.
pub async fn serve<C, S>(
    keeper: &WorldKeeper<C>,
    engine: &SimEngine,
    options: &ServeOptions,
    control: Option<TcpListener>,
    shutdown: S,
) -> WorldResult<()>
where
    C: WorldContext,
    S: Future<Output = ()>,
{
    let status = match keeper.default_world_status()? {
        Some(status) => status,
        None => keeper.create_world(true)?,
    };
    info!("🌍 Default world {} is {}", status.world_id, status.status);

    let keep_alive = async {
        match options.keep_alive {
            Some(period) => run_keep_alive(keeper, period).await,
            None => std::future::pending().await,
        }
    };
    let control = async {
        match control {
            Some(listener) => serve_control(listener, keeper).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = keeper.run_scheduler() => {}
        _ = run_core(keeper, engine, options.tick) => {}
        _ = run_sweeps(keeper, options.sweep) => {}
        _ = keep_alive => {}
        _ = control => {}
        _ = shutdown => info!("Shutting down"),
    }

    keeper.store().flush()
}

/// Steps the in-process simulation core on a fixed period.
async fn run_core<C: WorldContext>(keeper: &WorldKeeper<C>, engine: &SimEngine, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    let dt_ms = tick.as_millis() as u64;
    loop {
        interval.tick().await;
        let now = keeper.context().now_ms();
        if let Err(e) = engine.step(keeper.store(), now, dt_ms) {
            error!("Core step failed: {}", e);
        }
    }
}

/// Stops idle worlds and kicks dead engines on a fixed period.
///
/// Engines left running by a previous process have no run loop here; the
/// dead-engine sweep picks them up once their clock is stale.
async fn run_sweeps<C: WorldContext>(keeper: &WorldKeeper<C>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match keeper.stop_inactive_worlds() {
            Ok(0) => {}
            Ok(n) => info!("Stopped {} idle world(s)", n),
            Err(e) => error!("Idle sweep failed: {}", e),
        }
        match keeper.restart_dead_worlds() {
            Ok(0) => {}
            Ok(n) => warn!("Kicked {} dead engine(s)", n),
            Err(e) => error!("Dead-engine sweep failed: {}", e),
        }
    }
}

/// Heartbeats the default world on a fixed period.
async fn run_keep_alive<C: WorldContext>(keeper: &WorldKeeper<C>, period: Duration) {
    info!("💓 Keeping the default world alive every {:?}", period);
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let result = keeper
            .default_world_status()
            .and_then(|status| match status {
                Some(status) => keeper.heartbeat_world(status.world_id).map(Some),
                None => Ok(None),
            });
        if let Err(e) = result {
            error!("Keep-alive heartbeat failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{request, ControlRequest, ControlResponse};
    use std::sync::Arc;
    use worldkeeper_core::{SimulationCore, Status, Store, WorldConfig};
    use worldkeeper_env::TokioContext;

    /// Idle timeout far below the serve window so an unobserved world is
    /// certainly swept.
    fn fast_config() -> WorldConfig {
        WorldConfig {
            idle_timeout_ms: 400,
            heartbeat_interval_ms: 100,
            scheduler_poll_interval_ms: 20,
            ..WorldConfig::default()
        }
    }

    fn fast_options(keep_alive: Option<Duration>) -> ServeOptions {
        ServeOptions {
            tick: Duration::from_millis(20),
            sweep: Duration::from_millis(50),
            keep_alive,
        }
    }

    fn keeper(engine: &Arc<SimEngine>) -> WorldKeeper<TokioContext> {
        let core: Arc<dyn SimulationCore> = engine.clone();
        WorldKeeper::new(TokioContext::shared(), Store::temporary().unwrap(), fast_config(), core)
    }

    #[tokio::test]
    async fn test_keep_alive_holds_world_past_idle_timeout() {
        let engine = Arc::new(SimEngine::new(fast_config().roster));
        let keeper = keeper(&engine);
        let options = fast_options(Some(Duration::from_millis(50)));

        serve(&keeper, &engine, &options, None, tokio::time::sleep(Duration::from_millis(1_200)))
            .await
            .unwrap();

        let state = keeper.world_state(keeper.default_world_status().unwrap().unwrap().world_id).unwrap();
        assert_eq!(state.status.status, Status::Running);
        // Never stopped and restarted along the way.
        assert_eq!(state.engine.generation_number, 1);
    }

    #[tokio::test]
    async fn test_unobserved_world_goes_inactive() {
        let engine = Arc::new(SimEngine::new(fast_config().roster));
        let keeper = keeper(&engine);

        serve(&keeper, &engine, &fast_options(None), None, tokio::time::sleep(Duration::from_millis(1_200)))
            .await
            .unwrap();

        let status = keeper.default_world_status().unwrap().unwrap();
        assert_eq!(status.status, Status::Inactive);
    }

    #[tokio::test]
    async fn test_control_heartbeat_revives_running_daemon_world() {
        let engine = Arc::new(SimEngine::new(fast_config().roster));
        let keeper = keeper(&engine);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

        let client = async {
            // Let the idle sweep stop the world first.
            tokio::time::sleep(Duration::from_millis(700)).await;
            let before = request(addr, &ControlRequest::Status).await.unwrap();
            let revived = request(addr, &ControlRequest::Heartbeat).await.unwrap();
            tokio::time::sleep(Duration::from_millis(150)).await;
            let after = request(addr, &ControlRequest::Status).await.unwrap();
            let stopped = request(addr, &ControlRequest::Stop).await.unwrap();
            let _ = done_tx.send(());
            (before, revived, after, stopped)
        };
        let shutdown = async {
            let _ = done_rx.await;
        };

        let options = fast_options(None);
        let (served, (before, revived, after, stopped)) = tokio::join!(
            serve(&keeper, &engine, &options, Some(listener), shutdown),
            client
        );
        served.unwrap();

        let ControlResponse::Worlds { worlds, .. } = before else {
            panic!("status answered {:?}", before);
        };
        assert_eq!(worlds[0].status.status, Status::Inactive);
        assert!(matches!(revived, ControlResponse::World { .. }));
        let ControlResponse::Worlds { worlds, .. } = after else {
            panic!("status answered {:?}", after);
        };
        assert_eq!(worlds[0].status.status, Status::Running);
        assert!(worlds[0].engine_running);
        let ControlResponse::World { status } = stopped else {
            panic!("stop answered {:?}", stopped);
        };
        assert_eq!(status.status, Status::StoppedByDeveloper);
    }
}
