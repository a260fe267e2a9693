//! Local control protocol: one JSON request per line, one JSON response
//! per line, over a loopback TCP socket.
//!
//! The same [`dispatch`] serves requests arriving at a running daemon and
//! requests run directly against the store while no daemon holds it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};
use worldkeeper_core::{
    Encounter, Identity, InputId, JoinOutcome, PlayerId, WorldError, WorldKeeper, WorldResult, WorldStatus,
};
use worldkeeper_env::WorldContext;

/// Default address of the control socket.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:7878";

/// A client connection that stays silent this long is dropped.
const CLIENT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlRequest {
    /// Lifecycle state of every world
    Status,
    /// Keep-alive for the default world
    Heartbeat,
    Stop,
    Resume,
    /// Start the configured encounter in the default world
    Trigger,
    Join {
        token: String,
        #[serde(default)]
        name: Option<String>,
    },
    Leave {
        token: String,
    },
    /// Raw input for the default world's engine
    Send {
        name: String,
        #[serde(default)]
        args: serde_json::Value,
    },
}

/// One world as reported by [`ControlRequest::Status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSummary {
    pub status: WorldStatus,
    pub engine_running: bool,
    pub generation: u64,
    pub current_time: Option<u64>,
    pub processed_input: Option<u64>,
    pub players: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlResponse {
    Worlds {
        worlds: Vec<WorldSummary>,
        dead_tasks: usize,
    },
    World {
        status: WorldStatus,
    },
    Encounter {
        encounter: Encounter,
    },
    Joining {
        input: InputId,
    },
    AlreadyPresent {
        player: PlayerId,
    },
    Left {
        input: Option<InputId>,
    },
    Submitted {
        input: InputId,
    },
    Error {
        message: String,
    },
}

fn default_world<C: WorldContext>(keeper: &WorldKeeper<C>) -> WorldResult<WorldStatus> {
    keeper
        .default_world_status()?
        .ok_or_else(|| WorldError::not_found("world", "default"))
}

fn identity(token: String, name: Option<String>) -> Identity {
    let identity = Identity::new(token);
    match name {
        Some(name) => identity.with_name(name),
        None => identity,
    }
}

fn run<C: WorldContext>(keeper: &WorldKeeper<C>, request: ControlRequest) -> WorldResult<ControlResponse> {
    let response = match request {
        ControlRequest::Status => {
            let mut worlds = Vec::new();
            for status in keeper.store().statuses()? {
                let state = keeper.world_state(status.world_id)?;
                worlds.push(WorldSummary {
                    status,
                    engine_running: state.engine.running,
                    generation: state.engine.generation_number,
                    current_time: state.engine.current_time,
                    processed_input: state.engine.processed_input_number,
                    players: state.world.players.len(),
                });
            }
            let dead_tasks = keeper.store().dead_tasks()?.len();
            ControlResponse::Worlds { worlds, dead_tasks }
        }
        ControlRequest::Heartbeat => {
            let world_id = default_world(keeper)?.world_id;
            ControlResponse::World {
                status: keeper.heartbeat_world(world_id)?,
            }
        }
        ControlRequest::Stop => {
            let world_id = default_world(keeper)?.world_id;
            keeper.stop_by_developer(world_id)?;
            ControlResponse::World {
                status: default_world(keeper)?,
            }
        }
        ControlRequest::Resume => {
            let world_id = default_world(keeper)?.world_id;
            keeper.resume_by_developer(world_id)?;
            ControlResponse::World {
                status: default_world(keeper)?,
            }
        }
        ControlRequest::Trigger => {
            let world_id = default_world(keeper)?.world_id;
            ControlResponse::Encounter {
                encounter: keeper.trigger_encounter(world_id)?,
            }
        }
        ControlRequest::Join { token, name } => {
            let world_id = default_world(keeper)?.world_id;
            match keeper.join_world(world_id, Some(&identity(token, name)))? {
                JoinOutcome::Joining(input) => ControlResponse::Joining { input },
                JoinOutcome::AlreadyPresent(player) => ControlResponse::AlreadyPresent { player },
            }
        }
        ControlRequest::Leave { token } => {
            let world_id = default_world(keeper)?.world_id;
            ControlResponse::Left {
                input: keeper.leave_world(world_id, Some(&identity(token, None)))?,
            }
        }
        ControlRequest::Send { name, args } => {
            let engine_id = default_world(keeper)?.engine_id;
            ControlResponse::Submitted {
                input: keeper.send_input(engine_id, &name, args)?,
            }
        }
    };
    Ok(response)
}

/// Runs one request; failures become [`ControlResponse::Error`].
pub fn dispatch<C: WorldContext>(keeper: &WorldKeeper<C>, request: ControlRequest) -> ControlResponse {
    debug!("Control request {:?}", request);
    run(keeper, request).unwrap_or_else(|e| ControlResponse::Error { message: e.to_string() })
}

/// Accepts control connections until the future is dropped.
///
/// Connections are served one at a time; the keeper's handlers are short
/// store transactions.
pub async fn serve_control<C: WorldContext>(listener: TcpListener, keeper: &WorldKeeper<C>) {
    match listener.local_addr() {
        Ok(addr) => info!("🎛️  Control socket listening on {}", addr),
        Err(e) => warn!("Control socket has no local address: {}", e),
    }
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Control accept failed: {}", e);
                continue;
            }
        };
        debug!("Control connection from {}", peer);
        if let Err(e) = serve_connection(stream, keeper).await {
            warn!("Control connection {} failed: {}", peer, e);
        }
    }
}

async fn serve_connection<C: WorldContext>(stream: TcpStream, keeper: &WorldKeeper<C>) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = tokio::time::timeout(CLIENT_IDLE_TIMEOUT, lines.next_line()).await?? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ControlRequest>(&line) {
            Ok(request) => dispatch(keeper, request),
            Err(e) => ControlResponse::Error {
                message: format!("bad request: {}", e),
            },
        };
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
    }
    Ok(())
}

/// Sends one request to a running daemon and waits for its answer.
pub async fn request<A: ToSocketAddrs>(addr: A, request: &ControlRequest) -> anyhow::Result<ControlResponse> {
    let stream = TcpStream::connect(addr).await?;
    let (reader, mut writer) = stream.into_split();
    let mut out = serde_json::to_vec(request)?;
    out.push(b'\n');
    writer.write_all(&out).await?;
    let line = BufReader::new(reader)
        .lines()
        .next_line()
        .await?
        .ok_or_else(|| anyhow::anyhow!("daemon closed the connection without answering"))?;
    Ok(serde_json::from_str(&line)?)
}
