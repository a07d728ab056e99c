//! `DuetServer` builder and server loop.
//!
//! This is the entry point for running a relay. It ties together all the
//! layers: transport → protocol → registry/rooms → reaper.

use std::sync::Arc;
use std::time::Duration;

use duet_protocol::{Codec, JsonCodec};
use duet_room::{RoomConfig, RoomManager, spawn_reaper};
use duet_transport::{Transport, WebSocketTransport};
use tokio::sync::watch;

use crate::DuetError;
use crate::handler::handle_connection;

/// How long a connection may stay silent before it is dropped. Longer than
/// the client heartbeat period.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// How long an accepted socket has to finish the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Arc<RoomManager>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,no_run
/// use duet::prelude::*;
///
/// # async fn run() -> Result<(), DuetError> {
/// let server = DuetServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct DuetServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    idle_timeout: Duration,
    handshake_timeout: Duration,
}

impl DuetServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            room_config: RoomConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration (sweep period, code attempts).
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how long a silent connection is kept.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets how long a new socket may take to complete the WebSocket
    /// upgrade before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<DuetServer<JsonCodec>, DuetError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: Arc::new(RoomManager::new(self.room_config)),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
            handshake_timeout: self.handshake_timeout,
        });

        Ok(DuetServer { transport, state })
    }
}

impl Default for DuetServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct DuetServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl DuetServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> DuetServerBuilder {
        DuetServerBuilder::new()
    }
}

impl<C: Codec> DuetServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The room manager behind this server.
    pub fn rooms(&self) -> Arc<RoomManager> {
        Arc::clone(&self.state.rooms)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), DuetError> {
        let (_keep_open, shutdown) = watch::channel(false);
        self.run_until(shutdown).await
    }

    /// Runs the accept loop and the reaper until `shutdown` becomes `true`
    /// (or its sender is dropped).
    ///
    /// On shutdown the listener is dropped and the reaper is stopped.
    /// Connections already accepted keep their own tasks.
    pub async fn run_until(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), DuetError> {
        let rooms = Arc::clone(&self.state.rooms);
        let reaper = spawn_reaper(
            Arc::clone(&rooms),
            rooms.config().sweep_interval,
            shutdown.clone(),
        );

        tracing::info!("duet relay running");

        while !*shutdown.borrow() {
            tokio::select! {
                // Only the TCP accept runs here; the upgrade happens on the
                // connection's own task so a stalled peer holds up nobody.
                accepted = self.transport.accept() => match accepted {
                    Ok(incoming) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(incoming, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.transport.shutdown().await?;
        drop(self.transport);
        if let Err(e) = reaper.await {
            tracing::warn!(error = %e, "reaper task failed");
        }

        tracing::info!("duet relay stopped");
        Ok(())
    }
}
