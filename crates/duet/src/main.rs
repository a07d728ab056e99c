//! Duet relay server
//!
//! WebSocket relay for two-player browser games.

use std::time::Duration;

use clap::Parser;
use duet::DuetServer;
use duet_room::RoomConfig;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "duet-relay")]
#[command(version, about = "Duet relay server - rooms and message relay for two-player games")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Deployment label, reported in the startup log.
    #[arg(long = "env", env = "DUET_ENV", default_value = "development")]
    deploy_env: String,

    /// Seconds between sweeps for empty rooms.
    #[arg(long, env = "DUET_SWEEP_INTERVAL", default_value_t = 60)]
    sweep_interval: u64,

    /// Seconds a connection may stay silent before it is dropped.
    #[arg(long, env = "DUET_IDLE_TIMEOUT", default_value_t = 60)]
    idle_timeout: u64,

    /// Seconds a new socket has to complete the WebSocket upgrade.
    #[arg(long, env = "DUET_HANDSHAKE_TIMEOUT", default_value_t = 10)]
    handshake_timeout: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "duet=info,duet_room=info,duet_transport=info".into()),
    );
    if args.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let room_config = RoomConfig {
        sweep_interval: Duration::from_secs(args.sweep_interval),
        ..RoomConfig::default()
    };

    let server = DuetServer::builder()
        .bind(&format!("{}:{}", args.host, args.port))
        .room_config(room_config)
        .idle_timeout(Duration::from_secs(args.idle_timeout))
        .handshake_timeout(Duration::from_secs(args.handshake_timeout))
        .build()
        .await?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %server.local_addr()?,
        env = %args.deploy_env,
        "Starting duet-relay"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let serve = tokio::spawn(server.run_until(shutdown_rx));

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let sigterm_future = sigterm.recv();
    #[cfg(not(unix))]
    let sigterm_future = std::future::pending::<Option<()>>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C shutdown signal");
        }
        _ = sigterm_future => {
            info!("Received SIGTERM shutdown signal");
        }
    }

    let _ = shutdown_tx.send(true);
    serve.await??;

    info!("Relay stopped");
    Ok(())
}
