use std::sync::Arc;

use clap::Parser;
use safekeeper::config::{Cli, Settings};
use safekeeper::http::auth::AuthConfig;
use safekeeper::http::{self, AppState};
use sk_core::{Engine, EngineConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Cli::parse().resolve()?;
    tracing::info!(replica_id = %settings.replica_id, port = settings.port, "starting safekeeper");

    let engine = open_engine(&settings).await?;

    let cancel = CancellationToken::new();
    engine.spawn_consensus_tasks(cancel.clone());

    let state = AppState {
        engine: engine.clone(),
        auth: AuthConfig { api_key: settings.api_key.clone(), auth_tokens: settings.auth_tokens.clone() },
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port)).await?;
    tracing::info!(port = settings.port, "listening");

    let serve = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal(cancel.clone()));
    serve.await?;

    cancel.cancel();
    Ok(())
}

async fn open_engine(settings: &Settings) -> anyhow::Result<Arc<Engine>> {
    let config = EngineConfig {
        replica_id: settings.replica_id.clone(),
        wal_dir: settings.data_dir.join("wal"),
        backup_dir: settings.backup_dir.clone(),
        peers: settings.peers.clone(),
        compression_enabled: settings.compression,
        quorum_timeout: settings.quorum_timeout,
        election: Default::default(),
    };
    Ok(Engine::open(config).await?)
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
    cancel.cancel();
}
