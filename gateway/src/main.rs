//! Entrant gateway HTTP server and sync scheduler.

use anyhow::Context;
use entrant_gateway::Config;
use entrant_gateway_acsm::ChampionshipFile;
use entrant_gateway_auth::{EventixOAuthProvider, TokenStore};
use entrant_gateway_core::{EntrantProjector, SystemClock};
use entrant_gateway_eventix::EventixClient;
use entrant_gateway_runtime::metrics::install_recorder;
use entrant_gateway_runtime::{
    OrchestratorConfig, SyncHandle, SyncOrchestrator, run_trigger_loop, spawn_scheduler,
};
use entrant_gateway_web::{AppState, router};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entrant_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting entrant gateway");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        event_id = %config.event_id,
        championship_file = %config.championship_file.display(),
        mapped_ticket_types = config.mapping.len(),
        sync_interval_secs = config.sync_interval.as_secs(),
        "Configuration loaded"
    );

    let metrics = if config.metrics_enabled {
        Some(install_recorder().context("Failed to install metrics recorder")?)
    } else {
        None
    };

    let provider = EventixOAuthProvider::new(&config.oauth).context("Invalid OAuth2 configuration")?;
    let tokens = Arc::new(
        TokenStore::new(provider, SystemClock)
            .with_timeout(config.oauth.timeout)
            .with_refresh_margin(config.oauth.refresh_margin),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let orchestrator = Arc::new(
        SyncOrchestrator::new(
            OrchestratorConfig::new(config.event_id.clone()),
            Arc::clone(&tokens),
            EventixClient::new(config.eventix.clone()),
            ChampionshipFile::new(&config.championship_file).with_backup(config.keep_backup),
            EntrantProjector::new(config.metadata.clone()),
            config.mapping.clone(),
            SystemClock,
        )
        .with_shutdown(shutdown_rx.clone()),
    );

    let (handle, triggers) = SyncHandle::channel();
    let trigger_loop = run_trigger_loop(Arc::clone(&orchestrator), triggers, shutdown_rx.clone());
    let scheduler = spawn_scheduler(handle.clone(), config.sync_interval, shutdown_rx);

    let mut state = AppState::new(orchestrator, Arc::clone(&tokens), handle);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    let listener = tokio::net::TcpListener::bind(config.listen_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_address))?;
    info!(address = %config.listen_address, "Server listening");

    if !tokens.is_authorized().await {
        warn!("Not authorized with the ticketing platform yet; visit /oauth2/authorize");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_tx.send_replace(true);
        })
        .await
        .context("HTTP server failed")?;

    scheduler.await.context("Scheduler task failed")?;
    trigger_loop.await.context("Trigger loop task failed")?;

    info!("Gateway stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
