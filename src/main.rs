use anyhow::{Context, Result};
use tracing::info;
use trello_bridge::api::{cors_layer, create_router, AppState};
use trello_bridge::credentials::{run_credential_sweep, CredentialStore};
use trello_bridge::oauth::{OAuthFlowController, OAuthProvider};
use trello_bridge::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trello_bridge=info".into()),
        )
        .init();

    info!("Trello bridge starting...");

    let config = trello_bridge::config::from_env().context("Invalid configuration")?;
    info!(
        port = config.server.port,
        callback_url = %config.trello.callback_url,
        app_home_url = %config.server.app_home_url,
        upstream_timeout_seconds = config.upstream.timeout_seconds,
        "Configuration loaded"
    );

    let store = CredentialStore::new(config.credentials.ttls());
    let upstream = UpstreamClient::new(config.upstream.timeout())?;
    let controller = OAuthFlowController::new(
        OAuthProvider::from(&config.trello),
        store.clone(),
        upstream,
    );

    // Evict abandoned request tokens, stale handoff codes and expired sessions
    let sweep_handle = tokio::spawn(run_credential_sweep(
        store,
        config.credentials.sweep_interval_seconds,
    ));

    let state = AppState {
        controller,
        app_home_url: config.server.app_home_url.clone(),
        api_base_url: config.trello.api_base_url.clone(),
        session_ttl_seconds: config.credentials.session_ttl_seconds,
    };
    let router = create_router(state).layer(cors_layer(&config.server.cors_origin)?);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port))
        .await
        .context("Failed to bind API port")?;
    info!(port = config.server.port, "API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    sweep_handle.abort();
    info!("Trello bridge stopped");

    Ok(())
}
