//! Server binary: reads configuration from the environment (and `.env`), opens the store,
//! and serves the API until Ctrl-C.

use library_records::{app, store, AppConfig, AppState, Telemetry};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let telemetry = Telemetry::init(&config.log_filter, config.error_log.as_deref())?;

    let store = store::open(config.database.as_ref()).await?;
    let state = AppState::new(store, config.api_tokens.clone(), config.paging);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    telemetry.flush()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
