mod cli;

use clap::Parser;
use dotenvy::dotenv;
use pharmacy_frontend::config::get_configuration;
use pharmacy_frontend::models::SessionEvent;
use pharmacy_frontend::services::credential_store::FileCredentialStore;
use pharmacy_frontend::AppState;
use service_core::observability::init_tracing;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = cli::Cli::parse();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "pharmacy-frontend",
        &configuration.logging.level,
        configuration.logging.json,
        configuration.logging.otlp_endpoint.as_deref(),
    )?;

    let credentials = FileCredentialStore::open(&configuration.storage.path).map_err(|e| {
        tracing::error!(
            "Failed to open session store {}: {}",
            configuration.storage.path.display(),
            e
        );
        anyhow::anyhow!("Session store error: {}", e)
    })?;

    let state = AppState::new(&configuration.api, Arc::new(credentials))?;
    let mut events = state.subscribe();

    let result = cli::run(cli.command, &state).await;

    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::Expired {
            eprintln!("Session expired, please log in again ({})", event.redirect());
        }
    }

    result
}
