// SWIFT Code Registry - Web Server
//
// Startup sequence: open store → one-time import if empty → serve.

use anyhow::{Context, Result};
use swift_registry::api::{build_router, AppState};
use swift_registry::{
    init_tracing, run_startup_import, Config, ImportOutcome, Registry, SqliteStore, ACTOR_IMPORTER,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env();
    tracing::info!(db = %config.db_path.display(), "Opening SWIFT code database");

    let store = SqliteStore::open(&config.db_path)?;

    // Explicit startup step; the store's own count decides whether it runs
    match &config.import_path {
        Some(path) => match run_startup_import(&store, path, ACTOR_IMPORTER) {
            ImportOutcome::Imported(report) => {
                tracing::info!(inserted = report.inserted, "Startup import finished")
            }
            ImportOutcome::Skipped { existing } => {
                tracing::info!(existing, "Startup import not needed")
            }
            ImportOutcome::Failed { reason } => {
                tracing::warn!(%reason, "Continuing without imported data")
            }
        },
        None => tracing::info!("SWIFT_IMPORT_PATH not set, skipping startup import"),
    }

    let state = AppState::new(Registry::new(store));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "swift-server listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
