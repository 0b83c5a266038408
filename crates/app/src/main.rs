mod api;
mod pages;
mod problem;
mod router;
mod seed;
mod telemetry;
mod views;

use std::net::SocketAddr;

use chrono::Utc;
use tracing::info;

use listings_storage::Database;
use listings_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    info!(stage = "storage", url = %config.database_url, "database ready");

    if let Some(path) = &config.seed_file {
        let report = seed::load_file(&database, path, Utc::now()).await?;
        info!(
            stage = "seed",
            path = %path.display(),
            created = report.created,
            skipped = report.skipped,
            rejected = report.rejected,
            "seed file applied"
        );
    }

    let state = router::AppState::new(metrics, database);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
