use anyhow::{Context, Result};
use idea_inbox::service::{self, AppState};
use idea_inbox::{telemetry, Assistant, Config, Database};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _log_guard = telemetry::init_tracing(&config.log_level, config.log_dir.as_deref())?;

    info!("Idea Inbox v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::new(&config.database_path, config.reporting_zone())
        .with_context(|| format!("opening database {}", config.database_path.display()))?;

    let assistant = Assistant::new(
        db,
        Box::new(config.rate_limiter()),
        config.assistant_options(),
    );
    let app = service::router(AppState::new(assistant));

    info!("Starting HTTP server on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
