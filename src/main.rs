//! SUAS Interop - competition interop server
//!
//! Reports the stationary obstacles of the active mission to logged-in
//! aircraft and ground-station clients.

use sqlx::sqlite::SqlitePoolOptions;
use tokio::net::TcpListener;

mod api;
mod auth;
mod config;
mod domain;
mod error;
mod logging;
mod storage;

use crate::api::build_router;
use crate::auth::SessionManager;
use crate::config::Config;
use crate::domain::User;
use crate::storage::InteropRepository;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database repository.
    pub repository: InteropRepository,
    /// Issues and validates session tokens.
    pub sessions: SessionManager,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is expected in production
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    // Logging is itself configured, so a load failure goes to stderr via anyhow.
    let config = Config::load().map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    logging::init(&config.logging);

    tracing::info!("Starting SUAS Interop v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        database = %config.database.url,
        configured_users = config.auth.users.len(),
        "Configuration loaded"
    );

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            anyhow::anyhow!("Database connection error: {}", e)
        })?;

    let repository = InteropRepository::new(pool);
    repository.init_schema().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize database schema");
        anyhow::anyhow!("Schema initialization error: {}", e)
    })?;

    tracing::info!("Database connected and schema initialized");

    for configured in config.auth.users.clone() {
        let user = repository.upsert_user(&User::from(configured)).await?;
        tracing::info!(
            username = %user.username,
            is_superuser = user.is_superuser,
            "Configured user ready"
        );
    }

    match repository.get_active_mission().await? {
        Some(mission) => tracing::info!(
            mission_id = %mission.id,
            stationary_obstacles = mission.stationary_obstacles.len(),
            "Active mission loaded"
        ),
        None => tracing::warn!("No active mission - obstacle requests will fail until one is activated"),
    }

    let sessions = SessionManager::new(
        &config.auth.session_secret,
        config.auth.issuer.clone(),
        config.auth.session_duration_hours,
    );

    let state = AppState {
        repository,
        sessions,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
