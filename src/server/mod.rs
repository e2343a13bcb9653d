pub mod app;
pub mod error;
pub mod handlers;
pub mod session;

#[cfg(feature = "openapi")]
pub mod docs;

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MigrateDirection {
    /// Apply every pending migration
    Up,
    /// Roll back the latest applied migration
    Down,
    /// Drop all tables and re-apply every migration
    Fresh,
    /// List applied and pending migrations
    Status,
}

use crate::config::Settings;
use crate::database::{connection::*, migrations::Migrator};
use crate::generation::generator_from_settings;
use crate::services::fail_interrupted_jobs;
use anyhow::{Context, Result};
use sea_orm_migration::prelude::*;
use tracing::{info, warn};

pub async fn start_server(settings: Settings) -> Result<()> {
    let db = establish_connection(&settings.database_url)
        .await
        .with_context(|| format!("failed to connect to {}", settings.database_url))?;

    setup_database(&db).await?;
    info!("Database migrations completed");

    fail_interrupted_jobs(&db).await?;

    let generator = generator_from_settings(&settings)?;
    let address = format!("{}:{}", settings.host, settings.port);
    let state = app::AppState::new(db, settings, generator);
    let app = app::create_app(state.clone())?;

    log_routes(&state.settings.api_prefix, &address);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes(prefix: &str, address: &str) {
    info!("API Endpoints on {}:", address);
    info!("  GET  /health                          - Health check");
    #[cfg(feature = "openapi")]
    info!("  GET  /api-docs/openapi.json           - OpenAPI document");
    info!("  POST {}/stories/create                - Request a new story", prefix);
    info!("  GET  {}/stories/:story_id/complete    - Full story tree", prefix);
    info!("  GET  {}/jobs/:job_id                  - Poll a generation job", prefix);
}

/// Applies `direction` to the schema behind `database_url`.
pub async fn migrate_database(database_url: &str, direction: MigrateDirection) -> Result<()> {
    let db = establish_connection(database_url)
        .await
        .with_context(|| format!("failed to connect to {}", database_url))?;

    let pending = Migrator::get_pending_migrations(&db).await?.len();
    match direction {
        MigrateDirection::Up if pending == 0 => info!("Schema already up to date"),
        MigrateDirection::Up => {
            Migrator::up(&db, None).await?;
            info!("Applied {} migration(s)", pending);
        }
        MigrateDirection::Down => {
            Migrator::down(&db, Some(1)).await?;
            info!("Rolled back the latest migration");
        }
        MigrateDirection::Fresh => {
            Migrator::fresh(&db).await?;
            warn!("Dropped every table and rebuilt the schema; all stories are gone");
        }
        MigrateDirection::Status => {
            Migrator::status(&db).await?;
            info!("{} migration(s) pending", pending);
        }
    }
    Ok(())
}
