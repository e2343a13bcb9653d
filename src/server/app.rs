use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health, jobs, stories};
use crate::config::Settings;
use crate::generation::StoryGenerator;
use crate::services::{StoryJobService, StoryService};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jobs: StoryJobService,
    pub stories: StoryService,
}

impl AppState {
    /// Builds the state and starts the job worker on the current runtime.
    pub fn new(
        db: DatabaseConnection,
        settings: Settings,
        generator: Arc<dyn StoryGenerator>,
    ) -> Self {
        let (jobs, _worker) = StoryJobService::start(db.clone(), generator, &settings);
        Self::with_job_service(db, settings, jobs)
    }

    /// Builds the state around an existing job service, for callers that
    /// run the worker themselves.
    pub fn with_job_service(db: DatabaseConnection, settings: Settings, jobs: StoryJobService) -> Self {
        Self {
            stories: StoryService::new(db),
            settings: Arc::new(settings),
            jobs,
        }
    }
}

pub fn create_app(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.settings.allowed_origins)?;
    let prefix = state.settings.api_prefix.clone();

    let mut app = Router::new().route("/health", get(health::health_check));

    #[cfg(feature = "openapi")]
    {
        app = app.route("/api-docs/openapi.json", get(super::docs::openapi_json));
    }

    app = if prefix.is_empty() {
        app.merge(api_routes())
    } else {
        app.nest(&prefix, api_routes())
    };

    let app = app
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Story routes
        .route("/stories/create", post(stories::create_story))
        .route("/stories/:story_id/complete", get(stories::get_complete_story))
        // Job routes
        .route("/jobs/:job_id", get(jobs::get_job_status))
}

/// `*` anywhere in the list allows any origin without credentials; an
/// explicit list allows credentials so the session cookie travels.
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if allowed_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_credentials(false));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow!("Invalid CORS origin {}: {}", origin, e))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
