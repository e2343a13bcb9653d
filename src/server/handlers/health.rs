use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::server::app::AppState;

/// Liveness plus a round trip to the database; 503 when the database is gone.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, database) = match state.stories.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let body = json!({
        "status": if status == StatusCode::OK { "healthy" } else { "degraded" },
        "service": "cyoa-server",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    });
    (status, Json(body))
}
