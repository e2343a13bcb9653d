use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::Json,
};

use crate::schema::StoryJobResponse;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/jobs/{job_id}",
    params(
        ("job_id" = String, Path, description = "Job token returned by story creation")
    ),
    responses(
        (status = 200, description = "Current job status", body = StoryJobResponse),
        (status = 404, description = "Job not found")
    )
))]
pub async fn get_job_status(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<StoryJobResponse>, ApiError> {
    let Path(job_id) = path?;
    let job = state.jobs.get_job(&job_id).await?;
    Ok(Json(StoryJobResponse::try_from(job)?))
}
