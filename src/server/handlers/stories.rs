use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Json},
};
use tracing::debug;

use crate::errors::StoryError;
use crate::schema::{CompleteStoryResponse, CreateStoryRequest, StoryJobResponse};
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::{session_cookie, session_or_new};

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/stories/create",
    request_body = CreateStoryRequest,
    responses(
        (status = 200, description = "Generation job created", body = StoryJobResponse),
        (status = 422, description = "Malformed request body")
    )
))]
pub async fn create_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateStoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let theme = request.validated_theme().map_err(ApiError::Validation)?;

    let (session_id, fresh) = session_or_new(&headers);
    if fresh {
        debug!("New session {}", session_id);
    }

    let handle = state.jobs.submit(&session_id, &theme).await?;
    let response = StoryJobResponse::try_from(handle.job)?;

    Ok((
        [(header::SET_COOKIE, session_cookie(&session_id))],
        Json(response),
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/stories/{story_id}/complete",
    params(
        ("story_id" = i64, Path, description = "Story ID")
    ),
    responses(
        (status = 200, description = "Story with all of its nodes", body = CompleteStoryResponse),
        (status = 404, description = "Story not found")
    )
))]
pub async fn get_complete_story(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<CompleteStoryResponse>, ApiError> {
    let Path(raw_id) = path?;
    // Ids outside the column range cannot exist.
    let story_id = i32::try_from(raw_id).map_err(|_| StoryError::StoryNotFound(raw_id))?;
    let story = state.stories.get_complete_story(story_id).await?;
    Ok(Json(story))
}
