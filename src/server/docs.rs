use axum::{extract::State, response::Json};
use utoipa::OpenApi;

use crate::schema::{
    CompleteStoryResponse, CreateStoryRequest, EndingFlags, JobTimestamps, StoryHeader,
    StoryJobResponse, StoryNodeResponse, StoryOption,
};
use crate::server::app::AppState;
use crate::story::JobStatus;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Choose your own adventure",
        description = "Generate branching stories and play through them"
    ),
    paths(
        super::handlers::stories::create_story,
        super::handlers::stories::get_complete_story,
        super::handlers::jobs::get_job_status,
    ),
    components(schemas(
        CreateStoryRequest,
        StoryJobResponse,
        JobTimestamps,
        JobStatus,
        CompleteStoryResponse,
        StoryHeader,
        StoryNodeResponse,
        EndingFlags,
        StoryOption,
    )),
    tags(
        (name = "stories", description = "Story creation and retrieval"),
        (name = "jobs", description = "Generation job status")
    )
)]
pub struct ApiDoc;

/// Route paths are declared under `/api`.
const DECLARED_PREFIX: &str = "/api";

/// The API document with its paths moved under `prefix`.
pub fn api_doc(prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if prefix != DECLARED_PREFIX {
        let paths = std::mem::take(&mut doc.paths.paths);
        doc.paths.paths = paths
            .into_iter()
            .map(|(path, item)| match path.strip_prefix(DECLARED_PREFIX) {
                Some(rest) => (format!("{}{}", prefix, rest), item),
                None => (path, item),
            })
            .collect();
    }
    doc
}

pub async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    Json(api_doc(&state.settings.api_prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_prefix() {
        let doc = api_doc("/api");
        assert!(doc.paths.paths.contains_key("/api/stories/create"));

        let doc = api_doc("/v2");
        assert!(doc.paths.paths.contains_key("/v2/stories/create"));
        assert!(doc.paths.paths.contains_key("/v2/stories/{story_id}/complete"));
        assert!(doc.paths.paths.contains_key("/v2/jobs/{job_id}"));
        assert!(!doc.paths.paths.keys().any(|p| p.starts_with("/api/")));

        let doc = api_doc("");
        assert!(doc.paths.paths.contains_key("/jobs/{job_id}"));
    }
}
