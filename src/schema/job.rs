use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::database::entities::story_jobs;
use crate::errors::StoryError;
use crate::story::JobStatus;

pub const MAX_THEME_LENGTH: usize = 200;

/// Body of `POST /stories/create`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateStoryRequest {
    pub theme: String,
}

impl CreateStoryRequest {
    /// Returns the trimmed theme, or a message describing why it is unusable.
    pub fn validated_theme(&self) -> Result<String, String> {
        let theme = self.theme.trim();
        if theme.is_empty() {
            return Err("theme must not be empty".to_string());
        }
        if theme.chars().count() > MAX_THEME_LENGTH {
            return Err(format!(
                "theme must be at most {} characters",
                MAX_THEME_LENGTH
            ));
        }
        Ok(theme.to_string())
    }
}

/// Timestamps shared by every job shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct JobTimestamps {
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Job view returned by creation and by polling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StoryJobResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(flatten)]
    pub timestamps: JobTimestamps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TryFrom<story_jobs::Model> for StoryJobResponse {
    type Error = StoryError;

    fn try_from(job: story_jobs::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            status: job.get_status()?,
            job_id: job.job_id,
            timestamps: JobTimestamps {
                created_at: job.created_at,
                completed_at: job.completed_at,
            },
            story_id: job.story_id,
            error: job.error,
        })
    }
}
