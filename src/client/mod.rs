//! Terminal client for the story API
//!
//! Mirrors what a browser front end does: post a theme, poll the job on a
//! fixed interval, fetch the finished tree and walk it node by node.

pub mod play;

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{header, Client, StatusCode};
use tracing::{debug, info};

use crate::schema::{CompleteStoryResponse, CreateStoryRequest, StoryJobResponse};
use crate::story::JobStatus;

pub use play::{play_story, PlayOutcome};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_POLLS: usize = 120;

pub struct ApiClient {
    http: Client,
    api_base: String,
    session_cookie: Option<String>,
}

impl ApiClient {
    pub fn new(server_url: &str, api_prefix: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_base: format!("{}{}", server_url.trim_end_matches('/'), api_prefix),
            session_cookie: None,
        })
    }

    pub async fn create_story(&mut self, theme: &str) -> Result<StoryJobResponse> {
        let mut request = self
            .http
            .post(format!("{}/stories/create", self.api_base))
            .json(&CreateStoryRequest {
                theme: theme.to_string(),
            });
        if let Some(cookie) = &self.session_cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.context("failed to reach story server")?;
        if let Some(cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            self.session_cookie = Some(cookie.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("story creation failed with {}: {}", status, body));
        }
        Ok(response.json().await?)
    }

    /// `None` when the server does not know the job.
    pub async fn get_job(&self, job_id: &str) -> Result<Option<StoryJobResponse>> {
        let response = self
            .http
            .get(format!("{}/jobs/{}", self.api_base, job_id))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(anyhow!("job lookup failed with {}", status)),
        }
    }

    /// `None` when the server does not know the story.
    pub async fn get_story(&self, story_id: i32) -> Result<Option<CompleteStoryResponse>> {
        let response = self
            .http
            .get(format!("{}/stories/{}/complete", self.api_base, story_id))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(anyhow!("story lookup failed with {}", status)),
        }
    }

    /// Polls until the job reaches a terminal state.
    pub async fn wait_for_job(
        &self,
        job_id: &str,
        interval: Duration,
        max_polls: usize,
    ) -> Result<StoryJobResponse> {
        for attempt in 1..=max_polls {
            let job = self
                .get_job(job_id)
                .await?
                .ok_or_else(|| anyhow!("job {} not found", job_id))?;
            debug!("Poll {} for job {}: {}", attempt, job_id, job.status);

            if job.status.is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(interval).await;
        }
        Err(anyhow!(
            "job {} did not finish after {} polls",
            job_id,
            max_polls
        ))
    }
}

/// Full round trip: create, wait, fetch, play on stdin/stdout.
pub async fn run_play(
    server_url: &str,
    api_prefix: &str,
    theme: &str,
    poll_interval: Duration,
) -> Result<PlayOutcome> {
    let mut client = ApiClient::new(server_url, api_prefix)?;

    let job = client.create_story(theme).await?;
    info!("Story job {} is {}", job.job_id, job.status);

    let job = client
        .wait_for_job(&job.job_id, poll_interval, DEFAULT_MAX_POLLS)
        .await?;

    let story_id = match (job.status, job.story_id) {
        (JobStatus::Completed, Some(story_id)) => story_id,
        (JobStatus::Failed, _) => {
            return Err(anyhow!(
                "story generation failed: {}",
                job.error.unwrap_or_else(|| "unknown error".to_string())
            ))
        }
        (status, _) => return Err(anyhow!("job ended as {} without a story", status)),
    };

    let story = client
        .get_story(story_id)
        .await?
        .ok_or_else(|| anyhow!("story {} not found", story_id))?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    play_story(&story, stdin.lock(), stdout.lock())
}
