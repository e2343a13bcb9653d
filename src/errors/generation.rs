//! Errors raised while producing a story for a job
//!
//! Every variant ends up as the `error` column of a failed job, so the
//! display strings are written for the person polling that job.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    /// The LLM endpoint could not be reached or answered with an error status
    #[error("LLM request failed: {0}")]
    Request(String),

    /// The LLM answered but the body did not contain a usable story
    #[error("LLM returned an unusable response: {0}")]
    InvalidResponse(String),

    /// The generated story breaks a structural rule
    #[error("Generated story is invalid: {0}")]
    InvalidStory(String),

    /// Theme rejected before generation started
    #[error("Invalid theme: {0}")]
    InvalidTheme(String),

    /// Generation did not finish in time
    #[error("story generation timed out after {0}s")]
    Timeout(u64),

    /// Writing the story failed
    #[error("Failed to store story: {0}")]
    Storage(#[from] sea_orm::DbErr),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Request(err.to_string())
    }
}
