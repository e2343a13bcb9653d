//! Story and story-job error types
//!
//! # Examples
//!
//! ```rust
//! use cyoa::errors::StoryError;
//!
//! let err = StoryError::StoryNotFound(7);
//! assert_eq!(err.to_string(), "Story 7 not found");
//! ```

use sea_orm::DbErr;
use thiserror::Error;

use crate::story::JobStatus;

#[derive(Error, Debug)]
pub enum StoryError {
    /// Story not found by id
    #[error("Story {0} not found")]
    StoryNotFound(i64),

    /// Job not found by its external token
    #[error("Job {0} not found")]
    JobNotFound(String),

    /// Stored story has no node flagged as root
    #[error("Story {0} has no root node")]
    MissingRoot(i32),

    /// Stored story has more than one node flagged as root
    #[error("Story {story_id} has {count} root nodes")]
    MultipleRoots {
        /// Story identifier
        story_id: i32,
        /// Number of root nodes found
        count: usize,
    },

    /// Rejected job status change
    #[error("Invalid job transition {from} -> {to}")]
    InvalidTransition {
        /// Status the job was in
        from: JobStatus,
        /// Status that was requested
        to: JobStatus,
    },

    /// Status string that is not part of the job state machine
    #[error("Unknown job status '{0}'")]
    UnknownStatus(String),

    /// Node options could not be decoded
    #[error("Invalid options on node {node_id}: {reason}")]
    InvalidOptions {
        /// Node identifier
        node_id: i32,
        /// Decoder message
        reason: String,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl StoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoryError::StoryNotFound(_) | StoryError::JobNotFound(_))
    }
}
