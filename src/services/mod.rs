pub mod story_jobs;
pub mod story_service;

pub use story_jobs::*;
pub use story_service::*;
