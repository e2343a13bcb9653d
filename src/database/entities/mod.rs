pub mod stories;
pub mod story_jobs;
pub mod story_nodes;
