//! Story domain: job state machine, generated story model, tree assembly

pub mod generated;
pub mod status;
pub mod tree;

pub use generated::{FlatNode, GeneratedNode, GeneratedOption, GeneratedStory};
pub use status::JobStatus;
pub use tree::assemble_story_tree;
