//! Domain error types
//!
//! Story and job errors live in [`story`], failures of the generation
//! pipeline in [`generation`]. HTTP mapping happens in `server::error`.

pub mod generation;
pub mod story;

pub use generation::GenerationError;
pub use story::StoryError;
