//! Request and response shapes for the HTTP API
//!
//! Field sets shared between several shapes are plain structs flattened into
//! the outer type, so each wire shape spells out exactly what it carries.

pub mod job;
pub mod story;

pub use job::*;
pub use story::*;
