//! Story generators
//!
//! A generator turns a theme into a [`GeneratedStory`]. The LLM generator is
//! used when an API key is configured; otherwise the template generator keeps
//! the service usable offline.

pub mod llm;
pub mod template;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Settings;
use crate::errors::GenerationError;
use crate::story::GeneratedStory;

pub use llm::OpenAiStoryGenerator;
pub use template::TemplateStoryGenerator;

#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, theme: &str) -> Result<GeneratedStory, GenerationError>;
}

pub fn generator_from_settings(settings: &Settings) -> Result<Arc<dyn StoryGenerator>> {
    match &settings.openai_api_key {
        Some(api_key) => {
            info!(
                "Using LLM story generator (model {} at {})",
                settings.openai_model, settings.openai_base_url
            );
            Ok(Arc::new(OpenAiStoryGenerator::new(
                &settings.openai_base_url,
                api_key,
                &settings.openai_model,
                settings.generation_timeout,
            )?))
        }
        None => {
            warn!("OPENAI_API_KEY is not set, falling back to the template story generator");
            Ok(Arc::new(TemplateStoryGenerator))
        }
    }
}
