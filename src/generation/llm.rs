use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::StoryGenerator;
use crate::errors::GenerationError;
use crate::story::GeneratedStory;

const SYSTEM_PROMPT: &str = r#"You are a creative story writer that creates engaging choose-your-own-adventure stories.
Generate a complete branching story with multiple paths and endings in the JSON format described below.

The story should have:
1. A compelling title
2. A starting situation (root node) with 2-3 options
3. Each option should lead to another node with its own options
4. Some paths should lead to endings (both winning and losing)
5. At least one path should lead to a winning ending

Story structure requirements:
- Each node should have 2-3 options except for ending nodes
- The story should be 3-4 levels deep (including root node)
- Add variety in the path lengths (some end earlier, some later)
- Make sure there is at least one winning path

Output your story in exactly this JSON structure, with no surrounding text:
{
  "title": "Story Title",
  "root_node": {
    "content": "The starting situation of the story",
    "is_ending": false,
    "is_winning_ending": false,
    "options": [
      {
        "text": "Option 1 text",
        "next_node": {
          "content": "What happens for option 1",
          "is_ending": false,
          "is_winning_ending": false,
          "options": []
        }
      }
    ]
  }
}

Ending nodes have is_ending true and an empty options list. Only ending nodes may have is_winning_ending true."#;

/// Generator backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiStoryGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiStoryGenerator {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StoryGenerator for OpenAiStoryGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, theme: &str) -> Result<GeneratedStory, GenerationError> {
        let user_prompt = format!("Create the story with this theme: {}", theme);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.8,
        };

        debug!("Requesting story from {} (model {})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Request(format!(
                "{} returned {}: {}",
                self.endpoint,
                status,
                truncate(&body, 300)
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("response has no content".into()))?;

        let story = parse_story(&content)?;
        story.validate()?;
        Ok(story)
    }
}

/// Parses the model output, tolerating a surrounding markdown code fence.
pub fn parse_story(content: &str) -> Result<GeneratedStory, GenerationError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(json.trim()).map_err(|e| GenerationError::InvalidResponse(e.to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
