use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::database::entities::{stories, story_nodes};
use crate::errors::StoryError;

/// One choice offered by a node. `node_id` points at the node the choice
/// leads to; a missing or unknown id is a dead end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StoryOption {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i32>,
}

/// Ending flags shared by stored and generated nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct EndingFlags {
    #[serde(default)]
    pub is_ending: bool,
    #[serde(default)]
    pub is_winning_ending: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StoryNodeResponse {
    pub id: i32,
    pub content: String,
    #[serde(flatten)]
    pub ending: EndingFlags,
    #[serde(default)]
    pub options: Vec<StoryOption>,
}

impl TryFrom<&story_nodes::Model> for StoryNodeResponse {
    type Error = StoryError;

    fn try_from(node: &story_nodes::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: node.id,
            content: node.content.clone(),
            ending: EndingFlags {
                is_ending: node.is_ending,
                is_winning_ending: node.is_winning_ending,
            },
            options: node.get_options()?,
        })
    }
}

/// Story header fields shared by every story shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StoryHeader {
    pub id: i32,
    pub title: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<stories::Model> for StoryHeader {
    fn from(story: stories::Model) -> Self {
        Self {
            id: story.id,
            title: story.title,
            session_id: story.session_id,
            created_at: story.created_at,
        }
    }
}

/// Body of `GET /stories/{story_id}/complete`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CompleteStoryResponse {
    #[serde(flatten)]
    pub story: StoryHeader,
    pub root_node: StoryNodeResponse,
    pub all_nodes: BTreeMap<i32, StoryNodeResponse>,
}
