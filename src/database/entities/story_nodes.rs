use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StoryError;
use crate::schema::StoryOption;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "story_nodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub story_id: i32,
    pub content: String,
    pub is_root: bool,
    pub is_ending: bool,
    pub is_winning_ending: bool,
    /// JSON array of `{text, node_id}` objects
    pub options: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stories::Entity",
        from = "Column::StoryId",
        to = "super::stories::Column::Id"
    )]
    Stories,
}

impl Related<super::stories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decodes the stored options. A `null` column reads as no options.
    pub fn get_options(&self) -> Result<Vec<StoryOption>, StoryError> {
        if self.options.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(self.options.clone()).map_err(|e| StoryError::InvalidOptions {
            node_id: self.id,
            reason: e.to_string(),
        })
    }
}

pub fn options_to_json(options: &[StoryOption]) -> Json {
    serde_json::to_value(options).unwrap_or_else(|_| Json::Array(Vec::new()))
}
