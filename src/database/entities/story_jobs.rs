use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StoryError;
use crate::story::JobStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "story_jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub job_id: String,
    pub session_id: String,
    pub theme: String,
    pub status: String,
    pub story_id: Option<i32>,
    pub error: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub completed_at: Option<ChronoDateTimeUtc>,
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
    pub fn get_status(&self) -> Result<JobStatus, StoryError> {
        self.status.parse()
    }

    pub fn is_terminal(&self) -> bool {
        self.get_status().map(JobStatus::is_terminal).unwrap_or(false)
    }
}
