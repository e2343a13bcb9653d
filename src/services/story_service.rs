use chrono::Utc;
use sea_orm::*;
use tracing::{debug, warn};

use crate::database::entities::{stories, story_nodes};
use crate::errors::StoryError;
use crate::schema::{CompleteStoryResponse, StoryOption};
use crate::story::{assemble_story_tree, GeneratedStory};

/// Reads and writes stories with their nodes.
#[derive(Clone)]
pub struct StoryService {
    db: DatabaseConnection,
}

impl StoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn ping(&self) -> Result<(), StoryError> {
        self.db.execute_unprepared("SELECT 1").await?;
        Ok(())
    }

    pub async fn get_story(&self, story_id: i32) -> Result<stories::Model, StoryError> {
        stories::Entity::find_by_id(story_id)
            .one(&self.db)
            .await?
            .ok_or(StoryError::StoryNotFound(story_id.into()))
    }

    /// Loads a story with every one of its nodes, indexed by node id.
    pub async fn get_complete_story(
        &self,
        story_id: i32,
    ) -> Result<CompleteStoryResponse, StoryError> {
        let story = self.get_story(story_id).await?;

        let nodes = story_nodes::Entity::find()
            .filter(story_nodes::Column::StoryId.eq(story_id))
            .order_by_asc(story_nodes::Column::Id)
            .all(&self.db)
            .await?;

        let tree = assemble_story_tree(story, nodes)?;

        let dangling = tree.dangling_references();
        if !dangling.is_empty() {
            warn!(
                "Story {} has {} option(s) without a resolvable target: {:?}",
                story_id,
                dangling.len(),
                dangling
            );
        }

        Ok(tree)
    }

    /// Removes a story and its nodes. Returns whether the story existed.
    pub async fn delete_story(&self, story_id: i32) -> Result<bool, StoryError> {
        let txn = self.db.begin().await?;
        story_nodes::Entity::delete_many()
            .filter(story_nodes::Column::StoryId.eq(story_id))
            .exec(&txn)
            .await?;
        let deleted = stories::Entity::delete_by_id(story_id).exec(&txn).await?;
        txn.commit().await?;
        Ok(deleted.rows_affected == 1)
    }

    /// Stores a generated story and all of its nodes in one transaction.
    ///
    /// Nodes are inserted in pre-order so the root gets the lowest id, then
    /// each branching node gets its options rewritten with the real ids.
    pub async fn save_generated_story(
        &self,
        session_id: &str,
        generated: &GeneratedStory,
    ) -> Result<stories::Model, StoryError> {
        let flat = generated.flatten();
        let txn = self.db.begin().await?;

        let story = stories::ActiveModel {
            title: Set(generated.title.trim().to_string()),
            session_id: Set(session_id.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut ids = Vec::with_capacity(flat.len());
        for (index, node) in flat.iter().enumerate() {
            let inserted = story_nodes::ActiveModel {
                story_id: Set(story.id),
                content: Set(node.content.clone()),
                is_root: Set(index == 0),
                is_ending: Set(node.ending.is_ending),
                is_winning_ending: Set(node.ending.is_winning_ending),
                options: Set(serde_json::Value::Array(Vec::new())),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            ids.push(inserted.id);
        }

        for (index, node) in flat.iter().enumerate() {
            if node.options.is_empty() {
                continue;
            }

            let options: Vec<StoryOption> = node
                .options
                .iter()
                .map(|(text, target)| StoryOption {
                    text: text.clone(),
                    node_id: ids.get(*target).copied(),
                })
                .collect();

            story_nodes::Entity::update_many()
                .set(story_nodes::ActiveModel {
                    options: Set(story_nodes::options_to_json(&options)),
                    ..Default::default()
                })
                .filter(story_nodes::Column::Id.eq(ids[index]))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        debug!("Stored story {} with {} nodes", story.id, ids.len());

        Ok(story)
    }
}
