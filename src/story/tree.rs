//! Story tree assembly and traversal
//!
//! Stored nodes form a directed graph that may contain cycles or options
//! whose `node_id` has no matching node. Assembly never walks the graph, it
//! only indexes the rows; traversal is one step at a time and treats any
//! unresolvable option as a dead end.

use std::collections::BTreeMap;

use crate::database::entities::{stories, story_nodes};
use crate::errors::StoryError;
use crate::schema::{CompleteStoryResponse, StoryHeader, StoryNodeResponse};

/// Builds the response for one story from its row and all of its node rows.
pub fn assemble_story_tree(
    story: stories::Model,
    nodes: Vec<story_nodes::Model>,
) -> Result<CompleteStoryResponse, StoryError> {
    let roots: Vec<&story_nodes::Model> = nodes.iter().filter(|n| n.is_root).collect();
    let root_id = match roots.as_slice() {
        [root] => root.id,
        [] => return Err(StoryError::MissingRoot(story.id)),
        many => {
            return Err(StoryError::MultipleRoots {
                story_id: story.id,
                count: many.len(),
            })
        }
    };

    let mut all_nodes = BTreeMap::new();
    for node in &nodes {
        all_nodes.insert(node.id, StoryNodeResponse::try_from(node)?);
    }

    let root_node = all_nodes
        .get(&root_id)
        .cloned()
        .ok_or(StoryError::MissingRoot(story.id))?;

    Ok(CompleteStoryResponse {
        story: StoryHeader::from(story),
        root_node,
        all_nodes,
    })
}

impl CompleteStoryResponse {
    pub fn node(&self, node_id: i32) -> Option<&StoryNodeResponse> {
        self.all_nodes.get(&node_id)
    }

    /// Resolves option `option_index` of node `node_id`.
    ///
    /// Returns `None` for an unknown node, an out-of-range option, an option
    /// without a target, or a target missing from `all_nodes`.
    pub fn follow(&self, node_id: i32, option_index: usize) -> Option<&StoryNodeResponse> {
        let option = self.node(node_id)?.options.get(option_index)?;
        self.node(option.node_id?)
    }

    /// Options whose target cannot be resolved, as `(node id, option index)`.
    pub fn dangling_references(&self) -> Vec<(i32, usize)> {
        let all_nodes = &self.all_nodes;
        all_nodes
            .values()
            .flat_map(move |node| {
                node.options
                    .iter()
                    .enumerate()
                    .filter(move |(_, option)| {
                        option
                            .node_id
                            .map(|id| !all_nodes.contains_key(&id))
                            .unwrap_or(true)
                    })
                    .map(move |(i, _)| (node.id, i))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn story() -> stories::Model {
        stories::Model {
            id: 7,
            title: "Pirates".into(),
            session_id: "session".into(),
            created_at: Utc::now(),
        }
    }

    fn node(id: i32, is_root: bool, is_ending: bool, options: serde_json::Value) -> story_nodes::Model {
        story_nodes::Model {
            id,
            story_id: 7,
            content: format!("node {}", id),
            is_root,
            is_ending,
            is_winning_ending: false,
            options,
        }
    }

    #[test]
    fn test_assemble_picks_root() {
        let tree = assemble_story_tree(
            story(),
            vec![
                node(2, false, true, json!([])),
                node(1, true, false, json!([{"text": "on", "node_id": 2}])),
            ],
        )
        .unwrap();

        assert_eq!(tree.root_node.id, 1);
        assert_eq!(tree.all_nodes.len(), 2);
        assert_eq!(tree.follow(1, 0).map(|n| n.id), Some(2));
        assert!(tree.dangling_references().is_empty());
    }

    #[test]
    fn test_missing_and_duplicate_roots() {
        let err = assemble_story_tree(story(), vec![node(1, false, true, json!([]))]).unwrap_err();
        assert!(matches!(err, StoryError::MissingRoot(7)));

        let err = assemble_story_tree(
            story(),
            vec![node(1, true, true, json!([])), node(2, true, true, json!([]))],
        )
        .unwrap_err();
        assert!(matches!(err, StoryError::MultipleRoots { count: 2, .. }));
    }

    #[test]
    fn test_dangling_and_missing_targets_are_dead_ends() {
        let tree = assemble_story_tree(
            story(),
            vec![node(
                1,
                true,
                false,
                json!([{"text": "nowhere", "node_id": 99}, {"text": "untargeted"}]),
            )],
        )
        .unwrap();

        assert!(tree.follow(1, 0).is_none());
        assert!(tree.follow(1, 1).is_none());
        assert!(tree.follow(1, 5).is_none());
        assert!(tree.follow(42, 0).is_none());
        assert_eq!(tree.dangling_references(), vec![(1, 0), (1, 1)]);
    }

    #[test]
    fn test_cycles_are_followed_step_by_step() {
        let tree = assemble_story_tree(
            story(),
            vec![
                node(1, true, false, json!([{"text": "loop", "node_id": 2}])),
                node(2, false, false, json!([{"text": "back", "node_id": 1}])),
            ],
        )
        .unwrap();

        let mut current = tree.root_node.id;
        for _ in 0..10 {
            current = tree.follow(current, 0).map(|n| n.id).unwrap();
        }
        assert_eq!(current, 1);
    }
}
