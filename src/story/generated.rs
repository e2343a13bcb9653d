//! Story as produced by a generator, before it is stored
//!
//! A generated story is a real tree: each option owns the node it leads to.
//! Storing it flattens the tree into rows and turns ownership into
//! `node_id` references.

use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;
use crate::schema::EndingFlags;

pub const MAX_DEPTH: usize = 16;
pub const MAX_NODES: usize = 256;
pub const MAX_OPTIONS_PER_NODE: usize = 4;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedStory {
    pub title: String,
    #[serde(alias = "rootNode")]
    pub root_node: GeneratedNode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedNode {
    pub content: String,
    #[serde(default, alias = "isEnding")]
    pub is_ending: bool,
    #[serde(default, alias = "isWinningEnding")]
    pub is_winning_ending: bool,
    #[serde(default)]
    pub options: Vec<GeneratedOption>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedOption {
    pub text: String,
    #[serde(alias = "nextNode")]
    pub next_node: GeneratedNode,
}

/// A node in pre-order, with its options pointing at other indices of the
/// same flattened list.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatNode {
    pub content: String,
    pub ending: EndingFlags,
    pub options: Vec<(String, usize)>,
}

impl GeneratedNode {
    pub fn ending(content: impl Into<String>, winning: bool) -> Self {
        Self {
            content: content.into(),
            is_ending: true,
            is_winning_ending: winning,
            options: Vec::new(),
        }
    }

    pub fn branch(content: impl Into<String>, options: Vec<GeneratedOption>) -> Self {
        Self {
            content: content.into(),
            is_ending: false,
            is_winning_ending: false,
            options,
        }
    }
}

impl GeneratedOption {
    pub fn new(text: impl Into<String>, next_node: GeneratedNode) -> Self {
        Self {
            text: text.into(),
            next_node,
        }
    }
}

impl GeneratedStory {
    /// Checks the structural rules every stored story must satisfy.
    ///
    /// The root is unique by construction. Beyond that: endings carry no
    /// options, winning endings are endings, every non-ending node offers at
    /// least one option, and the tree stays within the size limits.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.title.trim().is_empty() {
            return Err(GenerationError::InvalidStory("title is empty".into()));
        }

        let mut count = 0usize;
        let mut has_winning = false;
        let mut stack = vec![(&self.root_node, 0usize, String::from("root"))];

        while let Some((node, depth, path)) = stack.pop() {
            count += 1;
            if count > MAX_NODES {
                return Err(GenerationError::InvalidStory(format!(
                    "story has more than {} nodes",
                    MAX_NODES
                )));
            }
            if depth > MAX_DEPTH {
                return Err(GenerationError::InvalidStory(format!(
                    "story is deeper than {} levels",
                    MAX_DEPTH
                )));
            }
            if node.content.trim().is_empty() {
                return Err(GenerationError::InvalidStory(format!(
                    "node at {} has no content",
                    path
                )));
            }
            if node.is_winning_ending && !node.is_ending {
                return Err(GenerationError::InvalidStory(format!(
                    "node at {} is a winning ending but not an ending",
                    path
                )));
            }
            if node.is_ending && !node.options.is_empty() {
                return Err(GenerationError::InvalidStory(format!(
                    "ending at {} offers options",
                    path
                )));
            }
            if !node.is_ending && node.options.is_empty() {
                return Err(GenerationError::InvalidStory(format!(
                    "node at {} is not an ending but offers no options",
                    path
                )));
            }
            if node.options.len() > MAX_OPTIONS_PER_NODE {
                return Err(GenerationError::InvalidStory(format!(
                    "node at {} offers {} options, at most {} allowed",
                    path,
                    node.options.len(),
                    MAX_OPTIONS_PER_NODE
                )));
            }
            has_winning |= node.is_winning_ending;

            for (i, option) in node.options.iter().enumerate() {
                if option.text.trim().is_empty() {
                    return Err(GenerationError::InvalidStory(format!(
                        "option {} at {} has no text",
                        i, path
                    )));
                }
                stack.push((&option.next_node, depth + 1, format!("{}.{}", path, i)));
            }
        }

        if !has_winning {
            return Err(GenerationError::InvalidStory(
                "story has no winning ending".into(),
            ));
        }

        Ok(())
    }

    /// Flattens the tree in pre-order; index 0 is the root.
    pub fn flatten(&self) -> Vec<FlatNode> {
        let mut flat: Vec<FlatNode> = Vec::new();
        // (node, parent index and option slot to patch once the node has an index)
        let mut stack: Vec<(&GeneratedNode, Option<(usize, usize)>)> =
            vec![(&self.root_node, None)];

        while let Some((node, parent)) = stack.pop() {
            let index = flat.len();
            flat.push(FlatNode {
                content: node.content.trim().to_string(),
                ending: EndingFlags {
                    is_ending: node.is_ending,
                    is_winning_ending: node.is_winning_ending,
                },
                options: node
                    .options
                    .iter()
                    .map(|option| (option.text.trim().to_string(), usize::MAX))
                    .collect(),
            });

            if let Some((parent_index, slot)) = parent {
                flat[parent_index].options[slot].1 = index;
            }

            // Reverse so the first option is visited first.
            for (slot, option) in node.options.iter().enumerate().rev() {
                stack.push((&option.next_node, Some((index, slot))));
            }
        }

        flat
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root_node];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.options.iter().map(|o| &o.next_node));
        }
        count
    }
}
