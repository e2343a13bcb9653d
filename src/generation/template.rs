use async_trait::async_trait;

use super::StoryGenerator;
use crate::errors::GenerationError;
use crate::story::{GeneratedNode, GeneratedOption, GeneratedStory};

/// Builds a small fixed-shape story around the theme without any network
/// access: two choices, then two more, four endings of which one wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateStoryGenerator;

impl TemplateStoryGenerator {
    pub fn build(theme: &str) -> Result<GeneratedStory, GenerationError> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(GenerationError::InvalidTheme("theme is empty".into()));
        }

        let bold = GeneratedNode::branch(
            format!(
                "You push deeper into the world of {}. The path narrows and something \
                 is watching you from the shadows.",
                theme
            ),
            vec![
                GeneratedOption::new(
                    "Call out to the watcher",
                    GeneratedNode::ending(
                        format!(
                            "The watcher turns out to be a guide who knows every secret of {}. \
                             Together you reach the heart of the adventure. You win!",
                            theme
                        ),
                        true,
                    ),
                ),
                GeneratedOption::new(
                    "Run for it",
                    GeneratedNode::ending(
                        "You run blindly, trip, and wake up back where you started. \
                         The adventure is over.",
                        false,
                    ),
                ),
            ],
        );

        let careful = GeneratedNode::branch(
            format!(
                "You study the signs of {} carefully and find two trails: one well trodden, \
                 one overgrown.",
                theme
            ),
            vec![
                GeneratedOption::new(
                    "Take the well trodden trail",
                    GeneratedNode::ending(
                        "The trail leads you safely home. Nothing ventured, nothing gained.",
                        false,
                    ),
                ),
                GeneratedOption::new(
                    "Take the overgrown trail",
                    GeneratedNode::ending(
                        "The overgrown trail collapses beneath you. Your journey ends here.",
                        false,
                    ),
                ),
            ],
        );

        Ok(GeneratedStory {
            title: format!("An Adventure of {}", title_case(theme)),
            root_node: GeneratedNode::branch(
                format!(
                    "Your adventure begins at the edge of {}. Two ways lie ahead of you.",
                    theme
                ),
                vec![
                    GeneratedOption::new("Press on boldly", bold),
                    GeneratedOption::new("Proceed with caution", careful),
                ],
            ),
        })
    }
}

#[async_trait]
impl StoryGenerator for TemplateStoryGenerator {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(&self, theme: &str) -> Result<GeneratedStory, GenerationError> {
        let story = Self::build(theme)?;
        story.validate()?;
        Ok(story)
    }
}

fn title_case(theme: &str) -> String {
    theme
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
