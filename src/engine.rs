use crate::character::CharacterProfile;
use crate::config::{Config, StoryConfig};
use crate::generator::{SegmentGenerator, StorySegment};
use crate::illustration::IllustrationRenderer;
use crate::image::{self, ImageClient};
use crate::llm::{self, LlmClient};
use crate::prompt;
use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// At most this many forward choices are surfaced per node.
const MAX_CHOICES: usize = 3;

/// A forward choice. `next_node_id` is the provider's free-text description
/// of what pursuing the choice means; it seeds the next turn's prompt and is
/// not a graph key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub next_node_id: String,
}

/// One story beat as returned to the caller. Terminal nodes carry an empty
/// choice list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub story_text: String,
    pub illustration_prompt: String,
    pub illustration_url: String,
    pub choices: Vec<Choice>,
    pub current_node_id: String,
}

/// What a turn produced. `Ended` and `Failed` both carry terminal nodes, but
/// callers no longer have to shape-sniff empty choice lists to tell a happy
/// ending from a generation failure.
#[derive(Debug, Clone)]
pub enum StoryOutcome {
    Ongoing(StoryNode),
    Ended(StoryNode),
    Failed { node: StoryNode, reason: String },
}

impl StoryOutcome {
    pub fn node(&self) -> &StoryNode {
        match self {
            StoryOutcome::Ongoing(node) | StoryOutcome::Ended(node) => node,
            StoryOutcome::Failed { node, .. } => node,
        }
    }

    /// Flattens back to the plain node shape for collaborators that only
    /// speak StoryNode.
    pub fn into_node(self) -> StoryNode {
        match self {
            StoryOutcome::Ongoing(node) | StoryOutcome::Ended(node) => node,
            StoryOutcome::Failed { node, .. } => node,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StoryOutcome::Ongoing(_))
    }
}

/// Stateless per call: character, theme and step count arrive as inputs,
/// session bookkeeping stays with the caller.
pub struct StoryEngine {
    generator: SegmentGenerator,
    illustrator: IllustrationRenderer,
    story: StoryConfig,
}

impl StoryEngine {
    pub fn new(
        llm: Box<dyn LlmClient>,
        image: Box<dyn ImageClient>,
        story: StoryConfig,
    ) -> Self {
        Self {
            generator: SegmentGenerator::new(llm, story.temperature),
            illustrator: IllustrationRenderer::new(image),
            story,
        }
    }

    /// Builds both provider clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = llm::create_llm(config)?;
        let image = image::create_image_client(config)?;
        Ok(Self::new(llm, image, config.story.clone()))
    }

    pub fn step_cap(&self) -> u32 {
        self.story.step_cap
    }

    /// Opens a story: composes the opening prompt, generates the first beat
    /// and its illustration, and returns the titled first node.
    pub async fn start(&self, character: &CharacterProfile, theme: &str) -> StoryOutcome {
        info!(
            "Starting {} story for {}",
            theme,
            character.display_name()
        );
        let messages = prompt::compose(character, theme, None);
        let segment = self.generator.generate(&messages, character).await;

        let Some(illustration_prompt) = segment.illustration_prompt.clone() else {
            warn!("Generated segment is missing an illustration prompt");
            return self.error_outcome(theme, true);
        };

        let illustration_url = self
            .illustrator
            .render(&illustration_prompt, &character.name)
            .await;

        let node = StoryNode {
            title: Some(
                segment
                    .title
                    .clone()
                    .unwrap_or_else(|| "A Magical Adventure".to_string()),
            ),
            story_text: segment.story_text.clone(),
            illustration_prompt,
            illustration_url,
            choices: map_choices(segment),
            current_node_id: format!("{}_start", theme),
        };
        classify(node)
    }

    /// Advances a story by one chosen step. The step cap is checked before
    /// any provider is invoked, so the terminating turn costs nothing.
    pub async fn continue_story(
        &self,
        character: &CharacterProfile,
        theme: &str,
        choice_context: &str,
        step_count: u32,
    ) -> StoryOutcome {
        if step_count >= self.story.step_cap {
            info!(
                "Step cap reached ({}/{}), ending {} story",
                step_count, self.story.step_cap, theme
            );
            return StoryOutcome::Ended(self.ending_node(character, theme));
        }

        let messages = prompt::compose(character, theme, Some(choice_context));
        let segment = self.generator.generate(&messages, character).await;

        let Some(illustration_prompt) = segment.illustration_prompt.clone() else {
            warn!("Generated segment is missing an illustration prompt");
            return self.error_outcome(theme, false);
        };

        let illustration_url = self
            .illustrator
            .render(&illustration_prompt, &character.name)
            .await;

        let node = StoryNode {
            title: None,
            story_text: segment.story_text.clone(),
            illustration_prompt,
            illustration_url,
            choices: map_choices(segment),
            current_node_id: format!("{}_continue_s{}", theme, step_count),
        };
        classify(node)
    }

    fn ending_node(&self, character: &CharacterProfile, theme: &str) -> StoryNode {
        StoryNode {
            title: None,
            story_text: format!(
                "What an amazing adventure! {} learned so much and made wonderful memories. \
                 The story comes to a happy end, but new adventures await!",
                character.display_name()
            ),
            illustration_prompt: "A magical storybook closing with sparkles and a rainbow, \
                                  symbolizing the end of a wonderful journey. Children's book \
                                  illustration style."
                .to_string(),
            illustration_url: image::placeholder_url("The End"),
            choices: Vec::new(),
            current_node_id: format!("{}_ending", theme),
        }
    }

    fn error_outcome(&self, theme: &str, starting: bool) -> StoryOutcome {
        let node = if starting {
            StoryNode {
                title: Some("The Magical Storybook".to_string()),
                story_text: "Oops! The storyteller seems to be on a break. Please try again \
                             later."
                    .to_string(),
                illustration_prompt: "A friendly 'try again later' sign in a storybook style."
                    .to_string(),
                illustration_url: image::placeholder_url("Error Starting Story"),
                choices: Vec::new(),
                current_node_id: format!("{}_error_start", theme),
            }
        } else {
            StoryNode {
                title: None,
                story_text: "Oh no! The story path seems to have gotten lost in the woods. \
                             Please try a different choice or start over."
                    .to_string(),
                illustration_prompt: "A 'path lost' sign in a whimsical forest. Children's \
                                      book style."
                    .to_string(),
                illustration_url: image::placeholder_url("Error Continuing Story"),
                choices: Vec::new(),
                current_node_id: format!("{}_error_continue", theme),
            }
        };
        StoryOutcome::Failed {
            node,
            reason: "generated segment lacked an illustration description".to_string(),
        }
    }
}

fn map_choices(segment: StorySegment) -> Vec<Choice> {
    segment
        .choices
        .into_iter()
        .take(MAX_CHOICES)
        .map(|c| Choice {
            text: c.text,
            next_node_id: c.next_prompt_context,
        })
        .collect()
}

/// A node without forward choices is a legitimate ending, wherever it came
/// from.
fn classify(node: StoryNode) -> StoryOutcome {
    if node.choices.is_empty() {
        StoryOutcome::Ended(node)
    } else {
        StoryOutcome::Ongoing(node)
    }
}
