use crate::character::CharacterProfile;
use crate::llm::{ChatRequest, LlmClient};
use crate::prompt::PromptMessages;
use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

/// Normalized record of one generated story beat, as the provider is
/// instructed to shape it. `illustration_prompt` stays optional on purpose:
/// its absence is the controller's deep-failure signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorySegment {
    #[serde(default)]
    pub title: Option<String>,
    pub story_text: String,
    #[serde(default)]
    pub choices: Vec<SegmentChoice>,
    #[serde(default)]
    pub illustration_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentChoice {
    pub text: String,
    pub next_prompt_context: String,
}

pub struct SegmentGenerator {
    llm: Box<dyn LlmClient>,
    temperature: f32,
}

impl SegmentGenerator {
    pub fn new(llm: Box<dyn LlmClient>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// One provider call, no retries. Transport errors, empty replies and
    /// parse failures all degrade to the fixed fallback segment, so the
    /// caller always receives a structurally valid record.
    pub async fn generate(
        &self,
        prompt: &PromptMessages,
        character: &CharacterProfile,
    ) -> StorySegment {
        let request = ChatRequest {
            system: prompt.system.clone(),
            user: prompt.user.clone(),
            temperature: self.temperature,
            json: true,
        };

        match self.llm.chat(&request).await {
            Ok(raw) => {
                debug!("Received {} bytes from text provider", raw.len());
                match parse_segment(&raw) {
                    Ok(segment) => segment,
                    Err(e) => {
                        error!("Failed to parse story segment, using fallback: {:#}", e);
                        fallback_segment(character)
                    }
                }
            }
            Err(e) => {
                error!("Story generation failed, using fallback: {:#}", e);
                fallback_segment(character)
            }
        }
    }
}

/// Providers sometimes wrap the object in Markdown fences despite the
/// JSON-mode instruction.
pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else {
        s.to_string()
    }
}

pub fn parse_segment(raw: &str) -> Result<StorySegment> {
    let clean = strip_code_blocks(raw);
    let segment: StorySegment = serde_json::from_str(&clean)
        .context(format!("Failed to parse story segment JSON: {}", clean))?;
    Ok(segment)
}

/// Fixed, theme-agnostic "blank pages" record returned whenever the provider
/// call fails. One choice inviting a restart, so the session can recover.
pub fn fallback_segment(character: &CharacterProfile) -> StorySegment {
    StorySegment {
        title: Some("The Magical Storybook".to_string()),
        story_text: format!(
            "Oh dear! {} the {} opened the storybook, but the pages were blank! Maybe try \
             starting a new adventure?",
            character.display_name(),
            character.display_role()
        ),
        choices: vec![SegmentChoice {
            text: "Start a new adventure".to_string(),
            next_prompt_context: "User wants to start a new adventure after an error."
                .to_string(),
        }],
        illustration_prompt: Some(
            "A blank, open storybook with magical sparkles around it, waiting for an \
             adventure to begin. Whimsical children's art style."
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Gender;
    use crate::prompt;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    fn character() -> CharacterProfile {
        CharacterProfile {
            name: "Tyson".to_string(),
            gender: Gender::Boy,
            age: 6,
            role: "astronaut".to_string(),
            personalities: vec![],
            favorite_color: None,
            favorite_animal: None,
        }
    }

    #[derive(Debug)]
    struct MockLlm {
        reply: Result<String, String>,
        calls: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl LlmClient for MockLlm {
        async fn chat(&self, _request: &ChatRequest) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(anyhow!(e.clone())),
            }
        }
    }

    #[test]
    fn strips_code_fences() {
        assert_eq!(strip_code_blocks("{}"), "{}");
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("  ```json  \n  {}  \n  ```  "), "{}");
    }

    #[test]
    fn parses_full_segment() {
        let raw = r#"{
            "title": "The Glittering Nebula",
            "story_text": "The rocket hummed softly.",
            "choices": [
                {"text": "Fly to the red planet", "next_prompt_context": "chose the red planet"},
                {"text": "Follow the comet", "next_prompt_context": "chose to follow the comet"}
            ],
            "illustration_prompt": "A small silver rocket drifting past a purple nebula."
        }"#;
        let segment = parse_segment(raw).unwrap();
        assert_eq!(segment.title.as_deref(), Some("The Glittering Nebula"));
        assert_eq!(segment.choices.len(), 2);
        assert!(segment.illustration_prompt.is_some());
    }

    #[test]
    fn missing_illustration_prompt_still_parses() {
        let raw = r#"{"story_text": "Hello.", "choices": []}"#;
        let segment = parse_segment(raw).unwrap();
        assert!(segment.illustration_prompt.is_none());
    }

    #[test]
    fn garbage_fails_to_parse() {
        assert!(parse_segment("the dragon ate the JSON").is_err());
        assert!(parse_segment(r#"{"choices": []}"#).is_err()); // no story_text
    }

    #[test]
    fn fallback_names_character_and_role() {
        let segment = fallback_segment(&character());
        assert!(segment.story_text.contains("Tyson"));
        assert!(segment.story_text.contains("astronaut"));
        assert_eq!(segment.choices.len(), 1);
        assert!(segment.illustration_prompt.as_deref().unwrap().contains("blank"));
    }

    #[tokio::test]
    async fn provider_error_degrades_to_fallback() {
        let calls = Arc::new(Mutex::new(0));
        let generator = SegmentGenerator::new(
            Box::new(MockLlm {
                reply: Err("connection refused".to_string()),
                calls: calls.clone(),
            }),
            0.7,
        );

        let profile = character();
        let messages = prompt::compose(&profile, "space", None);
        let segment = generator.generate(&messages, &profile).await;

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(segment.story_text.contains("pages were blank"));
        assert_eq!(segment.choices.len(), 1);
    }

    #[tokio::test]
    async fn parse_failure_degrades_to_fallback() {
        let calls = Arc::new(Mutex::new(0));
        let generator = SegmentGenerator::new(
            Box::new(MockLlm {
                reply: Ok("once upon a time, with no braces in sight".to_string()),
                calls: calls.clone(),
            }),
            0.7,
        );

        let profile = character();
        let messages = prompt::compose(&profile, "space", None);
        let segment = generator.generate(&messages, &profile).await;

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(segment.story_text.contains("pages were blank"));
    }

    #[tokio::test]
    async fn fenced_reply_is_accepted() {
        let calls = Arc::new(Mutex::new(0));
        let generator = SegmentGenerator::new(
            Box::new(MockLlm {
                reply: Ok("```json\n{\"story_text\": \"Up we go!\", \"choices\": [], \
                           \"illustration_prompt\": \"A ladder into the clouds.\"}\n```"
                    .to_string()),
                calls: calls.clone(),
            }),
            0.7,
        );

        let profile = character();
        let messages = prompt::compose(&profile, "space", None);
        let segment = generator.generate(&messages, &profile).await;

        assert_eq!(segment.story_text, "Up we go!");
    }
}
