use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,

    pub image: ImageConfig,

    #[serde(default)]
    pub story: StoryConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String, // "openai", "gemini" or "ollama"
    pub openai: Option<OpenAIConfig>,
    pub gemini: Option<GeminiConfig>,
    pub ollama: Option<OllamaConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageConfig {
    #[serde(default = "default_image_provider")]
    pub provider: String, // "openai" or "comfyui"
    pub openai: Option<OpenAIImageConfig>,
    pub comfyui: Option<ComfyUiConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIImageConfig {
    pub api_key: String,
    #[serde(default = "default_image_model")]
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ComfyUiConfig {
    #[serde(default = "default_comfyui_base_url")]
    pub base_url: String,
    #[serde(default = "default_comfyui_checkpoint")]
    pub checkpoint: String,
    #[serde(default = "default_comfyui_steps")]
    pub steps: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoryConfig {
    /// Player-chosen turns before the story is forced to a happy ending.
    #[serde(default = "default_step_cap")]
    pub step_cap: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_image_size")]
    pub image_size: String,

    #[serde(default = "default_image_quality")]
    pub image_quality: String,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            step_cap: default_step_cap(),
            temperature: default_temperature(),
            image_size: default_image_size(),
            image_quality: default_image_quality(),
        }
    }
}

fn default_image_provider() -> String {
    "openai".to_string()
}
fn default_image_model() -> String {
    "dall-e-3".to_string()
}
fn default_comfyui_base_url() -> String {
    "http://127.0.0.1:8188".to_string()
}
fn default_comfyui_checkpoint() -> String {
    "v1-5-pruned-emaonly.ckpt".to_string()
}
fn default_comfyui_steps() -> u32 {
    20
}
fn default_step_cap() -> u32 {
    7
}
fn default_temperature() -> f32 {
    0.7
}
fn default_image_size() -> String {
    "1024x1024".to_string()
}
fn default_image_quality() -> String {
    "standard".to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.yml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("{} not found. Please create one.", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_applies_defaults() {
        let yaml = r#"
llm:
  provider: openai
  openai:
    api_key: sk-test
    model: gpt-4o-mini
image:
  openai:
    api_key: sk-test
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.story.step_cap, 7);
        assert_eq!(config.story.temperature, 0.7);
        assert_eq!(config.story.image_size, "1024x1024");
        assert_eq!(config.image.provider, "openai");
        assert_eq!(config.image.openai.as_ref().unwrap().model, "dall-e-3");
    }

    #[test]
    fn comfyui_defaults() {
        let yaml = r#"
llm:
  provider: ollama
  ollama:
    base_url: http://localhost:11434
    model: llama3
image:
  provider: comfyui
  comfyui: {}
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        let comfy = config.image.comfyui.unwrap();
        assert_eq!(comfy.base_url, "http://127.0.0.1:8188");
        assert_eq!(comfy.steps, 20);
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");

        let yaml = r#"
llm:
  provider: gemini
  gemini:
    api_key: test-key
    model: gemini-2.0-flash
image:
  openai:
    api_key: sk-test
story:
  step_cap: 5
"#;
        std::fs::write(&path, yaml).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.story.step_cap, 5);

        config.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.llm.provider, "gemini");
        assert_eq!(reloaded.story.step_cap, 5);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("nope.yml"));
        assert!(result.is_err());
    }
}
