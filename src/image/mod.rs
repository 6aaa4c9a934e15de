use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod comfyui;
pub mod openai;

/// Renders a single illustration and returns its locator (a URL).
#[async_trait]
pub trait ImageClient: Send + Sync + Debug {
    async fn render(&self, description: &str) -> Result<String>;
}

pub fn create_image_client(config: &Config) -> Result<Box<dyn ImageClient>> {
    match config.image.provider.as_str() {
        "openai" => {
            let cfg = config
                .image
                .openai
                .as_ref()
                .context("OpenAI image config missing")?;
            Ok(Box::new(openai::OpenAIImageClient::new(
                cfg,
                &config.story.image_size,
                &config.story.image_quality,
            )))
        }
        "comfyui" => {
            let cfg = config
                .image
                .comfyui
                .as_ref()
                .context("ComfyUI config missing")?;
            Ok(Box::new(comfyui::ComfyUiClient::new(
                cfg,
                &config.story.image_size,
            )?))
        }
        _ => Err(anyhow!("Unknown image provider: {}", config.image.provider)),
    }
}

/// Locator returned when image generation fails outright.
pub fn error_placeholder_url() -> String {
    "https://via.placeholder.com/512x512/FF0000/FFFFFF?text=Image+Gen+Error".to_string()
}

/// Grey placeholder bearing a short caption, for the engine's fixed terminal
/// and error nodes.
pub fn placeholder_url(caption: &str) -> String {
    format!(
        "https://via.placeholder.com/512x512/CCCCCC/000000?text={}",
        caption.replace(' ', "+")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageConfig, LlmConfig};

    fn config(provider: &str) -> Config {
        Config {
            llm: LlmConfig {
                provider: "openai".to_string(),
                openai: None,
                gemini: None,
                ollama: None,
            },
            image: ImageConfig {
                provider: provider.to_string(),
                openai: None,
                comfyui: None,
            },
            story: Default::default(),
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = create_image_client(&config("stable-diffusion-webui")).unwrap_err();
        assert!(err.to_string().contains("Unknown image provider"));
    }

    #[test]
    fn missing_provider_config_is_rejected() {
        let err = create_image_client(&config("openai")).unwrap_err();
        assert!(err.to_string().contains("OpenAI image config missing"));
    }

    #[test]
    fn placeholder_captions_are_url_safe() {
        let url = placeholder_url("The End");
        assert_eq!(
            url,
            "https://via.placeholder.com/512x512/CCCCCC/000000?text=The+End"
        );
        assert!(!error_placeholder_url().contains(' '));
    }
}
