use crate::config::ComfyUiConfig;
use crate::image::ImageClient;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLL_ATTEMPTS: u32 = 120;

const NEGATIVE_PROMPT: &str = "bad quality, blurry, ugly, scary, violent";

/// Self-hosted image generation through ComfyUI: queue a text-to-image
/// workflow, poll its history until it completes, and hand back the `/view`
/// locator of the first output image.
#[derive(Debug)]
pub struct ComfyUiClient {
    base_url: Url,
    checkpoint: String,
    steps: u32,
    width: u32,
    height: u32,
    client: reqwest::Client,
}

impl ComfyUiClient {
    pub fn new(config: &ComfyUiConfig, image_size: &str) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid ComfyUI base URL: {}", config.base_url))?;
        let (width, height) = parse_size(image_size);

        Ok(Self {
            base_url,
            checkpoint: config.checkpoint.clone(),
            steps: config.steps,
            width,
            height,
            client: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid ComfyUI endpoint: {}", path))
    }

    fn build_workflow(&self, description: &str) -> serde_json::Value {
        serde_json::json!({
            "3": {
                "inputs": {
                    "seed": clock_entropy(),
                    "steps": self.steps,
                    "cfg": 8.0,
                    "sampler_name": "euler",
                    "scheduler": "normal",
                    "denoise": 1.0,
                    "model": ["4", 0],
                    "positive": ["6", 0],
                    "negative": ["7", 0],
                    "latent_image": ["5", 0]
                },
                "class_type": "KSampler"
            },
            "4": {
                "inputs": { "ckpt_name": self.checkpoint },
                "class_type": "CheckpointLoaderSimple"
            },
            "5": {
                "inputs": {
                    "width": self.width,
                    "height": self.height,
                    "batch_size": 1
                },
                "class_type": "EmptyLatentImage"
            },
            "6": {
                "inputs": { "text": description, "clip": ["4", 1] },
                "class_type": "CLIPTextEncode"
            },
            "7": {
                "inputs": { "text": NEGATIVE_PROMPT, "clip": ["4", 1] },
                "class_type": "CLIPTextEncode"
            },
            "8": {
                "inputs": { "samples": ["3", 0], "vae": ["4", 2] },
                "class_type": "VAEDecode"
            },
            "9": {
                "inputs": { "filename_prefix": "taleweaver", "images": ["8", 0] },
                "class_type": "SaveImage"
            }
        })
    }

    async fn queue_prompt(&self, workflow: serde_json::Value) -> Result<QueueResponse> {
        let request = QueuePromptRequest {
            prompt: workflow,
            client_id: format!("taleweaver-{}", clock_entropy()),
        };

        let resp = self
            .client
            .post(self.endpoint("/prompt")?)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("ComfyUI queue error: {}", error_text));
        }

        Ok(resp.json().await?)
    }

    async fn get_history(&self, prompt_id: &str) -> Result<HistoryResponse> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/history/{}", prompt_id))?)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("ComfyUI history error: {}", error_text));
        }

        Ok(resp.json().await?)
    }

    async fn wait_for_completion(&self, prompt_id: &str) -> Result<ImageOutput> {
        for _ in 0..MAX_POLL_ATTEMPTS {
            let history = self.get_history(prompt_id).await?;

            if let Some(prompt_history) = history.prompts.get(prompt_id) {
                if prompt_history.status.completed {
                    for output in prompt_history.outputs.values() {
                        if let Some(images) = &output.images {
                            if let Some(image) = images.first() {
                                return Ok(image.clone());
                            }
                        }
                    }
                    return Err(anyhow!("ComfyUI produced no images"));
                }
            }

            sleep(POLL_INTERVAL).await;
        }

        Err(anyhow!("ComfyUI generation timed out"))
    }
}

#[async_trait]
impl ImageClient for ComfyUiClient {
    async fn render(&self, description: &str) -> Result<String> {
        let workflow = self.build_workflow(description);

        let queued = self.queue_prompt(workflow).await?;
        debug!("Queued ComfyUI prompt {}", queued.prompt_id);

        let image = self.wait_for_completion(&queued.prompt_id).await?;

        let mut view = self.endpoint("/view")?;
        view.query_pairs_mut()
            .append_pair("filename", &image.filename)
            .append_pair("subfolder", &image.subfolder)
            .append_pair("type", &image.r#type);
        Ok(view.to_string())
    }
}

fn parse_size(size: &str) -> (u32, u32) {
    let mut parts = size.splitn(2, 'x');
    let width = parts.next().and_then(|w| w.parse().ok());
    let height = parts.next().and_then(|h| h.parse().ok());
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        _ => (1024, 1024),
    }
}

/// Seed and client-id source. Sub-second clock bits are enough entropy for a
/// sampler seed; image quality does not depend on its distribution.
fn clock_entropy() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Serialize)]
struct QueuePromptRequest {
    prompt: serde_json::Value,
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    prompt_id: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(flatten)]
    prompts: HashMap<String, PromptHistory>,
}

#[derive(Debug, Deserialize)]
struct PromptHistory {
    outputs: HashMap<String, NodeOutput>,
    status: PromptStatus,
}

#[derive(Debug, Deserialize)]
struct NodeOutput {
    images: Option<Vec<ImageOutput>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImageOutput {
    filename: String,
    subfolder: String,
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct PromptStatus {
    completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_image_sizes() {
        assert_eq!(parse_size("1024x1024"), (1024, 1024));
        assert_eq!(parse_size("512x768"), (512, 768));
        assert_eq!(parse_size("not-a-size"), (1024, 1024));
    }

    #[test]
    fn workflow_carries_prompt_and_dimensions() {
        let config = ComfyUiConfig {
            base_url: "http://127.0.0.1:8188".to_string(),
            checkpoint: "toon.ckpt".to_string(),
            steps: 12,
        };
        let client = ComfyUiClient::new(&config, "512x512").unwrap();
        let workflow = client.build_workflow("A candy cane forest at dawn.");

        assert_eq!(
            workflow["6"]["inputs"]["text"],
            "A candy cane forest at dawn."
        );
        assert_eq!(workflow["5"]["inputs"]["width"], 512);
        assert_eq!(workflow["4"]["inputs"]["ckpt_name"], "toon.ckpt");
        assert_eq!(workflow["3"]["inputs"]["steps"], 12);
    }

    #[test]
    fn history_parsing_finds_completed_image() {
        let json = r#"{
            "abc-123": {
                "outputs": {
                    "9": {
                        "images": [
                            {"filename": "taleweaver_00001_.png", "subfolder": "", "type": "output"}
                        ]
                    }
                },
                "status": {"status_str": "success", "completed": true}
            }
        }"#;
        let history: HistoryResponse = serde_json::from_str(json).unwrap();
        let prompt = &history.prompts["abc-123"];
        assert!(prompt.status.completed);
        let images = prompt.outputs["9"].images.as_ref().unwrap();
        assert_eq!(images[0].filename, "taleweaver_00001_.png");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = ComfyUiConfig {
            base_url: "not a url".to_string(),
            checkpoint: "x.ckpt".to_string(),
            steps: 20,
        };
        assert!(ComfyUiClient::new(&config, "1024x1024").is_err());
    }
}
