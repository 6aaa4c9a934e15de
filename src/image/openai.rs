use crate::config::OpenAIImageConfig;
use crate::image::ImageClient;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

/// DALL-E image generation via the OpenAI images endpoint. One image per
/// request, URL-based response.
#[derive(Debug)]
pub struct OpenAIImageClient {
    api_key: String,
    model: String,
    base_url: String,
    size: String,
    quality: String,
    client: reqwest::Client,
}

impl OpenAIImageClient {
    pub fn new(config: &OpenAIImageConfig, size: &str, quality: &str) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            size: size.to_string(),
            quality: quality.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u8,
    size: String,
    quality: String,
    response_format: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

#[async_trait]
impl ImageClient for OpenAIImageClient {
    async fn render(&self, description: &str) -> Result<String> {
        let url = format!("{}/images/generations", self.base_url);

        let request_body = ImageRequest {
            model: self.model.clone(),
            prompt: description.to_string(),
            n: 1,
            size: self.size.clone(),
            quality: self.quality.clone(),
            response_format: "url".to_string(),
        };

        debug!("Requesting illustration from {} ({})", self.model, self.size);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("OpenAI image API error: {}", error_text));
        }

        let result: ImageResponse = resp.json().await?;
        result
            .data
            .first()
            .and_then(|d| d.url.clone())
            .ok_or_else(|| anyhow!("Image response did not contain an image URL"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parsing_success() {
        let json = r#"{
            "created": 1700000000,
            "data": [
                { "url": "https://images.example/abc.png" }
            ]
        }"#;
        let result: ImageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            result.data[0].url.as_deref(),
            Some("https://images.example/abc.png")
        );
    }

    #[test]
    fn response_without_url_yields_none() {
        let json = r#"{ "data": [ { "b64_json": "AAAA" } ] }"#;
        let result: ImageResponse = serde_json::from_str(json).unwrap();
        assert!(result.data[0].url.is_none());
    }

    #[test]
    fn request_has_fixed_parameters() {
        let body = ImageRequest {
            model: "dall-e-3".to_string(),
            prompt: "A castle in the clouds.".to_string(),
            n: 1,
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
            response_format: "url".to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""n":1"#));
        assert!(json.contains(r#""response_format":"url""#));
    }
}
