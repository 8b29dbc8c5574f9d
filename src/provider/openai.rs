//! OpenAI Images API provider.

use super::{ImageProvider, ProviderError};
use crate::types::ImageSize;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`OpenAiProvider`].
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-image-1".to_string(),
            timeout: Duration::from_millis(180_000),
        }
    }
}

// Hand-written so the key never reaches a log line.
impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("OPENAI_API_KEY not set".to_string()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn read_response(response: reqwest::Response) -> Result<Vec<Vec<u8>>, ProviderError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        parse_images_response(status, &body)
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

/// Turn a status + body into decoded image buffers.
fn parse_images_response(status: u16, body: &str) -> Result<Vec<Vec<u8>>, ProviderError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ApiErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string());
        return Err(ProviderError::Api { status, message });
    }

    let response: ImagesResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let images = response
        .data
        .into_iter()
        .filter_map(|d| d.b64_json)
        .map(|b64| {
            BASE64
                .decode(b64.as_bytes())
                .map_err(|e| ProviderError::Parse(format!("invalid base64 image: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if images.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(images)
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
    async fn generate(
        &self,
        prompt: &str,
        size: ImageSize,
        count: u32,
    ) -> Result<Vec<Vec<u8>>, ProviderError> {
        let key = self.api_key()?;
        debug!(model = %self.config.model, %size, count, "requesting image generation");

        let request = GenerationRequest {
            model: &self.config.model,
            prompt,
            size: size.as_str(),
            n: count,
        };
        let response = self
            .client
            .post(self.endpoint("images/generations"))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        Self::read_response(response).await
    }

    async fn edit(
        &self,
        image_path: &Path,
        prompt: &str,
        size: ImageSize,
        transparent: bool,
    ) -> Result<Vec<u8>, ProviderError> {
        let key = self.api_key()?;
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|source| ProviderError::Io {
                path: image_path.to_path_buf(),
                source,
            })?;
        debug!(
            model = %self.config.model,
            %size,
            transparent,
            image = %image_path.display(),
            "requesting image edit"
        );

        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());
        let image = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(image_path))
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let mut form = Form::new()
            .text("model", self.config.model.clone())
            .text("prompt", prompt.to_string())
            .text("size", size.as_str());
        if transparent {
            form = form.text("background", "transparent");
        }
        let form = form.part("image", image);

        let response = self
            .client
            .post(self.endpoint("images/edits"))
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let mut images = Self::read_response(response).await?;
        Ok(images.swap_remove(0))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
