use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart::Form, Client};
use tracing::debug;

use super::{ImageSynthesizer, MediaError};

const CLIPDROP_TEXT_TO_IMAGE_URL: &str = "https://clipdrop-api.co/text-to-image/v1";

/// ClipDrop text-to-image client. Renders at the vendor's fixed resolution.
#[derive(Clone)]
pub struct ClipdropClient {
    client: Client,
    api_key: String,
}

impl ClipdropClient {
    pub fn new(api_key: String) -> Result<Self, MediaError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
        })
    }
}

#[async_trait]
impl ImageSynthesizer for ClipdropClient {
    async fn text_to_image(&self, prompt: &str) -> Result<Bytes, MediaError> {
        let form = Form::new().text("prompt", prompt.to_string());

        let response = self
            .client
            .post(CLIPDROP_TEXT_TO_IMAGE_URL)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(MediaError::Api {
                vendor: "ClipDrop",
                status: status.as_u16(),
                message,
            });
        }

        let image = response.bytes().await?;
        if image.is_empty() {
            return Err(MediaError::EmptyBody("ClipDrop"));
        }

        debug!("ClipDrop rendered {} bytes", image.len());
        Ok(image)
    }
}
