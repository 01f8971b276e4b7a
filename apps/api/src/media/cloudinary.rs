//! Cloudinary upload API client with signed requests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{HostedImage, ImageHost, MediaError};

const CLOUDINARY_API_URL: &str = "https://api.cloudinary.com/v1_1";
const CLOUDINARY_DELIVERY_URL: &str = "https://res.cloudinary.com";

/// Incoming transformation that strips the background at upload time.
pub const BACKGROUND_REMOVAL: &str = "e_background_removal";

/// Delivery transformation that generatively removes `object` from the image.
pub fn object_removal(object: &str) -> String {
    format!("e_gen_remove:prompt_{object}")
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryError {
    error: CloudinaryErrorBody,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Result<Self, MediaError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            cloud_name,
            api_key,
            api_secret,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{CLOUDINARY_API_URL}/{}/image/{action}", self.cloud_name)
    }

    fn sign(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, &self.api_secret)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, with the API secret appended, SHA-256 hex encoded.
/// Empty values are excluded.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

async fn api_error(response: reqwest::Response) -> MediaError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<CloudinaryError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    MediaError::Api {
        vendor: "Cloudinary",
        status,
        message,
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(
        &self,
        data: Bytes,
        file_name: &str,
        transformation: Option<&str>,
    ) -> Result<HostedImage, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let transformation = transformation.unwrap_or_default();
        let signature = self.sign(&[
            ("timestamp", timestamp.as_str()),
            ("transformation", transformation),
        ]);

        let mut form = Form::new()
            .part("file", Part::bytes(data.to_vec()).file_name(file_name.to_string()))
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);
        if !transformation.is_empty() {
            form = form.text("transformation", transformation.to_string());
        }

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let uploaded: UploadResponse = response.json().await?;
        debug!("Uploaded image {} to Cloudinary", uploaded.public_id);

        Ok(HostedImage {
            public_id: uploaded.public_id,
            secure_url: uploaded.secure_url,
        })
    }

    fn transformed_url(&self, public_id: &str, transformation: &str) -> String {
        delivery_url(&self.cloud_name, public_id, transformation)
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())]);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("api_key", self.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature_algorithm", "sha256"),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let destroyed: DestroyResponse = response.json().await?;
        info!("Destroyed Cloudinary asset {public_id}: {}", destroyed.result);
        Ok(())
    }
}

pub fn delivery_url(cloud_name: &str, public_id: &str, transformation: &str) -> String {
    format!("{CLOUDINARY_DELIVERY_URL}/{cloud_name}/image/upload/{transformation}/{public_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_order_independent() {
        let a = sign_params(&[("timestamp", "1700000000"), ("public_id", "abc")], "secret");
        let b = sign_params(&[("public_id", "abc"), ("timestamp", "1700000000")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_matches_manual_digest() {
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"public_id=abc&timestamp=1700000000secret");
            hex::encode(hasher.finalize())
        };
        let actual = sign_params(&[("timestamp", "1700000000"), ("public_id", "abc")], "secret");
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_empty_params_are_not_signed() {
        let with_empty = sign_params(&[("timestamp", "1"), ("transformation", "")], "s");
        let without = sign_params(&[("timestamp", "1")], "s");
        assert_eq!(with_empty, without);
    }

    #[test]
    fn test_object_removal_delivery_url() {
        let url = delivery_url("demo", "folder/img_1", &object_removal("tree"));
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/e_gen_remove:prompt_tree/folder/img_1"
        );
    }
}
