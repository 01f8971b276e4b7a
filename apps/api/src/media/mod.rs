//! Image and document vendors: text-to-image synthesis, image hosting with
//! transformations, and PDF text extraction.

pub mod clipdrop;
pub mod cloudinary;
pub mod pdf;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use clipdrop::ClipdropClient;
pub use cloudinary::CloudinaryClient;
pub use pdf::PdfExtractClient;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{vendor} error (status {status}): {message}")]
    Api {
        vendor: &'static str,
        status: u16,
        message: String,
    },

    #[error("{0} returned an empty body")]
    EmptyBody(&'static str),

    #[error("Failed to read PDF: {0}")]
    Pdf(String),
}

/// Renders an image from a text prompt.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Returns the encoded image (PNG).
    async fn text_to_image(&self, prompt: &str) -> Result<Bytes, MediaError>;
}

/// An image stored by the hosting vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    pub public_id: String,
    pub secure_url: String,
}

/// Stores images and serves transformed variants.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Uploads `data`. When `transformation` is set it is applied to the stored asset.
    async fn upload(
        &self,
        data: Bytes,
        file_name: &str,
        transformation: Option<&str>,
    ) -> Result<HostedImage, MediaError>;

    /// Delivery URL for `public_id` with `transformation` applied on the fly.
    fn transformed_url(&self, public_id: &str, transformation: &str) -> String;

    /// Deletes an uploaded asset.
    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;
}

#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract_text(&self, data: Bytes) -> Result<String, MediaError>;
}
