use async_trait::async_trait;
use bytes::Bytes;

use super::{MediaError, PdfExtractor};

/// Extracts text with `pdf-extract` on the blocking thread pool.
#[derive(Clone, Default)]
pub struct PdfExtractClient;

#[async_trait]
impl PdfExtractor for PdfExtractClient {
    async fn extract_text(&self, data: Bytes) -> Result<String, MediaError> {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
            .await
            .map_err(|e| MediaError::Pdf(format!("extraction task failed: {e}")))?
            .map_err(|e| MediaError::Pdf(e.to_string()))
    }
}
