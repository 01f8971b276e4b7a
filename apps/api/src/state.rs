use std::sync::Arc;

use crate::auth::identity::IdentityProvider;
use crate::auth::usage::UsageLedger;
use crate::config::Limits;
use crate::creations::store::CreationStore;
use crate::llm_client::TextGenerator;
use crate::media::{ImageHost, ImageSynthesizer, PdfExtractor};

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every external collaborator sits behind a trait object so the router can be
/// driven end-to-end against in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub creations: Arc<dyn CreationStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub usage: Arc<dyn UsageLedger>,
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageSynthesizer>,
    pub hosting: Arc<dyn ImageHost>,
    pub pdf: Arc<dyn PdfExtractor>,
    pub limits: Limits,
    /// Body limit applied to multipart upload routes.
    pub upload_body_limit_bytes: usize,
}
