//! Axum route handlers for the AI capabilities.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::extractors::json::AppJson;
use crate::generation::policy::{
    check_access, check_resume_size, counts_toward_usage, require_prompt, validate_object_name,
    Capability, DEFAULT_ARTICLE_LENGTH, TEXT_TEMPERATURE,
};
use crate::generation::upload::UploadForm;
use crate::llm_client::prompts::resume_review_prompt;
use crate::llm_client::GenerationParams;
use crate::media::cloudinary::{object_removal, BACKGROUND_REMOVAL};
use crate::media::{HostedImage, MediaError};
use crate::models::creation::NewCreation;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
    pub length: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: Option<String>,
    pub publish: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub success: bool,
    pub content: String,
}

impl ContentResponse {
    fn ok(content: String) -> Json<Self> {
        Json(Self {
            success: true,
            content,
        })
    }
}

fn media_error(e: MediaError) -> AppError {
    match e {
        MediaError::Pdf(msg) => AppError::Pdf(msg),
        other => AppError::ImageVendor(other.to_string()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/ai/generate-article
pub async fn handle_generate_article(
    auth: AuthContext,
    State(state): State<AppState>,
    AppJson(request): AppJson<TextRequest>,
) -> Result<Json<ContentResponse>, AppError> {
    generate_text(&state, &auth, Capability::Article, request).await
}

/// POST /api/ai/generate-blog-title
pub async fn handle_generate_blog_title(
    auth: AuthContext,
    State(state): State<AppState>,
    AppJson(request): AppJson<TextRequest>,
) -> Result<Json<ContentResponse>, AppError> {
    generate_text(&state, &auth, Capability::BlogTitle, request).await
}

/// POST /api/ai/generate-image
///
/// Text-to-image render, uploaded to the image host. `publish` defaults to false.
pub async fn handle_generate_image(
    auth: AuthContext,
    State(state): State<AppState>,
    AppJson(request): AppJson<ImageRequest>,
) -> Result<Json<ContentResponse>, AppError> {
    let capability = Capability::Image;
    check_access(capability, &auth, &state.limits)?;
    let prompt = require_prompt(&request.prompt)?;

    info!(
        "{} for user {} (size={:?}, publish={:?})",
        capability.name(),
        auth.user_id,
        request.size,
        request.publish
    );

    let image = state
        .images
        .text_to_image(prompt)
        .await
        .map_err(media_error)?;

    let hosted = state
        .hosting
        .upload(image, "generated.png", None)
        .await
        .map_err(media_error)?;

    let content = hosted.secure_url.clone();
    record_hosted_image(
        &state,
        &hosted,
        NewCreation {
            user_id: auth.user_id.clone(),
            prompt: prompt.to_string(),
            content: content.clone(),
            kind: capability.kind(),
            publish: request.publish.unwrap_or(false),
        },
    )
    .await?;

    Ok(ContentResponse::ok(content))
}

/// POST /api/ai/remove-image-background (multipart: `image`)
pub async fn handle_remove_background(
    auth: AuthContext,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ContentResponse>, AppError> {
    let capability = Capability::RemoveBackground;
    check_access(capability, &auth, &state.limits)?;

    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_file("image")?;

    info!(
        "{} for user {} ({} bytes)",
        capability.name(),
        auth.user_id,
        image.data.len()
    );

    let hosted = state
        .hosting
        .upload(image.data, &image.file_name, Some(BACKGROUND_REMOVAL))
        .await
        .map_err(media_error)?;

    let content = hosted.secure_url.clone();
    record_hosted_image(
        &state,
        &hosted,
        NewCreation {
            user_id: auth.user_id.clone(),
            prompt: "Remove background from image".to_string(),
            content: content.clone(),
            kind: capability.kind(),
            publish: false,
        },
    )
    .await?;

    Ok(ContentResponse::ok(content))
}

/// POST /api/ai/remove-image-object (multipart: `image`, `object`)
///
/// `object` must be a single word; anything else is rejected before upload.
pub async fn handle_remove_object(
    auth: AuthContext,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ContentResponse>, AppError> {
    let capability = Capability::RemoveObject;
    check_access(capability, &auth, &state.limits)?;

    let mut form = UploadForm::read(multipart).await?;
    let object = validate_object_name(form.field("object").unwrap_or_default())?.to_string();
    let image = form.take_file("image")?;

    info!(
        "{} for user {}: removing '{object}'",
        capability.name(),
        auth.user_id
    );

    let hosted = state
        .hosting
        .upload(image.data, &image.file_name, None)
        .await
        .map_err(media_error)?;

    let content = state
        .hosting
        .transformed_url(&hosted.public_id, &object_removal(&object));

    record_hosted_image(
        &state,
        &hosted,
        NewCreation {
            user_id: auth.user_id.clone(),
            prompt: format!("Remove {object} from image"),
            content: content.clone(),
            kind: capability.kind(),
            publish: false,
        },
    )
    .await?;

    Ok(ContentResponse::ok(content))
}

/// POST /api/ai/resume-review (multipart: `resume`, a PDF)
///
/// Oversize files are rejected before the PDF is parsed.
pub async fn handle_resume_review(
    auth: AuthContext,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ContentResponse>, AppError> {
    let capability = Capability::ResumeReview;
    check_access(capability, &auth, &state.limits)?;

    let mut form = UploadForm::read(multipart).await?;
    let resume = form.take_file("resume")?;
    check_resume_size(resume.data.len(), state.limits.max_resume_bytes)?;

    info!(
        "{} for user {} ({} bytes)",
        capability.name(),
        auth.user_id,
        resume.data.len()
    );

    let resume_text = state
        .pdf
        .extract_text(resume.data)
        .await
        .map_err(media_error)?;

    let content = state
        .text
        .generate(&resume_review_prompt(&resume_text), None)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    state
        .creations
        .insert(NewCreation {
            user_id: auth.user_id.clone(),
            prompt: "Review the uploaded resume".to_string(),
            content: content.clone(),
            kind: capability.kind(),
            publish: false,
        })
        .await?;

    Ok(ContentResponse::ok(content))
}

// ────────────────────────────────────────────────────────────────────────────
// Shared steps
// ────────────────────────────────────────────────────────────────────────────

async fn generate_text(
    state: &AppState,
    auth: &AuthContext,
    capability: Capability,
    request: TextRequest,
) -> Result<Json<ContentResponse>, AppError> {
    check_access(capability, auth, &state.limits)?;
    let prompt = require_prompt(&request.prompt)?;

    let max_output_tokens = request
        .length
        .filter(|l| *l > 0)
        .or(capability.default_length())
        .unwrap_or(DEFAULT_ARTICLE_LENGTH);

    info!(
        "{} for user {} (plan={:?}, usage={}, max_tokens={max_output_tokens})",
        capability.name(),
        auth.user_id,
        auth.plan,
        auth.free_usage
    );

    let content = state
        .text
        .generate(
            prompt,
            Some(GenerationParams {
                temperature: TEXT_TEMPERATURE,
                max_output_tokens,
            }),
        )
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    state
        .creations
        .insert(NewCreation {
            user_id: auth.user_id.clone(),
            prompt: prompt.to_string(),
            content: content.clone(),
            kind: capability.kind(),
            publish: false,
        })
        .await?;

    if counts_toward_usage(capability, auth) {
        // The creation is already stored; a failed counter update is logged, not surfaced.
        match state.usage.increment(&auth.user_id).await {
            Ok(usage) => info!("Free usage for user {} is now {usage}", auth.user_id),
            Err(e) => warn!("Failed to record free usage for user {}: {e:#}", auth.user_id),
        }
    }

    Ok(ContentResponse::ok(content))
}

/// Inserts the creation for an uploaded image. If the insert fails the upload
/// is destroyed; if that fails too, the public id is logged for reconciliation.
async fn record_hosted_image(
    state: &AppState,
    hosted: &HostedImage,
    creation: NewCreation,
) -> Result<(), AppError> {
    let Err(err) = state.creations.insert(creation).await else {
        return Ok(());
    };

    match state.hosting.destroy(&hosted.public_id).await {
        Ok(()) => info!(
            "Removed hosted image {} after failed insert",
            hosted.public_id
        ),
        Err(destroy_err) => warn!(
            public_id = %hosted.public_id,
            "Orphaned hosted image after failed insert: {destroy_err}"
        ),
    }
    Err(err)
}
