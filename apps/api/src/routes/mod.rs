pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::creations::handlers as creations;
use crate::generation::handlers as generation;
use crate::generation::upload::upload_body_limit;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.upload_body_limit_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // AI capabilities
        .route(
            "/api/ai/generate-article",
            post(generation::handle_generate_article),
        )
        .route(
            "/api/ai/generate-blog-title",
            post(generation::handle_generate_blog_title),
        )
        .route(
            "/api/ai/generate-image",
            post(generation::handle_generate_image),
        )
        .route(
            "/api/ai/remove-image-background",
            post(generation::handle_remove_background).layer(upload_body_limit(upload_limit)),
        )
        .route(
            "/api/ai/remove-image-object",
            post(generation::handle_remove_object).layer(upload_body_limit(upload_limit)),
        )
        .route(
            "/api/ai/resume-review",
            post(generation::handle_resume_review).layer(upload_body_limit(upload_limit)),
        )
        // Creations
        .route(
            "/api/user/get-user-creations",
            get(creations::handle_get_user_creations),
        )
        .route(
            "/api/user/get-published-creations",
            get(creations::handle_get_published_creations),
        )
        .route(
            "/api/user/toggle-like-creation",
            post(creations::handle_toggle_like),
        )
        .with_state(state)
}
