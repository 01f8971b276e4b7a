mod auth;
mod config;
mod creations;
mod db;
mod errors;
mod extractors;
mod generation;
mod llm_client;
mod media;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::identity::ClerkClient;
use crate::auth::usage::{MetadataUsageLedger, RedisUsageLedger, UsageLedger};
use crate::config::{Config, UsageBackend};
use crate::creations::store::PgCreationStore;
use crate::db::create_pool;
use crate::llm_client::GeminiClient;
use crate::media::{ClipdropClient, CloudinaryClient, PdfExtractClient};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize identity provider
    let clerk = Arc::new(
        ClerkClient::new(config.clerk_secret_key.clone(), &config.clerk_jwt_key)?
            .with_authorized_parties(config.clerk_authorized_parties.clone()),
    );
    info!("Identity provider client initialized");

    // Initialize usage ledger
    let usage: Arc<dyn UsageLedger> = match &config.usage_backend {
        UsageBackend::Metadata => Arc::new(MetadataUsageLedger::new(clerk.clone())),
        UsageBackend::Redis { url } => {
            Arc::new(RedisUsageLedger::new(redis::Client::open(url.as_str())?))
        }
    };
    info!("Usage ledger initialized ({})", config.usage_backend.name());

    // Initialize vendor clients
    let text = GeminiClient::new(config.gemini_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let images = ClipdropClient::new(config.clipdrop_api_key.clone())?;
    let hosting = CloudinaryClient::new(
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_api_key.clone(),
        config.cloudinary_api_secret.clone(),
    )?;
    info!(
        "Image clients initialized (cloud: {})",
        config.cloudinary_cloud_name
    );

    // Build app state
    let state = AppState {
        creations: Arc::new(PgCreationStore::new(db)),
        identity: clerk,
        usage,
        text: Arc::new(text),
        images: Arc::new(images),
        hosting: Arc::new(hosting),
        pdf: Arc::new(PdfExtractClient),
        limits: config.limits,
        upload_body_limit_bytes: config.upload_body_limit_bytes,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
