use anyhow::{bail, Context, Result};

/// Where the per-user free usage counter lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageBackend {
    /// Private metadata on the identity provider's user record.
    Metadata,
    /// Redis key per user, incremented atomically.
    Redis { url: String },
}

impl UsageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            UsageBackend::Metadata => "metadata",
            UsageBackend::Redis { .. } => "redis",
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub clerk_secret_key: String,
    pub clerk_jwt_key: String,
    /// Accepted `azp` origins for session tokens; empty disables the check.
    pub clerk_authorized_parties: Vec<String>,
    pub gemini_api_key: String,
    pub clipdrop_api_key: String,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,
    pub usage_backend: UsageBackend,
    pub limits: Limits,
    pub upload_body_limit_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

/// Request-level limits enforced by the generation handlers.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Number of text generations a free-plan user may run.
    pub free_usage_limit: u32,
    pub max_resume_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            free_usage_limit: 10,
            max_resume_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Limits::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            clerk_secret_key: require_env("CLERK_SECRET_KEY")?,
            clerk_jwt_key: require_env("CLERK_JWT_KEY")?,
            clerk_authorized_parties: parse_list(
                &std::env::var("CLERK_AUTHORIZED_PARTIES").unwrap_or_default(),
            ),
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            clipdrop_api_key: require_env("CLIPDROP_API_KEY")?,
            cloudinary_cloud_name: require_env("CLOUDINARY_CLOUD_NAME")?,
            cloudinary_api_key: require_env("CLOUDINARY_API_KEY")?,
            cloudinary_api_secret: require_env("CLOUDINARY_API_SECRET")?,
            usage_backend: usage_backend_from_env()?,
            limits: Limits {
                free_usage_limit: parse_env("FREE_USAGE_LIMIT", defaults.free_usage_limit)?,
                max_resume_bytes: parse_env("MAX_RESUME_BYTES", defaults.max_resume_bytes)?,
            },
            upload_body_limit_bytes: parse_env("UPLOAD_BODY_LIMIT_BYTES", 20 * 1024 * 1024)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn usage_backend_from_env() -> Result<UsageBackend> {
    let backend = std::env::var("USAGE_BACKEND").unwrap_or_else(|_| "metadata".to_string());
    parse_usage_backend(&backend, std::env::var("REDIS_URL").ok())
}

fn parse_usage_backend(backend: &str, redis_url: Option<String>) -> Result<UsageBackend> {
    match backend.trim().to_ascii_lowercase().as_str() {
        "metadata" => Ok(UsageBackend::Metadata),
        "redis" => {
            let url = redis_url
                .context("Required environment variable 'REDIS_URL' is not set (USAGE_BACKEND=redis)")?;
            Ok(UsageBackend::Redis { url })
        }
        other => bail!("USAGE_BACKEND must be 'metadata' or 'redis', got '{other}'"),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}
