//! Identity provider seam.
//!
//! Session tokens are verified locally against the provider's PEM public key;
//! plan and usage metadata are read from (and written to) the Clerk backend API.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::auth::Plan;

const CLERK_API_URL: &str = "https://api.clerk.com/v1";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Session token issued for unauthorized party '{0}'")]
    UnauthorizedParty(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Resolves who is calling and which plan they are on.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validates an opaque bearer credential and returns the user id it belongs to.
    async fn authenticate(&self, token: &str) -> Result<String, IdentityError>;

    async fn profile(&self, user_id: &str) -> Result<UserProfile, IdentityError>;
}

/// What one user lookup yields: the plan, plus the free usage counter when the
/// provider stores it on the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserProfile {
    pub plan: Plan,
    pub free_usage: Option<u32>,
}

/// Private metadata fields this service reads. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct PrivateMetadata {
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub free_usage: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    #[serde(default)]
    private_metadata: Option<PrivateMetadata>,
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    azp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClerkErrorBody {
    errors: Vec<ClerkErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ClerkErrorEntry {
    message: String,
}

/// Clerk backend API client.
pub struct ClerkClient {
    client: Client,
    secret_key: String,
    api_url: String,
    decoding_key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl ClerkClient {
    /// `jwt_public_key_pem` is the instance's JWT verification key (PEM, RS256).
    pub fn new(secret_key: String, jwt_public_key_pem: &str) -> Result<Self, IdentityError> {
        let decoding_key = DecodingKey::from_rsa_pem(jwt_public_key_pem.as_bytes())?;
        Self::with_decoding_key(secret_key, decoding_key, Algorithm::RS256)
    }

    pub fn with_decoding_key(
        secret_key: String,
        decoding_key: DecodingKey,
        algorithm: Algorithm,
    ) -> Result<Self, IdentityError> {
        let mut validation = Validation::new(algorithm);
        // Session tokens carry `azp`, not `aud`.
        validation.validate_aud = false;

        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            secret_key,
            api_url: CLERK_API_URL.to_string(),
            decoding_key,
            validation,
            authorized_parties: Vec::new(),
        })
    }

    /// Origins allowed in the `azp` claim. Empty accepts any origin.
    pub fn with_authorized_parties(mut self, parties: Vec<String>) -> Self {
        self.authorized_parties = parties;
        self
    }

    /// Verifies signature, expiry and (when configured) `azp`, returning the `sub` claim.
    pub fn verify_session_token(&self, token: &str) -> Result<String, IdentityError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?.claims;

        if !self.authorized_parties.is_empty() {
            let azp = claims.azp.as_deref().unwrap_or_default();
            if !self.authorized_parties.iter().any(|p| p == azp) {
                return Err(IdentityError::UnauthorizedParty(azp.to_string()));
            }
        }
        Ok(claims.sub)
    }

    pub async fn private_metadata(&self, user_id: &str) -> Result<PrivateMetadata, IdentityError> {
        let response = self
            .client
            .get(format!("{}/users/{user_id}", self.api_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let response = check_status(response).await?;
        let user: ClerkUser = response.json().await?;
        Ok(user.private_metadata.unwrap_or_default())
    }

    /// Merges `patch` into the user's private metadata.
    pub async fn merge_private_metadata(
        &self,
        user_id: &str,
        patch: serde_json::Value,
    ) -> Result<(), IdentityError> {
        let response = self
            .client
            .patch(format!("{}/users/{user_id}/metadata", self.api_url))
            .bearer_auth(&self.secret_key)
            .json(&json!({ "private_metadata": patch }))
            .send()
            .await?;

        check_status(response).await?;
        debug!("Updated private metadata for user {user_id}");
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ClerkErrorBody>(&body)
        .ok()
        .and_then(|e| e.errors.into_iter().next())
        .map(|e| e.message)
        .unwrap_or(body);
    Err(IdentityError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn authenticate(&self, token: &str) -> Result<String, IdentityError> {
        self.verify_session_token(token)
    }

    async fn profile(&self, user_id: &str) -> Result<UserProfile, IdentityError> {
        let metadata = self.private_metadata(user_id).await?;
        Ok(UserProfile {
            plan: Plan::from_metadata(metadata.plan.as_deref()),
            free_usage: metadata.free_usage,
        })
    }
}
