//! Auth gate: resolves `(user_id, plan, free_usage)` for every API request.

pub mod identity;
pub mod usage;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::identity::IdentityProvider;
use crate::auth::usage::UsageLedger;
use crate::errors::AppError;
use crate::state::AppState;

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    /// Anything other than an explicit `"premium"` is the free plan.
    pub fn from_metadata(value: Option<&str>) -> Self {
        match value {
            Some("premium") => Plan::Premium,
            _ => Plan::Free,
        }
    }

    pub fn is_premium(self) -> bool {
        self == Plan::Premium
    }
}

/// The authenticated caller, as seen by capability handlers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub plan: Plan,
    pub free_usage: u32,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        resolve(state.identity.as_ref(), state.usage.as_ref(), token).await
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))
}

/// Resolves identity, plan and usage. A user seen for the first time has
/// their counter initialized to 0, so this may write even on read-only routes.
pub async fn resolve(
    identity: &dyn IdentityProvider,
    usage: &dyn UsageLedger,
    token: &str,
) -> Result<AuthContext, AppError> {
    let user_id = identity
        .authenticate(token)
        .await
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let profile = identity
        .profile(&user_id)
        .await
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let stored = if usage.stored_on_identity() {
        profile.free_usage
    } else {
        usage
            .get(&user_id)
            .await
            .map_err(|e| AppError::Unauthorized(format!("{e:#}")))?
    };

    let free_usage = match stored {
        Some(count) => count,
        None => {
            usage
                .set(&user_id, 0)
                .await
                .map_err(|e| AppError::Unauthorized(format!("{e:#}")))?;
            info!("Initialized free usage for user {user_id}");
            0
        }
    };

    Ok(AuthContext {
        user_id,
        plan: profile.plan,
        free_usage,
    })
}
