//! Capability gating and input validation. Everything here runs before any
//! vendor call is made.

use crate::auth::AuthContext;
use crate::config::Limits;
use crate::errors::AppError;
use crate::models::creation::CreationKind;

pub const DEFAULT_ARTICLE_LENGTH: u32 = 500;
pub const DEFAULT_BLOG_TITLE_LENGTH: u32 = 100;
pub const TEXT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Article,
    BlogTitle,
    Image,
    RemoveBackground,
    RemoveObject,
    ResumeReview,
}

/// How a capability is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Any plan while under the free usage limit; premium is never limited.
    FreeUsage,
    /// Premium plan only, regardless of usage.
    PremiumOnly,
}

impl Capability {
    pub fn gate(self) -> Gate {
        match self {
            Capability::Article | Capability::BlogTitle => Gate::FreeUsage,
            Capability::Image
            | Capability::RemoveBackground
            | Capability::RemoveObject
            | Capability::ResumeReview => Gate::PremiumOnly,
        }
    }

    pub fn kind(self) -> CreationKind {
        match self {
            Capability::Article => CreationKind::Article,
            Capability::BlogTitle => CreationKind::BlogTitle,
            Capability::Image | Capability::RemoveBackground | Capability::RemoveObject => {
                CreationKind::Image
            }
            Capability::ResumeReview => CreationKind::ReviewResume,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Capability::Article => "generate-article",
            Capability::BlogTitle => "generate-blog-title",
            Capability::Image => "generate-image",
            Capability::RemoveBackground => "remove-image-background",
            Capability::RemoveObject => "remove-image-object",
            Capability::ResumeReview => "resume-review",
        }
    }

    /// Output budget for text capabilities when the caller gives no (or a zero) length.
    pub fn default_length(self) -> Option<u32> {
        match self {
            Capability::Article => Some(DEFAULT_ARTICLE_LENGTH),
            Capability::BlogTitle => Some(DEFAULT_BLOG_TITLE_LENGTH),
            _ => None,
        }
    }
}

/// Admits or rejects `auth` for `capability`.
pub fn check_access(
    capability: Capability,
    auth: &AuthContext,
    limits: &Limits,
) -> Result<(), AppError> {
    match capability.gate() {
        Gate::FreeUsage => {
            if !auth.plan.is_premium() && auth.free_usage >= limits.free_usage_limit {
                return Err(AppError::LimitReached);
            }
        }
        Gate::PremiumOnly => {
            if !auth.plan.is_premium() {
                return Err(AppError::PremiumOnly);
            }
        }
    }
    Ok(())
}

/// Whether a successful call should add one to the caller's free usage.
pub fn counts_toward_usage(capability: Capability, auth: &AuthContext) -> bool {
    capability.gate() == Gate::FreeUsage && !auth.plan.is_premium()
}

pub fn require_prompt(prompt: &str) -> Result<&str, AppError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("Prompt cannot be empty".to_string()));
    }
    Ok(prompt)
}

/// The object name for generative removal: exactly one word of letters,
/// digits, `-` or `_`. It ends up inside a delivery URL.
pub fn validate_object_name(raw: &str) -> Result<&str, AppError> {
    let object = raw.trim();
    if object.is_empty() {
        return Err(AppError::Validation(
            "Please enter object to remove".to_string(),
        ));
    }
    if object.split_whitespace().count() > 1 {
        return Err(AppError::Validation(
            "Please enter only one object name".to_string(),
        ));
    }
    if !object
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "Object name may only contain letters, digits, '-' or '_'".to_string(),
        ));
    }
    Ok(object)
}

pub fn check_resume_size(size: usize, max_bytes: usize) -> Result<(), AppError> {
    if size > max_bytes {
        return Err(AppError::Validation(format!(
            "Resume file size exceeds allowed size ({}).",
            format_size(max_bytes)
        )));
    }
    Ok(())
}

/// Whole MiB or KiB when exact, otherwise plain bytes.
fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * KIB;
    match bytes {
        b if b >= MIB && b % MIB == 0 => format!("{}MB", b / MIB),
        b if b >= KIB && b % KIB == 0 => format!("{}KB", b / KIB),
        b => format!("{b} bytes"),
    }
}
