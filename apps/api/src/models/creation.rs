use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One persisted generation or transform result.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreationRow {
    pub id: Uuid,
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub publish: bool,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The `type` column. Background and object removal both store `Image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreationKind {
    Article,
    BlogTitle,
    Image,
    ReviewResume,
}

impl CreationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CreationKind::Article => "article",
            CreationKind::BlogTitle => "blog-title",
            CreationKind::Image => "image",
            CreationKind::ReviewResume => "review-resume",
        }
    }
}

/// Values for a new `creations` row; the store assigns `id`, `likes` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewCreation {
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    pub kind: CreationKind,
    pub publish: bool,
}
