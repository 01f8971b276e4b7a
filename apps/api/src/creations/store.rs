use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::creation::{CreationRow, NewCreation};

/// Result of a like toggle: the caller's membership in `likes` afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}

impl LikeToggle {
    pub fn from_liked(liked: bool) -> Self {
        if liked {
            LikeToggle::Liked
        } else {
            LikeToggle::Unliked
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            LikeToggle::Liked => "Creation Liked",
            LikeToggle::Unliked => "Creation Unliked",
        }
    }
}

/// Append-only table of creations. Rows are never deleted; only `likes` changes.
#[async_trait]
pub trait CreationStore: Send + Sync {
    async fn insert(&self, creation: NewCreation) -> Result<CreationRow, AppError>;

    /// All rows owned by `user_id`, newest first.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<CreationRow>, AppError>;

    /// All rows with `publish = true`, newest first.
    async fn list_published(&self) -> Result<Vec<CreationRow>, AppError>;

    /// Adds `user_id` to the row's likes if absent, removes it if present.
    async fn toggle_like(&self, id: Uuid, user_id: &str) -> Result<LikeToggle, AppError>;
}

pub fn ensure_content(creation: &NewCreation) -> Result<(), AppError> {
    if creation.content.trim().is_empty() {
        return Err(AppError::Validation(
            "Refusing to store a creation with empty content".to_string(),
        ));
    }
    Ok(())
}

pub fn not_found() -> AppError {
    AppError::NotFound("Creation not found".to_string())
}

pub struct PgCreationStore {
    pool: PgPool,
}

impl PgCreationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreationStore for PgCreationStore {
    async fn insert(&self, creation: NewCreation) -> Result<CreationRow, AppError> {
        ensure_content(&creation)?;

        let row = sqlx::query_as::<_, CreationRow>(
            r#"
            INSERT INTO creations (user_id, prompt, content, type, publish)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&creation.user_id)
        .bind(&creation.prompt)
        .bind(&creation.content)
        .bind(creation.kind.as_str())
        .bind(creation.publish)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Inserted {} creation {} for user {}",
            row.kind, row.id, row.user_id
        );
        Ok(row)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<CreationRow>, AppError> {
        Ok(sqlx::query_as::<_, CreationRow>(
            "SELECT * FROM creations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_published(&self) -> Result<Vec<CreationRow>, AppError> {
        Ok(sqlx::query_as::<_, CreationRow>(
            "SELECT * FROM creations WHERE publish = true ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn toggle_like(&self, id: Uuid, user_id: &str) -> Result<LikeToggle, AppError> {
        // Single statement so concurrent toggles on one row serialize on the row lock.
        let liked: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE creations
            SET likes = CASE
                WHEN $2 = ANY(likes) THEN array_remove(likes, $2)
                ELSE array_append(likes, $2)
            END
            WHERE id = $1
            RETURNING $2 = ANY(likes)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        liked.map(LikeToggle::from_liked).ok_or_else(not_found)
    }
}
