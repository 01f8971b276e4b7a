//! In-memory implementations of every external seam, for handler and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::identity::{IdentityError, IdentityProvider, UserProfile};
use crate::auth::usage::UsageLedger;
use crate::auth::Plan;
use crate::config::Limits;
use crate::creations::store::{ensure_content, not_found, CreationStore, LikeToggle};
use crate::errors::AppError;
use crate::llm_client::{GenerationParams, LlmError, TextGenerator};
use crate::media::{
    HostedImage, ImageHost, ImageSynthesizer, MediaError, PdfExtractor,
};
use crate::models::creation::{CreationRow, NewCreation};
use crate::routes::build_router;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Creation store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCreationStore {
    rows: Mutex<Vec<CreationRow>>,
    pub fail_inserts: AtomicBool,
}

impl MemoryCreationStore {
    pub fn get(&self, id: Uuid) -> Option<CreationRow> {
        self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Synchronous `list_by_user`, for assertions.
    pub fn rows_for(&self, user_id: &str) -> Vec<CreationRow> {
        self.newest_first(|r| r.user_id == user_id)
    }

    fn newest_first(&self, keep: impl Fn(&CreationRow) -> bool) -> Vec<CreationRow> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| keep(*r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl CreationStore for MemoryCreationStore {
    async fn insert(&self, creation: NewCreation) -> Result<CreationRow, AppError> {
        ensure_content(&creation)?;
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("insert failed")));
        }

        let row = CreationRow {
            id: Uuid::new_v4(),
            user_id: creation.user_id,
            prompt: creation.prompt,
            content: creation.content,
            kind: creation.kind.as_str().to_string(),
            publish: creation.publish,
            likes: Vec::new(),
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<CreationRow>, AppError> {
        Ok(self.newest_first(|r| r.user_id == user_id))
    }

    async fn list_published(&self) -> Result<Vec<CreationRow>, AppError> {
        Ok(self.newest_first(|r| r.publish))
    }

    async fn toggle_like(&self, id: Uuid, user_id: &str) -> Result<LikeToggle, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.iter_mut().find(|r| r.id == id).ok_or_else(not_found)?;

        if let Some(pos) = row.likes.iter().position(|u| u == user_id) {
            row.likes.remove(pos);
            Ok(LikeToggle::Unliked)
        } else {
            row.likes.push(user_id.to_string());
            Ok(LikeToggle::Liked)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Identity and usage
// ────────────────────────────────────────────────────────────────────────────

/// Maps bearer tokens to `(user_id, plan)`. Unknown tokens are rejected.
#[derive(Default)]
pub struct FakeIdentity {
    users: HashMap<String, (String, Plan)>,
    usage: HashMap<String, u32>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, user_id: &str, plan: Plan) -> Self {
        self.users
            .insert(token.to_string(), (user_id.to_string(), plan));
        self
    }

    /// Free usage reported on the user's profile.
    pub fn with_usage(mut self, user_id: &str, usage: u32) -> Self {
        self.usage.insert(user_id.to_string(), usage);
        self
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn authenticate(&self, token: &str) -> Result<String, IdentityError> {
        self.users
            .get(token)
            .map(|(user, _)| user.clone())
            .ok_or_else(|| IdentityError::Api {
                status: 401,
                message: "Invalid session token".to_string(),
            })
    }

    async fn profile(&self, user_id: &str) -> Result<UserProfile, IdentityError> {
        let plan = self
            .users
            .values()
            .find(|(user, _)| user == user_id)
            .map(|(_, plan)| *plan)
            .unwrap_or(Plan::Free);
        Ok(UserProfile {
            plan,
            free_usage: self.usage.get(user_id).copied(),
        })
    }
}

#[derive(Default)]
pub struct MemoryUsageLedger {
    counts: Mutex<HashMap<String, u32>>,
    pub fail_increment: AtomicBool,
}

#[async_trait]
impl UsageLedger for MemoryUsageLedger {
    async fn get(&self, user_id: &str) -> anyhow::Result<Option<u32>> {
        Ok(self.counts.lock().unwrap().get(user_id).copied())
    }

    async fn set(&self, user_id: &str, usage: u32) -> anyhow::Result<()> {
        self.counts
            .lock()
            .unwrap()
            .insert(user_id.to_string(), usage);
        Ok(())
    }

    async fn increment(&self, user_id: &str) -> anyhow::Result<u32> {
        if self.fail_increment.load(Ordering::SeqCst) {
            anyhow::bail!("usage store unavailable");
        }
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vendors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeText {
    pub calls: Mutex<Vec<(String, Option<GenerationParams>)>>,
    pub fail: AtomicBool,
}

impl FakeText {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate(
        &self,
        prompt: &str,
        params: Option<GenerationParams>,
    ) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), params));
        if self.fail.load(Ordering::SeqCst) {
            return Err(LlmError::Api {
                status: 503,
                message: "model overloaded".to_string(),
            });
        }
        Ok(format!("Generated: {prompt}"))
    }
}

#[derive(Default)]
pub struct FakeImages {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ImageSynthesizer for FakeImages {
    async fn text_to_image(&self, _prompt: &str) -> Result<Bytes, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from_static(b"\x89PNG fake"))
    }
}

#[derive(Default)]
pub struct FakeHost {
    pub uploads: Mutex<Vec<Option<String>>>,
    pub destroyed: Mutex<Vec<String>>,
    pub fail_destroy: AtomicBool,
}

impl FakeHost {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageHost for FakeHost {
    async fn upload(
        &self,
        _data: Bytes,
        _file_name: &str,
        transformation: Option<&str>,
    ) -> Result<HostedImage, MediaError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(transformation.map(String::from));
        let public_id = format!("img_{}", uploads.len());
        Ok(HostedImage {
            secure_url: format!("https://img.test/{public_id}.png"),
            public_id,
        })
    }

    fn transformed_url(&self, public_id: &str, transformation: &str) -> String {
        format!("https://img.test/{transformation}/{public_id}")
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(MediaError::Api {
                vendor: "fake-host",
                status: 500,
                message: "destroy failed".to_string(),
            });
        }
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePdf {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PdfExtractor for FakePdf {
    async fn extract_text(&self, data: Bytes) -> Result<String, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("resume text ({} bytes)", data.len()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Router harness
// ────────────────────────────────────────────────────────────────────────────

pub const FREE_TOKEN: &str = "tok_free";
pub const PREMIUM_TOKEN: &str = "tok_premium";
pub const FREE_USER: &str = "user_free";
pub const PREMIUM_USER: &str = "user_premium";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryCreationStore>,
    pub usage: Arc<MemoryUsageLedger>,
    pub text: Arc<FakeText>,
    pub images: Arc<FakeImages>,
    pub host: Arc<FakeHost>,
    pub pdf: Arc<FakePdf>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryCreationStore::default());
        let usage = Arc::new(MemoryUsageLedger::default());
        let text = Arc::new(FakeText::default());
        let images = Arc::new(FakeImages::default());
        let host = Arc::new(FakeHost::default());
        let pdf = Arc::new(FakePdf::default());
        let identity = FakeIdentity::new()
            .with_user(FREE_TOKEN, FREE_USER, Plan::Free)
            .with_user(PREMIUM_TOKEN, PREMIUM_USER, Plan::Premium);

        let state = AppState {
            creations: store.clone(),
            identity: Arc::new(identity),
            usage: usage.clone(),
            text: text.clone(),
            images: images.clone(),
            hosting: host.clone(),
            pdf: pdf.clone(),
            limits: Limits::default(),
            upload_body_limit_bytes: 20 * 1024 * 1024,
        };

        Self {
            router: build_router(state),
            store,
            usage,
            text,
            images,
            host,
            pdf,
        }
    }

    /// Sends a request and returns `(status, json body)`.
    pub async fn send(&self, request: Request<Body>) -> (u16, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn post_json(&self, path: &str, token: &str, body: Value) -> Value {
        let request = Request::post(path)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await.1
    }

    pub async fn get(&self, path: &str, token: &str) -> Value {
        let request = Request::get(path)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await.1
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        token: &str,
        parts: &[MultipartPart<'_>],
    ) -> Value {
        let (content_type, body) = multipart_body(parts);
        let request = Request::post(path)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await.1
    }
}

pub enum MultipartPart<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, Vec<u8>),
}

const BOUNDARY: &str = "----studio-test-boundary";

pub fn multipart_body(parts: &[MultipartPart<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            MultipartPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            MultipartPart::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
