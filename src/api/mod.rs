//! HTTP client for the blogging backend.
//!
//! Every authenticated call goes through [`ApiClient::send_authed`], the one place that gates on
//! session expiry, attaches the bearer token and turns a 401/403 into a sign-out.

mod models;

use std::sync::Arc;

use reqwest::{RequestBuilder, Response, StatusCode};
use url::Url;

use crate::error::{AppError, AppResult};
use crate::identity::SessionManager;

pub use models::{Comment, Credentials, Post, PostDraft, SignUpForm};
use models::{ContentBody, PinBody, UploadResponse};

#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(base: Url, session: Arc<SessionManager>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("postboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(base, http, session))
    }

    pub fn with_client(mut base: Url, http: reqwest::Client, session: Arc<SessionManager>) -> Self {
        // relative joins below must land under any path prefix of the base
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        Self { base, http, session }
    }

    pub fn base(&self) -> &Url { &self.base }
    pub fn session(&self) -> &Arc<SessionManager> { &self.session }

    fn url(&self, path: &str) -> AppResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| AppError::internal("bad_path".to_string(), format!("{}: {}", path, e)))
    }

    /// Authenticated request: expiry gate, bearer header, uniform 401/403 handling.
    async fn send_authed(&self, req: RequestBuilder) -> AppResult<Response> {
        let sess = self.session.require_active()?;
        let resp = req.bearer_auth(sess.token()).send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(target: "postboard::api", "backend rejected credentials for {} (HTTP {}), signing out", sess.subject(), status.as_u16());
            self.session.invalidate("session_invalidated");
            return Err(AppError::auth("session_invalidated", "the server rejected the current session"));
        }
        ensure_success(resp).await
    }

    async fn send_public(&self, req: RequestBuilder) -> AppResult<Response> {
        let resp = req.send().await?;
        ensure_success(resp).await
    }

    pub async fn list_posts(&self) -> AppResult<Vec<Post>> {
        let url = self.url("posts")?;
        tracing::debug!(target: "postboard::api", "GET {}", url);
        Ok(self.send_public(self.http.get(url)).await?.json().await?)
    }

    pub async fn get_post(&self, id: i64) -> AppResult<Post> {
        let url = self.url(&format!("posts/{}", id))?;
        tracing::debug!(target: "postboard::api", "GET {}", url);
        Ok(self.send_public(self.http.get(url)).await?.json().await?)
    }

    /// Same resource as `get_post`, fetched with the viewer's credentials (editor flow).
    pub async fn get_post_authed(&self, id: i64) -> AppResult<Post> {
        let url = self.url(&format!("posts/{}", id))?;
        tracing::debug!(target: "postboard::api", "GET {} (authed)", url);
        Ok(self.send_authed(self.http.get(url)).await?.json().await?)
    }

    pub async fn create_post(&self, draft: &PostDraft) -> AppResult<()> {
        let url = self.url("posts")?;
        tracing::debug!(target: "postboard::api", "POST {}", url);
        self.send_authed(self.http.post(url).json(draft)).await?;
        Ok(())
    }

    pub async fn update_post(&self, id: i64, draft: &PostDraft) -> AppResult<()> {
        let url = self.url(&format!("posts/{}", id))?;
        tracing::debug!(target: "postboard::api", "PUT {}", url);
        self.send_authed(self.http.put(url).json(draft)).await?;
        Ok(())
    }

    pub async fn delete_post(&self, id: i64) -> AppResult<()> {
        let url = self.url(&format!("posts/{}", id))?;
        tracing::debug!(target: "postboard::api", "DELETE {}", url);
        self.send_authed(self.http.delete(url)).await?;
        Ok(())
    }

    pub async fn set_pinned(&self, id: i64, pinned: bool) -> AppResult<()> {
        let url = self.url(&format!("posts/{}/pin", id))?;
        tracing::debug!(target: "postboard::api", "PATCH {} is_pinned={}", url, pinned);
        self.send_authed(self.http.patch(url).json(&PinBody { is_pinned: pinned })).await?;
        Ok(())
    }

    /// Upload an image and return the URL the backend stored it under.
    pub async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        let url = self.url("posts/upload/image")?;
        tracing::debug!(target: "postboard::api", "POST {} file={} bytes={}", url, file_name, bytes.len());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(image_mime(file_name))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self.send_authed(self.http.post(url).multipart(form)).await?;
        let body: UploadResponse = resp.json().await?;
        Ok(body.url)
    }

    pub async fn list_comments(&self, post_id: i64) -> AppResult<Vec<Comment>> {
        let url = self.url(&format!("comment/post/{}", post_id))?;
        tracing::debug!(target: "postboard::api", "GET {}", url);
        Ok(self.send_public(self.http.get(url)).await?.json().await?)
    }

    pub async fn create_comment(&self, post_id: i64, content: &str) -> AppResult<()> {
        let url = self.url(&format!("comment/{}", post_id))?;
        tracing::debug!(target: "postboard::api", "POST {}", url);
        self.send_authed(self.http.post(url).json(&ContentBody { content })).await?;
        Ok(())
    }

    pub async fn update_comment(&self, comment_id: i64, content: &str) -> AppResult<()> {
        let url = self.url(&format!("comment/{}", comment_id))?;
        tracing::debug!(target: "postboard::api", "PUT {}", url);
        self.send_authed(self.http.put(url).json(&ContentBody { content })).await?;
        Ok(())
    }

    pub async fn delete_comment(&self, comment_id: i64) -> AppResult<()> {
        let url = self.url(&format!("comment/{}", comment_id))?;
        tracing::debug!(target: "postboard::api", "DELETE {}", url);
        self.send_authed(self.http.delete(url)).await?;
        Ok(())
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> AppResult<()> {
        let url = self.url("user/sign-up")?;
        tracing::debug!(target: "postboard::api", "POST {} user={}", url, form.username);
        self.send_public(self.http.post(url).json(form)).await?;
        Ok(())
    }

    /// Exchange credentials for a bearer token. The token is returned as-is; adopting it is the
    /// session manager's job.
    pub async fn sign_in(&self, creds: &Credentials) -> AppResult<String> {
        let url = self.url("user/sign-in")?;
        tracing::debug!(target: "postboard::api", "POST {} user={}", url, creds.username);
        let resp = match self.send_public(self.http.post(url).json(creds)).await {
            Ok(r) => r,
            Err(e) if e.requires_sign_in() => {
                return Err(AppError::auth("invalid_credentials", "username or password is incorrect"));
            }
            Err(e) => return Err(e),
        };
        let v: serde_json::Value = resp.json().await?;
        match v.get("token").and_then(|t| t.as_str()) {
            Some(t) if !t.is_empty() => Ok(t.to_string()),
            _ => Err(AppError::auth("invalid_token", "sign-in response did not contain a token")),
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.base.as_str()).field("session", &self.session).finish()
    }
}

async fn ensure_success(resp: Response) -> AppResult<Response> {
    let status = resp.status();
    if status.is_success() { return Ok(resp); }
    let body = resp.text().await.unwrap_or_default();
    let detail = error_detail(&body);
    tracing::debug!(target: "postboard::api", "HTTP {}: {}", status.as_u16(), detail);
    Err(AppError::from_http_status(status.as_u16(), &detail))
}

/// Pull a human readable reason out of an error body (`detail`, `message` or `error`).
fn error_detail(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(s) = v.get(key).and_then(|x| x.as_str()) { return s.to_string(); }
        }
    }
    body.chars().take(200).collect()
}

fn image_mime(file_name: &str) -> &'static str {
    let ext = file_name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
