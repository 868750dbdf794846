//! Shared fixtures: unsigned test tokens and an in-process mock of the blogging backend.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU16, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use url::Url;

use postboard::api::ApiClient;
use postboard::error::{AppError, AppResult};
use postboard::identity::{decode_claims, FileStorage, FixedClock, MemoryStorage, SessionManager, TokenStorage};

pub const NOW: i64 = 1_700_000_000;
pub const PASSWORD: &str = "secret";
pub const UPLOAD_URL: &str = "https://cdn.test/uploads/photo.png";

/// header.payload.signature with a JSON payload; the signature is never checked client side.
pub fn token(sub: &str, exp: i64, admin: bool) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": sub, "exp": exp, "iat": NOW, "admin": admin}).to_string());
    format!("{}.{}.sig", header, payload)
}

#[derive(Default)]
pub struct MockBackend {
    /// "METHOD /path" for every request that reached the backend.
    pub requests: Mutex<Vec<String>>,
    pub bodies: Mutex<Vec<Value>>,
    pub auth_headers: Mutex<Vec<String>>,
    pub posts: Mutex<Vec<Value>>,
    pub comments: Mutex<Vec<Value>>,
    /// When non-zero, every authenticated call is answered with this status (401 or 403).
    pub reject_status: AtomicU16,
    /// Make the comment listing fail with 500.
    pub fail_comments: AtomicBool,
    /// Lifetime of tokens handed out by sign-in.
    pub token_ttl: AtomicI64,
    next_id: AtomicI64,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        let s = Self::default();
        s.token_ttl.store(3600, Ordering::SeqCst);
        s.next_id.store(100, Ordering::SeqCst);
        Arc::new(s)
    }

    pub fn seed_post(&self, id: i64, title: &str, content: &str, username: &str, is_pinned: bool) {
        self.posts.lock().push(json!({"id": id, "title": title, "content": content, "username": username, "is_pinned": is_pinned}));
    }

    pub fn seed_comment(&self, id: i64, post_id: i64, content: &str, username: &str) {
        self.comments.lock().push(json!({"id": id, "post_id": post_id, "content": content, "username": username}));
    }

    pub fn reject_with(&self, status: u16) { self.reject_status.store(status, Ordering::SeqCst); }

    pub fn saw(&self, line: &str) -> bool { self.requests.lock().iter().any(|r| r == line) }
    pub fn request_count(&self) -> usize { self.requests.lock().len() }
    pub fn last_body(&self) -> Option<Value> { self.bodies.lock().last().cloned() }

    fn record(&self, line: String) { self.requests.lock().push(line); }
    fn next_id(&self) -> i64 { self.next_id.fetch_add(1, Ordering::SeqCst) }
}

type Shared = Arc<MockBackend>;

fn detail(status: StatusCode, msg: &str) -> Response { (status, Json(json!({"detail": msg}))).into_response() }

/// Subject of the bearer token, or the error response the backend would send.
fn authorize(state: &MockBackend, headers: &HeaderMap) -> Result<String, Response> {
    let raw = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or("");
    state.auth_headers.lock().push(raw.to_string());
    let Some(tok) = raw.strip_prefix("Bearer ") else { return Err(detail(StatusCode::UNAUTHORIZED, "Not authenticated")) };
    match state.reject_status.load(Ordering::SeqCst) {
        0 => {}
        401 => return Err(detail(StatusCode::UNAUTHORIZED, "Could not validate credentials")),
        _ => return Err(detail(StatusCode::FORBIDDEN, "Not enough permissions")),
    }
    decode_claims(tok).map(|c| c.sub).map_err(|_| detail(StatusCode::UNAUTHORIZED, "Invalid token"))
}

async fn list_posts(State(s): State<Shared>, headers: HeaderMap) -> Response {
    s.record("GET /posts".to_string());
    let raw = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or("");
    s.auth_headers.lock().push(raw.to_string());
    Json(s.posts.lock().clone()).into_response()
}

async fn create_post(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    s.record("POST /posts".to_string());
    s.bodies.lock().push(body.clone());
    let sub = match authorize(&s, &headers) { Ok(sub) => sub, Err(r) => return r };
    let id = s.next_id();
    s.seed_post(id, body["title"].as_str().unwrap_or(""), body["content"].as_str().unwrap_or(""), &sub, false);
    (StatusCode::CREATED, Json(json!({"id": id}))).into_response()
}

async fn get_post(State(s): State<Shared>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    s.record(format!("GET /posts/{}", id));
    // public route; a bearer token, when sent, is still checked
    if headers.contains_key("authorization") {
        if let Err(r) = authorize(&s, &headers) { return r; }
    }
    match s.posts.lock().iter().find(|p| p["id"] == id) {
        Some(p) => Json(p.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Post not found"),
    }
}

async fn update_post(State(s): State<Shared>, Path(id): Path<i64>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    s.record(format!("PUT /posts/{}", id));
    s.bodies.lock().push(body.clone());
    if let Err(r) = authorize(&s, &headers) { return r; }
    let mut posts = s.posts.lock();
    match posts.iter_mut().find(|p| p["id"] == id) {
        Some(p) => {
            p["title"] = body["title"].clone();
            p["content"] = body["content"].clone();
            StatusCode::OK.into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Post not found"),
    }
}

async fn delete_post(State(s): State<Shared>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    s.record(format!("DELETE /posts/{}", id));
    if let Err(r) = authorize(&s, &headers) { return r; }
    s.posts.lock().retain(|p| p["id"] != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn pin_post(State(s): State<Shared>, Path(id): Path<i64>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    s.record(format!("PATCH /posts/{}/pin", id));
    s.bodies.lock().push(body.clone());
    if let Err(r) = authorize(&s, &headers) { return r; }
    if let Some(p) = s.posts.lock().iter_mut().find(|p| p["id"] == id) {
        p["is_pinned"] = body["is_pinned"].clone();
    }
    StatusCode::OK.into_response()
}

async fn upload_image(State(s): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    s.record("POST /posts/upload/image".to_string());
    if let Err(r) = authorize(&s, &headers) { return r; }
    let text = String::from_utf8_lossy(&body);
    if !text.contains(r#"name="file""#) {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "file field missing");
    }
    Json(json!({"url": UPLOAD_URL})).into_response()
}

async fn list_comments(State(s): State<Shared>, Path(post_id): Path<i64>) -> Response {
    s.record(format!("GET /comment/post/{}", post_id));
    if s.fail_comments.load(Ordering::SeqCst) {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    }
    let list: Vec<Value> = s.comments.lock().iter().filter(|c| c["post_id"] == post_id).cloned().collect();
    Json(list).into_response()
}

async fn create_comment(State(s): State<Shared>, Path(post_id): Path<i64>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    s.record(format!("POST /comment/{}", post_id));
    s.bodies.lock().push(body.clone());
    let sub = match authorize(&s, &headers) { Ok(sub) => sub, Err(r) => return r };
    let id = s.next_id();
    s.seed_comment(id, post_id, body["content"].as_str().unwrap_or(""), &sub);
    (StatusCode::CREATED, Json(json!({"id": id}))).into_response()
}

async fn update_comment(State(s): State<Shared>, Path(id): Path<i64>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    s.record(format!("PUT /comment/{}", id));
    s.bodies.lock().push(body.clone());
    if let Err(r) = authorize(&s, &headers) { return r; }
    if let Some(c) = s.comments.lock().iter_mut().find(|c| c["id"] == id) {
        c["content"] = body["content"].clone();
    }
    StatusCode::OK.into_response()
}

async fn delete_comment(State(s): State<Shared>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    s.record(format!("DELETE /comment/{}", id));
    if let Err(r) = authorize(&s, &headers) { return r; }
    s.comments.lock().retain(|c| c["id"] != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn sign_up(State(s): State<Shared>, Json(body): Json<Value>) -> Response {
    s.record("POST /user/sign-up".to_string());
    s.bodies.lock().push(body);
    (StatusCode::CREATED, Json(json!({"status": "ok"}))).into_response()
}

async fn sign_in(State(s): State<Shared>, Json(body): Json<Value>) -> Response {
    s.record("POST /user/sign-in".to_string());
    let user = body["username"].as_str().unwrap_or("").to_string();
    if body["password"].as_str() != Some(PASSWORD) {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password");
    }
    let exp = NOW + s.token_ttl.load(Ordering::SeqCst);
    Json(json!({"token": token(&user, exp, user == "admin")})).into_response()
}

pub fn router(state: Shared) -> Router {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/upload/image", post(upload_image))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/posts/{id}/pin", patch(pin_post))
        .route("/comment/post/{post_id}", get(list_comments))
        .route("/comment/{id}", post(create_comment).put(update_comment).delete(delete_comment))
        .route("/user/sign-up", post(sign_up))
        .route("/user/sign-in", post(sign_in))
        .with_state(state)
}

pub async fn spawn_backend(state: Shared) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    let app = router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Url::parse(&format!("http://{}/", addr)).expect("mock url")
}

/// A client wired to a fresh mock backend, file storage in a temp dir and a fixed clock.
pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub api: ApiClient,
    pub session: Arc<SessionManager>,
    pub storage: Arc<FileStorage>,
    pub clock: Arc<FixedClock>,
    pub dir: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        let backend = MockBackend::new();
        let base = spawn_backend(backend.clone()).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(FileStorage::new(dir.path().join("storage.json")));
        let clock = Arc::new(FixedClock::new(NOW));
        let session = Arc::new(SessionManager::new(storage.clone(), clock.clone()));
        let api = ApiClient::new(base, session.clone()).expect("api client");
        Self { backend, api, session, storage, clock, dir }
    }

    /// A second client sharing this one's storage file, as after a restart.
    pub fn restarted_session(&self) -> Arc<SessionManager> {
        let storage = Arc::new(FileStorage::new(self.storage.path()));
        Arc::new(SessionManager::new(storage, self.clock.clone()))
    }
}

/// Token storage whose deletes always fail, as on a read-only or full disk.
#[derive(Default)]
pub struct StuckStorage {
    pub inner: MemoryStorage,
}

impl TokenStorage for StuckStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> { self.inner.get(key) }
    fn set(&self, key: &str, value: &str) -> AppResult<()> { self.inner.set(key, value) }
    fn remove(&self, _key: &str) -> AppResult<()> { Err(AppError::io("storage_write", "disk full")) }
}

/// Client over an arbitrary storage backend, for storage failure cases.
pub async fn client_with_storage(storage: Arc<dyn TokenStorage>) -> (Arc<MockBackend>, ApiClient, Arc<SessionManager>) {
    let backend = MockBackend::new();
    let base = spawn_backend(backend.clone()).await;
    let session = Arc::new(SessionManager::new(storage, Arc::new(FixedClock::new(NOW))));
    let api = ApiClient::new(base, session.clone()).expect("api client");
    (backend, api, session)
}
