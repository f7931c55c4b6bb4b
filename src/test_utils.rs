//! Test doubles shared by the unit tests: in-memory mocks for the service
//! traits and a local HTTP server standing in for the Google endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use data_encoding::BASE64;
use serde_json::json;

use crate::config::CredentialSettings;
use crate::core::model::{DriveFile, FilePage};
use crate::core::services::credentials::{CredentialProvider, CredentialSource};
use crate::core::services::drive::FileStore;
use crate::core::services::gemini::CompletionModel;
use crate::error::{Result, UpstreamError};

pub const TEST_PRIVATE_KEY: &str = include_str!("core/services/testdata/service_account_key.pem");
pub const TEST_CLIENT_EMAIL: &str = "finder@example.iam.gserviceaccount.com";
pub const TEST_API_KEY: &str = "test-key";
const FAKE_ACCESS_TOKEN: &str = "fake-access-token";

/// Base64 service account bundle whose token endpoint is `token_uri`.
pub fn fixture_bundle(token_uri: &str) -> String {
    let json = json!({
        "type": "service_account",
        "client_email": TEST_CLIENT_EMAIL,
        "private_key": TEST_PRIVATE_KEY,
        "token_uri": token_uri,
    });
    BASE64.encode(json.to_string().as_bytes())
}

pub fn sample_files(count: usize) -> Vec<DriveFile> {
    (0..count)
        .map(|i| DriveFile {
            id: format!("file-{}", i),
            name: format!("Song {} - G.pdf", i),
            mime_type: "application/pdf".to_string(),
        })
        .collect()
}

pub struct MockCredentialSource {
    settings: Mutex<CredentialSettings>,
    loads: AtomicUsize,
}

impl MockCredentialSource {
    pub fn new(settings: CredentialSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, settings: CredentialSettings) {
        *self.settings.lock().unwrap() = settings;
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl CredentialSource for MockCredentialSource {
    fn load(&self) -> Result<CredentialSettings> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.settings.lock().unwrap().clone())
    }
}

pub struct MockCompletionModel {
    reply: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockCompletionModel {
    pub fn new(reply: Option<&str>) -> Self {
        Self {
            reply: reply.map(str::to_string),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer only after `delay` has passed.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CompletionModel for MockCompletionModel {
    async fn complete(&self, _prompt: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.reply.clone())
    }
}

/// In-memory file store. Page tokens are plain offsets into `files`.
pub struct MockFileStore {
    files: Vec<DriveFile>,
    ignore_page_size: bool,
    failure: Option<String>,
    calls: AtomicUsize,
    last_query: Mutex<Option<String>>,
    last_fields: Mutex<Option<String>>,
}

impl MockFileStore {
    pub fn new(files: Vec<DriveFile>) -> Self {
        Self {
            files,
            ignore_page_size: false,
            failure: None,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
            last_fields: Mutex::new(None),
        }
    }

    /// Return everything in one page regardless of the requested size.
    pub fn ignoring_page_size(mut self) -> Self {
        self.ignore_page_size = true;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn last_fields(&self) -> Option<String> {
        self.last_fields.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FileStore for MockFileStore {
    async fn list_page(
        &self,
        query: &str,
        fields: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FilePage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.to_string());
        *self.last_fields.lock().unwrap() = Some(fields.to_string());

        if let Some(ref message) = self.failure {
            return Err(UpstreamError::Search {
                message: format!("400 {}", message),
            }
            .into());
        }

        let offset: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        Ok(paginate(&self.files, offset, page_size as usize, self.ignore_page_size))
    }
}

fn paginate(files: &[DriveFile], offset: usize, page_size: usize, ignore_page_size: bool) -> FilePage {
    let offset = offset.min(files.len());
    let end = if ignore_page_size {
        files.len()
    } else {
        (offset + page_size).min(files.len())
    };

    FilePage {
        files: files[offset..end].to_vec(),
        next_page_token: (end < files.len()).then(|| end.to_string()),
    }
}

#[derive(Default)]
struct FakeState {
    files: Mutex<Vec<DriveFile>>,
    completion: Mutex<Option<String>>,
    reject_tokens: AtomicBool,
    listing_failure: Mutex<Option<(u16, String)>>,
    token_requests: AtomicUsize,
    last_assertion: Mutex<Option<String>>,
    list_requests: AtomicUsize,
    last_query: Mutex<Option<String>>,
    last_fields: Mutex<Option<String>>,
    last_api_key: Mutex<Option<String>>,
}

/// Local stand-in for the OAuth2 token endpoint, Drive `files.list` and
/// Gemini `generateContent`, bound to an ephemeral port.
pub struct FakeGoogle {
    addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeGoogle {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());

        let app = Router::new()
            .route("/token", post(fake_token))
            .route("/drive/v3/files", get(fake_files))
            .route("/v1beta/models/{model}", post(fake_generate))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn token_uri(&self) -> String {
        format!("{}/token", self.base_url())
    }

    /// Provider whose credentials exchange tokens against this server.
    pub fn credential_provider(&self) -> Arc<CredentialProvider> {
        let settings = CredentialSettings {
            credentials_base64: Some(fixture_bundle(&self.token_uri())),
            ..CredentialSettings::default()
        };
        Arc::new(CredentialProvider::new(Arc::new(MockCredentialSource::new(settings))))
    }

    pub fn set_files(&self, files: Vec<DriveFile>) {
        *self.state.files.lock().unwrap() = files;
    }

    pub fn set_completion(&self, completion: Option<&str>) {
        *self.state.completion.lock().unwrap() = completion.map(str::to_string);
    }

    pub fn reject_tokens(&self) {
        self.state.reject_tokens.store(true, Ordering::SeqCst);
    }

    pub fn fail_listing(&self, status: u16, message: &str) {
        *self.state.listing_failure.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub fn last_assertion(&self) -> Option<String> {
        self.state.last_assertion.lock().unwrap().clone()
    }

    pub fn list_requests(&self) -> usize {
        self.state.list_requests.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.state.last_query.lock().unwrap().clone()
    }

    pub fn last_fields(&self) -> Option<String> {
        self.state.last_fields.lock().unwrap().clone()
    }

    pub fn last_api_key(&self) -> Option<String> {
        self.state.last_api_key.lock().unwrap().clone()
    }
}

async fn fake_token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    *state.last_assertion.lock().unwrap() = form.get("assertion").cloned();

    let grant_ok = form.get("grant_type").map(String::as_str)
        == Some("urn:ietf:params:oauth:grant-type:jwt-bearer");
    let assertion_ok = form
        .get("assertion")
        .map(|a| a.split('.').count() == 3)
        .unwrap_or(false);

    if state.reject_tokens.load(Ordering::SeqCst) || !grant_ok || !assertion_ok {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid JWT Signature." })),
        )
            .into_response();
    }

    Json(json!({ "access_token": FAKE_ACCESS_TOKEN, "expires_in": 3600, "token_type": "Bearer" }))
        .into_response()
}

async fn fake_files(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.list_requests.fetch_add(1, Ordering::SeqCst);
    *state.last_query.lock().unwrap() = params.get("q").cloned();
    *state.last_fields.lock().unwrap() = params.get("fields").cloned();

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {}", FAKE_ACCESS_TOKEN)[..]);
    if !authorized {
        return drive_error(401, "Request had invalid authentication credentials.");
    }

    if let Some((status, ref message)) = *state.listing_failure.lock().unwrap() {
        return drive_error(status, message);
    }

    let page_size: usize = params
        .get("pageSize")
        .and_then(|v| v.parse().ok())
        .unwrap_or(100);
    let offset: usize = params
        .get("pageToken")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let page = paginate(&state.files.lock().unwrap(), offset, page_size, false);
    let mut body = json!({ "files": page.files });
    if let Some(token) = page.next_page_token {
        body["nextPageToken"] = json!(token);
    }
    Json(body).into_response()
}

fn drive_error(status: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

async fn fake_generate(
    State(state): State<Arc<FakeState>>,
    Path(model): Path<String>,
    headers: HeaderMap,
) -> Response {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *state.last_api_key.lock().unwrap() = api_key.clone();

    if !model.ends_with(":generateContent") {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": { "message": "unknown method" } })))
            .into_response();
    }

    if api_key.as_deref() != Some(TEST_API_KEY) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": 400, "message": "API key not valid. Please pass a valid API key." } })),
        )
            .into_response();
    }

    match state.completion.lock().unwrap().clone() {
        Some(text) => Json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }))
        .into_response(),
        None => Json(json!({ "candidates": [] })).into_response(),
    }
}
