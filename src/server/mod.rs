//! HTTP surface.
//!
//! Handlers are thin: they pull `AppServices` out of the router state, run
//! one operation and map the typed error onto a status code. The `Display`
//! text of the error becomes the `message` field of the body.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::core::model::{DriveFile, FolderListing, SearchRequest};
use crate::error::{Result, SheetFinderError};
use crate::services::{AppServices, HealthReport};
use crate::signal_handler::shutdown_signal;

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct IndexFailure {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct AuthCheckBody {
    status: &'static str,
    message: String,
}

#[derive(Debug, Deserialize)]
struct IndexParams {
    secret: Option<String>,
}

/// Error wrapper carrying the status mapping.
pub struct ApiError(SheetFinderError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            SheetFinderError::Validation(_) => StatusCode::BAD_REQUEST,
            SheetFinderError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SheetFinderError> for ApiError {
    fn from(err: SheetFinderError) -> Self {
        ApiError(err)
    }
}

/// Unreadable bodies are client errors with the same `{ message }` shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(SheetFinderError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{} error: {}", self.0.category(), self.0);
        }
        (status, Json(MessageBody { message: self.0.to_string() })).into_response()
    }
}

pub fn router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/search", post(search))
        .route("/health", get(health))
        .route("/index", get(index))
        .route("/auth-check", get(auth_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(services)
}

pub async fn serve(services: Arc<AppServices>, addr: SocketAddr) -> Result<()> {
    let report = services.health();
    if !report.is_ok() {
        warn!("{}", report.message.as_deref().unwrap_or("configuration incomplete"));
    }

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        SheetFinderError::Internal(anyhow::anyhow!("failed to bind {}: {}", addr, e))
    })?;
    info!("sheet-finder listening on {}", addr);

    axum::serve(listener, router(services))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SheetFinderError::Internal(anyhow::anyhow!("server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

async fn search(
    State(services): State<Arc<AppServices>>,
    body: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> std::result::Result<Json<Vec<DriveFile>>, ApiError> {
    let Json(request) = body?;
    let outcome = services.search(&request).await?;
    Ok(Json(outcome.files))
}

async fn health(State(services): State<Arc<AppServices>>) -> Json<HealthReport> {
    Json(services.health())
}

async fn index(
    State(services): State<Arc<AppServices>>,
    Query(params): Query<IndexParams>,
) -> Response {
    if !services.rebuild_authorized(params.secret.as_deref()) {
        warn!("Rejected folder enumeration with a missing or wrong secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(MessageBody {
                message: "Unauthorized: invalid or missing secret.".to_string(),
            }),
        )
            .into_response();
    }

    match services.enumerate_folder().await {
        Ok(files) => Json(FolderListing::from(files)).into_response(),
        Err(e) => {
            error!("Folder enumeration failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(IndexFailure {
                    success: false,
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn auth_check(State(services): State<Arc<AppServices>>) -> Response {
    match services.auth_check().await {
        Ok(message) => Json(AuthCheckBody { status: "ok", message }).into_response(),
        Err(e) => {
            error!("Credential check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AuthCheckBody {
                    status: "error",
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
