//! Axum HTTP handlers for the web server
//!
//! Provides the listing, download and upload endpoints for both transfer
//! directions, the message board endpoints, and the static page fallback.

use std::time::SystemTime;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::domain::messages::{Message, NewMessage};
use crate::domain::payload::FilePayload;
use crate::domain::store::{Direction, StoredFile};
use crate::domain::utils::{
    attachment_disposition, content_type_for, epoch_seconds, format_local,
};
use crate::errors::{AppError, StatusBody, StoreError};
use crate::http::assets::serve_asset;
use crate::AppState;

/// One row of a directory listing as the browser client expects it.
#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub path: String,
    pub created: String,
    pub timestamp: f64,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

impl From<StoredFile> for FileEntry {
    fn from(file: StoredFile) -> Self {
        Self {
            path: file.url_path(),
            created: format_local(file.created_at),
            timestamp: epoch_seconds(file.created_at),
            size: file.size_bytes,
            expires_in: file.expires_in,
            name: file.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileData")]
    pub file_data: FilePayload,
}

pub async fn list_received(State(state): State<AppState>) -> Json<Vec<FileEntry>> {
    list(&state, Direction::Inbound).await
}

pub async fn list_shared(State(state): State<AppState>) -> Json<Vec<FileEntry>> {
    list(&state, Direction::Outbound).await
}

async fn list(state: &AppState, direction: Direction) -> Json<Vec<FileEntry>> {
    let files = state.store.list_and_reap(direction).await;
    Json(files.into_iter().map(FileEntry::from).collect())
}

pub async fn fetch_received(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    fetch(&state, Direction::Inbound, &name).await
}

pub async fn fetch_shared(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    fetch(&state, Direction::Outbound, &name).await
}

async fn fetch(state: &AppState, direction: Direction, name: &str) -> Result<Response, AppError> {
    let resolved = state
        .store
        .open(direction, name)
        .await
        .map_err(|err| match err {
            StoreError::NotFound(_) | StoreError::InvalidName(_) => AppError::not_found(name),
            other => AppError::internal(other.to_string()),
        })?;

    let file = match fs::File::open(&resolved.path).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found(name));
        }
        Err(err) => {
            return Err(AppError::internal(format!(
                "failed to open {}: {err}",
                resolved.path.display()
            )))
        }
    };

    info!(
        direction = direction.as_str(),
        file = %name,
        size_bytes = resolved.size_bytes,
        "serving file"
    );

    let disposition = HeaderValue::from_bytes(attachment_disposition(name).as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(name))),
            (header::CONTENT_LENGTH, HeaderValue::from(resolved.size_bytes)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

pub async fn upload(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StatusBody>, AppError> {
    submit(&state, Direction::Inbound, body).await
}

pub async fn upload_to_mobile(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StatusBody>, AppError> {
    submit(&state, Direction::Outbound, body).await
}

async fn submit(
    state: &AppState,
    direction: Direction,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StatusBody>, AppError> {
    let body = body.map_err(|rejection| AppError::malformed(rejection.body_text()))?;
    let request: UploadRequest = serde_json::from_slice(&body)
        .map_err(|err| AppError::malformed(format!("invalid upload body: {err}")))?;

    let bytes = request.file_data.into_bytes();
    let stored = state
        .store
        .store(direction, &request.file_name, &bytes)
        .await
        .map_err(|err| AppError::malformed(err.to_string()))?;

    let verb = match direction {
        Direction::Inbound => "received",
        Direction::Outbound => "shared",
    };
    Ok(Json(StatusBody::success(format!(
        "File {} {verb} successfully",
        stored.name
    ))))
}

pub async fn landing(State(state): State<AppState>) -> Result<Response, AppError> {
    serve_asset(&state.assets, &state.assets.landing_page).await
}

pub async fn static_asset(
    State(state): State<AppState>,
    Path(asset): Path<String>,
) -> Result<Response, AppError> {
    serve_asset(&state.assets, &asset).await
}

/// Requests whose path exists but whose method does not.
///
/// Stray POSTs get the same 400 body as a failed upload so browser clients
/// see one error shape.
pub async fn method_not_allowed(method: Method) -> AppError {
    match method {
        Method::POST => AppError::malformed("POST to a path without an upload handler"),
        Method::GET | Method::HEAD => AppError::not_found("no page at this path"),
        other => AppError::unsupported_method(other.as_str()),
    }
}

pub async fn list_messages(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.messages.list())
}

pub async fn send_message(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StatusBody>, AppError> {
    let body = body.map_err(|rejection| AppError::malformed(rejection.body_text()))?;
    let message: NewMessage = serde_json::from_slice(&body)
        .map_err(|err| AppError::malformed(format!("invalid message body: {err}")))?;

    let posted = state.messages.post(message, SystemTime::now())?;
    info!(sender = %posted.sender, chars = posted.content.chars().count(), "message posted");

    Ok(Json(StatusBody::success("Message sent")))
}

pub async fn clear_messages(State(state): State<AppState>) -> Json<StatusBody> {
    let cleared = state.messages.clear();
    info!(cleared, "messages cleared");
    Json(StatusBody::success("Messages cleared"))
}
