//! HTTP surface.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Liveness |
//! | `POST` | `/uploadfile/` | Validate a CSV upload and store it |
//! | `GET` | `/tables` | Tables with an expected schema |
//! | `POST` | `/login` | Check a username and password |

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use schemaguard_core::{IngestionPipeline, SchemaRegistry, Upload};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::auth::AuthProvider;

/// Headroom above the payload limit for multipart framing, so the
/// pipeline's size guard decides the boundary rather than the transport.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub registry: Arc<SchemaRegistry>,
    pub auth: Arc<dyn AuthProvider>,
}

pub fn router(state: AppState) -> Router {
    let body_limit = state
        .pipeline
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/", get(root))
        .route("/uploadfile/", post(upload_file))
        .route("/tables", get(list_tables))
        .route("/login", post(login))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    filename: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct TablesResponse {
    tables: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    authenticated: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "schemaguard backend is running".to_string(),
    })
}

/// The `file` part of an upload form.
struct FilePart {
    bytes: Bytes,
    filename: String,
    content_type: String,
}

async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut file: Option<FilePart> = None;
    let mut table_name: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return malformed(e),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        file = Some(FilePart {
                            bytes,
                            filename,
                            content_type,
                        })
                    }
                    Err(e) => return malformed(e),
                }
            }
            Some("table_name") => match field.text().await {
                Ok(text) => table_name = Some(text),
                Err(e) => return malformed(e),
            },
            _ => continue,
        }
    }

    let Some(file) = file else {
        return error_response(StatusCode::BAD_REQUEST, "Missing form field 'file'");
    };
    let Some(table_name) = table_name else {
        return error_response(StatusCode::BAD_REQUEST, "Missing form field 'table_name'");
    };

    let upload = Upload {
        bytes: file.bytes,
        table_name,
        content_type: file.content_type,
        filename: file.filename,
    };
    match state.pipeline.ingest(upload).await {
        Ok(result) => Json(UploadResponse {
            filename: result.original_filename,
            message: "File uploaded successfully".to_string(),
        })
        .into_response(),
        Err(e) => {
            let status = if e.kind().is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error_response(status, e.to_string())
        }
    }
}

fn malformed(e: axum::extract::multipart::MultipartError) -> Response {
    warn!("Rejected multipart body: {}", e);
    error_response(
        StatusCode::BAD_REQUEST,
        format!("Malformed multipart body: {}", e.body_text()),
    )
}

async fn list_tables(State(state): State<AppState>) -> Json<TablesResponse> {
    let tables = state.registry.list_table_names().await;
    Json(TablesResponse {
        tables: tables.into_iter().collect(),
    })
}

async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Response {
    match state.auth.verify(&request.username, &request.password).await {
        Ok(authenticated) => Json(LoginResponse { authenticated }).into_response(),
        Err(e) => {
            error!("Credential check failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
