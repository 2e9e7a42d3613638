use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::db::RemoteDb;
use super::range::{parse_range, ByteRange};
use crate::error::StoreError;
use crate::remote::protocol::ErrorBody;
use crate::remote::{encode_key, BlobRef, PushAck, SyncPayload};

/// Mount point of [`router`] in the full application.
pub const API_PREFIX: &str = "/api";

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<RemoteDb>,
}

pub fn router(db: Arc<RemoteDb>) -> Router {
    let state = ApiState { db };

    Router::new()
        .route("/sync", get(pull_all).post(push))
        .route(
            "/images/*key",
            get(get_blob).put(put_blob).delete(delete_blob),
        )
        .route("/projects/:id", get(get_project).delete(delete_project))
        .route("/inspirations/:id", delete(delete_inspiration))
        .route("/tools/:id", get(get_tool))
        .with_state(state)
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{} not found", what),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!("[api] store error: {}", e);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

async fn push(
    State(state): State<ApiState>,
    Json(payload): Json<SyncPayload>,
) -> Result<Json<PushAck>, ApiError> {
    state.db.upsert(&payload)?;
    tracing::debug!(
        "[api] upserted projects={:?} inspirations={:?} tools={:?} prompts={}",
        payload.projects.as_ref().map(Vec::len),
        payload.inspirations.as_ref().map(Vec::len),
        payload.tools.as_ref().map(Vec::len),
        payload.prompts.is_some()
    );
    Ok(Json(PushAck {
        success: true,
        timestamp: chrono::Utc::now().timestamp_millis(),
    }))
}

async fn pull_all(State(state): State<ApiState>) -> Result<Response, ApiError> {
    Ok(Json(state.db.snapshot()?).into_response())
}

async fn get_project(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let project = state
        .db
        .get_project(&id)?
        .ok_or_else(|| ApiError::not_found("project"))?;
    Ok(Json(project).into_response())
}

async fn delete_project(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_project(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("project"))
    }
}

async fn delete_inspiration(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_inspiration(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("inspiration"))
    }
}

async fn get_tool(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let tool = state
        .db
        .get_tool(&id)?
        .ok_or_else(|| ApiError::not_found("tool"))?;
    Ok(Json(tool).into_response())
}

async fn put_blob(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BlobRef>, ApiError> {
    if key.is_empty() || body.is_empty() {
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "empty key or body".to_string(),
        });
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    state.db.put_blob(&key, content_type, &body)?;
    tracing::info!("[api] stored {} ({} bytes, {})", key, body.len(), content_type);

    let url = format!("{}/images/{}", API_PREFIX, encode_key(&key));
    Ok(Json(BlobRef { key, url }))
}

async fn get_blob(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let blob = state
        .db
        .get_blob(&key)?
        .ok_or_else(|| ApiError::not_found("object"))?;

    let etag = format!("\"{}\"", hex::encode(Sha256::digest(&blob.bytes)));
    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    if if_none_match == Some(etag.as_str()) {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    let content_type = HeaderValue::from_str(&blob.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let len = blob.bytes.len() as u64;
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    let response = match parse_range(range, len) {
        ByteRange::Full => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type),
                (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
            ],
            [(header::ETAG, etag)],
            blob.bytes,
        )
            .into_response(),
        ByteRange::Partial { start, end } => {
            let slice = blob.bytes[start as usize..=end as usize].to_vec();
            (
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                ],
                [
                    (header::ETAG, etag),
                    (header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, len)),
                ],
                slice,
            )
                .into_response()
        }
        ByteRange::Unsatisfiable => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", len))],
        )
            .into_response(),
    };
    Ok(response)
}

async fn delete_blob(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_blob(&key)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("object"))
    }
}
