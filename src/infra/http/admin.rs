use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use uuid::Uuid;

use crate::application::{content::ContentService, files::FileService, repos::HealthRepo};
use crate::domain::types::ContentKind;
use crate::infra::files::FileStorageError;

use super::{
    db_health_response,
    error::{ApiError, content_to_api, storage_to_api, upload_to_api},
    json_payload,
    middleware::{log_responses, set_request_context},
    models::{ContentCreateRequest, ContentPatchRequest, ContentResponse, FileResponse},
};

const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct AdminState {
    pub content: Arc<ContentService>,
    pub files: Arc<FileService>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_admin_router(state: AdminState, upload_body_limit: usize) -> Router {
    Router::new()
        .route("/api/v1/content/{kind}", post(create_content))
        .route(
            "/api/v1/content/{kind}/{id}",
            get(get_content).patch(update_content),
        )
        .route(
            "/api/v1/files",
            post(upload_file).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/_health/db", get(admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn create_content(
    State(state): State<AdminState>,
    Path(kind): Path<String>,
    payload: Result<Json<ContentCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let request = json_payload(payload)?;
    let item = state
        .content
        .create(kind, request.into())
        .await
        .map_err(content_to_api)?;
    Ok((StatusCode::CREATED, Json(ContentResponse::from(item))))
}

async fn update_content(
    State(state): State<AdminState>,
    Path((kind, id)): Path<(String, String)>,
    payload: Result<Json<ContentPatchRequest>, JsonRejection>,
) -> Result<Json<ContentResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;
    let request = json_payload(payload)?;
    let item = state
        .content
        .update(kind, id, request.into())
        .await
        .map_err(content_to_api)?;
    Ok(Json(item.into()))
}

async fn get_content(
    State(state): State<AdminState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<ContentResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;
    let item = state.content.find(kind, id).await.map_err(content_to_api)?;
    Ok(Json(item.into()))
}

async fn upload_file(
    State(state): State<AdminState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            storage_to_api(multipart_error(err))
        } else {
            ApiError::bad_request("Invalid multipart payload", Some(err.body_text()))
        }
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("Missing file name", None))?;
        let content_type = field.content_type().map(str::to_string);
        let stream = field.map(|chunk| chunk.map_err(multipart_error));

        let record = state
            .files
            .upload(&name, content_type.as_deref(), stream)
            .await
            .map_err(upload_to_api)?;
        return Ok((StatusCode::CREATED, Json(FileResponse::from(record))));
    }

    Err(ApiError::bad_request(
        "Missing file",
        Some(format!("expected a multipart field named `{UPLOAD_FIELD}`")),
    ))
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.ping().await)
}

fn multipart_error(err: MultipartError) -> FileStorageError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FileStorageError::PayloadTooLarge {
            source: Box::new(err),
        }
    } else {
        FileStorageError::PayloadStream {
            source: Box::new(err),
        }
    }
}

fn parse_kind(value: &str) -> Result<ContentKind, ApiError> {
    ContentKind::parse(value).ok_or_else(|| ApiError::not_found("Unknown content kind"))
}

fn parse_id(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| ApiError::not_found("Content not found"))
}
