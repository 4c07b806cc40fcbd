//! Deployment upload and read handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;

use deployhub_core::error::AppError;
use deployhub_core::result::AppResult;
use deployhub_core::traits::storage::bytes_stream;
use deployhub_core::types::{DeploymentId, PageResponse, ProjectId};
use deployhub_entity::deployment::Deployment;
use deployhub_service::UploadParams;
use deployhub_service::validation::validate;

use crate::dto::request::DeploymentListQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::{PaginationParams, parse_id};
use crate::state::AppState;

/// Archive name used when the file part carries no file name.
const DEFAULT_ARCHIVE_NAME: &str = "upload.zip";

/// POST /api/deployments/upload
///
/// Multipart fields: `project_id`, `hash` (or `content_hash`),
/// optional `entry_path` and `ttl_days`, and the `file` part.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<Deployment>>)> {
    let mut project_id: Option<ProjectId> = None;
    let mut content_hash: Option<String> = None;
    let mut entry_path: Option<String> = None;
    let mut ttl_days: Option<u32> = None;
    let mut archive: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "project_id" => project_id = Some(parse_id(text(field).await?.trim())?),
            "hash" | "content_hash" => content_hash = Some(text(field).await?.trim().to_string()),
            "entry_path" => entry_path = Some(text(field).await?),
            "ttl_days" => {
                let raw = text(field).await?;
                ttl_days = Some(raw.trim().parse().map_err(|_| {
                    AppError::validation(format!("Invalid ttl_days '{raw}'"))
                })?);
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(DEFAULT_ARCHIVE_NAME)
                    .to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                archive = Some((file_name, data));
            }
            _ => {}
        }
    }

    let project_id = project_id.ok_or_else(|| AppError::validation("project_id is required"))?;
    let content_hash = content_hash.ok_or_else(|| AppError::validation("hash is required"))?;
    let (archive_name, data) = archive.ok_or_else(|| AppError::validation("file is required"))?;

    let deployment = state
        .deployment_service
        .upload(
            UploadParams {
                project_id,
                content_hash,
                entry_path,
                archive_name,
                ttl_days,
            },
            bytes_stream(data),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(deployment))))
}

/// GET /api/deployments
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<DeploymentListQuery>,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PageResponse<Deployment>>>> {
    validate(&query)?;
    let filter = query.into_filter()?;
    let result = state
        .deployment_service
        .list(&filter, page.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/deployments/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Deployment>>> {
    let id: DeploymentId = parse_id(&id)?;
    let deployment = state.deployment_service.get(id).await?;
    Ok(Json(ApiResponse::ok(deployment)))
}

async fn text(field: Field<'_>) -> AppResult<String> {
    field.text().await.map_err(multipart_error)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large(format!("Upload too large: {}", err.body_text()))
    } else {
        AppError::validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}
