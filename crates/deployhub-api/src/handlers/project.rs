//! Project CRUD handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use deployhub_core::types::{PageResponse, ProjectId};
use deployhub_entity::project::Project;
use deployhub_service::ProjectParams;

use crate::dto::request::ProjectRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::{PaginationParams, parse_id};
use crate::state::AppState;

/// POST /api/projects
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Project>>)> {
    let project = state
        .project_service
        .create(ProjectParams { name: req.name })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(project))))
}

/// GET /api/projects
pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PageResponse<Project>>>> {
    let result = state
        .project_service
        .list(page.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/projects/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let id: ProjectId = parse_id(&id)?;
    Ok(Json(ApiResponse::ok(state.project_service.get(id).await?)))
}

/// PUT /api/projects/{id}
pub async fn rename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let id: ProjectId = parse_id(&id)?;
    let project = state
        .project_service
        .rename(id, ProjectParams { name: req.name })
        .await?;
    Ok(Json(ApiResponse::ok(project)))
}

/// DELETE /api/projects/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: ProjectId = parse_id(&id)?;
    state.project_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
