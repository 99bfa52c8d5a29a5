use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use super::dto::{
    BatchListResponse, BatchQueryParams, BatchResponse, CreateBatchRequest, UpdateBatchRequest,
};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::{HodUser, PrincipalUser};
use crate::middleware::permission::Scope;
use crate::repositories::{BatchFilter, BatchRepository, BatchUpdate, DepartmentRepository, NewBatch};
use crate::routes::dto::MessageResponse;
use crate::utils::pagination::PageRequest;

pub fn create_route() -> Router {
    Router::new()
        .route("/api/admin/batches", get(get_all_batches).post(create_batch))
        .route(
            "/api/admin/batches/{batch_id}",
            get(get_batch).put(update_batch).delete(delete_batch),
        )
        .route("/api/hod/batches", get(hod_get_batches).post(hod_create_batch))
        .route("/api/hod/batches/{batch_id}", put(hod_update_batch))
}

async fn list_batches(
    scope: Scope,
    params: BatchQueryParams,
) -> AppResult<(StatusCode, Json<BatchListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let filter = BatchFilter {
        department_id: params.department_id,
        academic_year: params.academic_year,
    };
    let (batches, total) = BatchRepository::new()
        .find_all_with_pagination(&scope, filter, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(BatchListResponse {
            batches: batches.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

async fn insert_batch(department_id: Uuid, payload: CreateBatchRequest) -> AppResult<BatchResponse> {
    payload.validate()?;
    DepartmentRepository::new()
        .find_by_id(department_id)
        .await?
        .ok_or_else(|| AppError::bad_request("Department not found"))?;

    let batch = BatchRepository::new()
        .create(NewBatch {
            name: payload.name.trim().to_string(),
            department_id,
            year: payload.year,
            semester: payload.semester,
            academic_year: payload.academic_year.trim().to_string(),
        })
        .await?;
    tracing::info!(batch_id = %batch.batch_id, department_id = %department_id, "Batch created");
    Ok(batch.into())
}

async fn apply_batch_update(
    scope: Scope,
    batch_id: Uuid,
    payload: UpdateBatchRequest,
) -> AppResult<BatchResponse> {
    payload.validate()?;
    let batch_repo = BatchRepository::new();
    let batch = batch_repo
        .find_by_id(batch_id)
        .await?
        .ok_or_else(|| AppError::not_found("Batch not found"))?;
    scope.ensure_department(Some(batch.department_id))?;

    let updated = batch_repo
        .update(
            batch_id,
            BatchUpdate {
                name: payload.name.map(|n| n.trim().to_string()),
                year: payload.year,
                semester: payload.semester,
                academic_year: payload.academic_year.map(|a| a.trim().to_string()),
            },
        )
        .await?;
    Ok(updated.into())
}

/// List batches (Principal only)
#[utoipa::path(
    get,
    path = "/api/admin/batches",
    params(BatchQueryParams),
    responses(
        (status = 200, description = "Batches retrieved", body = BatchListResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Batches"
)]
pub async fn get_all_batches(
    principal: PrincipalUser,
    Query(params): Query<BatchQueryParams>,
) -> AppResult<(StatusCode, Json<BatchListResponse>)> {
    list_batches(principal.scope()?, params).await
}

/// Create a batch (Principal only)
#[utoipa::path(
    post,
    path = "/api/admin/batches",
    request_body = CreateBatchRequest,
    responses(
        (status = 201, description = "Batch created", body = BatchResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Batch already exists for the academic year", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Batches"
)]
pub async fn create_batch(
    _principal: PrincipalUser,
    Json(payload): Json<CreateBatchRequest>,
) -> AppResult<(StatusCode, Json<BatchResponse>)> {
    let department_id = payload
        .department_id
        .ok_or_else(|| AppError::bad_request("department_id is required"))?;
    Ok((StatusCode::CREATED, Json(insert_batch(department_id, payload).await?)))
}

/// Get a batch (Principal only)
#[utoipa::path(
    get,
    path = "/api/admin/batches/{batch_id}",
    params(("batch_id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Batch retrieved", body = BatchResponse),
        (status = 404, description = "Batch not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Batches"
)]
pub async fn get_batch(
    _principal: PrincipalUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<BatchResponse>)> {
    let batch = BatchRepository::new()
        .find_by_id(batch_id)
        .await?
        .ok_or_else(|| AppError::not_found("Batch not found"))?;

    Ok((StatusCode::OK, Json(batch.into())))
}

/// Update a batch (Principal only)
#[utoipa::path(
    put,
    path = "/api/admin/batches/{batch_id}",
    params(("batch_id" = Uuid, Path, description = "Batch ID")),
    request_body = UpdateBatchRequest,
    responses(
        (status = 200, description = "Batch updated", body = BatchResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Batch not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Batches"
)]
pub async fn update_batch(
    principal: PrincipalUser,
    Path(batch_id): Path<Uuid>,
    Json(payload): Json<UpdateBatchRequest>,
) -> AppResult<(StatusCode, Json<BatchResponse>)> {
    let batch = apply_batch_update(principal.scope()?, batch_id, payload).await?;
    Ok((StatusCode::OK, Json(batch)))
}

/// Delete a batch (Principal only)
#[utoipa::path(
    delete,
    path = "/api/admin/batches/{batch_id}",
    params(("batch_id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Batch deleted", body = MessageResponse),
        (status = 404, description = "Batch not found", body = ErrorResponse),
        (status = 409, description = "Batch still has enrollments or subjects", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Batches"
)]
pub async fn delete_batch(
    _principal: PrincipalUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    BatchRepository::new().delete(batch_id).await?;
    tracing::info!(batch_id = %batch_id, "Batch deleted");

    Ok((StatusCode::OK, Json(MessageResponse::new("Batch deleted successfully"))))
}

/// List batches of the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/batches",
    params(BatchQueryParams),
    responses(
        (status = 200, description = "Batches retrieved", body = BatchListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_get_batches(
    hod: HodUser,
    Query(params): Query<BatchQueryParams>,
) -> AppResult<(StatusCode, Json<BatchListResponse>)> {
    list_batches(hod.scope(), params).await
}

/// Create a batch in the HOD's department
#[utoipa::path(
    post,
    path = "/api/hod/batches",
    request_body = CreateBatchRequest,
    responses(
        (status = 201, description = "Batch created", body = BatchResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_create_batch(
    hod: HodUser,
    Json(payload): Json<CreateBatchRequest>,
) -> AppResult<(StatusCode, Json<BatchResponse>)> {
    if payload.department_id.is_some_and(|d| d != hod.department_id) {
        return Err(AppError::forbidden("Batches can only be created in your own department"));
    }
    Ok((StatusCode::CREATED, Json(insert_batch(hod.department_id, payload).await?)))
}

/// Update a batch of the HOD's department
#[utoipa::path(
    put,
    path = "/api/hod/batches/{batch_id}",
    params(("batch_id" = Uuid, Path, description = "Batch ID")),
    request_body = UpdateBatchRequest,
    responses(
        (status = 200, description = "Batch updated", body = BatchResponse),
        (status = 403, description = "Batch belongs to another department", body = ErrorResponse),
        (status = 404, description = "Batch not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_update_batch(
    hod: HodUser,
    Path(batch_id): Path<Uuid>,
    Json(payload): Json<UpdateBatchRequest>,
) -> AppResult<(StatusCode, Json<BatchResponse>)> {
    let batch = apply_batch_update(hod.scope(), batch_id, payload).await?;
    Ok((StatusCode::OK, Json(batch)))
}
