use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use super::dto::{
    CreateDepartmentRequest, DepartmentListResponse, DepartmentResponse, UpdateDepartmentRequest,
};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::PrincipalUser;
use crate::repositories::{DepartmentRepository, DepartmentUpdate, UserRepository};
use crate::routes::dto::MessageResponse;
use crate::services::user_rules;
use crate::utils::validation::{FieldErrors, normalize_optional};

pub fn create_route() -> Router {
    Router::new()
        .route(
            "/api/admin/departments",
            get(get_all_departments).post(create_department),
        )
        .route(
            "/api/admin/departments/{department_id}",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
}

/// Create a department (Principal only)
#[utoipa::path(
    post,
    path = "/api/admin/departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = DepartmentResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Name or code already used", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn create_department(
    _principal: PrincipalUser,
    Json(payload): Json<CreateDepartmentRequest>,
) -> AppResult<(StatusCode, Json<DepartmentResponse>)> {
    let name = payload.name.trim().to_string();
    let code = payload.code.trim().to_uppercase();

    let mut errors = FieldErrors::new();
    errors.required("name", &name).required("code", &code);
    errors.into_result()?;

    let department = DepartmentRepository::new()
        .create(name, code, normalize_optional(payload.description))
        .await?;
    tracing::info!(department_id = %department.department_id, "Department created");

    Ok((StatusCode::CREATED, Json(department.into())))
}

/// List departments (Principal only)
#[utoipa::path(
    get,
    path = "/api/admin/departments",
    responses(
        (status = 200, description = "Departments retrieved", body = DepartmentListResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn get_all_departments(
    _principal: PrincipalUser,
) -> AppResult<(StatusCode, Json<DepartmentListResponse>)> {
    let departments = DepartmentRepository::new().find_all().await?;

    Ok((
        StatusCode::OK,
        Json(DepartmentListResponse {
            total: departments.len(),
            departments: departments.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// Get a department (Principal only)
#[utoipa::path(
    get,
    path = "/api/admin/departments/{department_id}",
    params(("department_id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department retrieved", body = DepartmentResponse),
        (status = 404, description = "Department not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn get_department(
    _principal: PrincipalUser,
    Path(department_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<DepartmentResponse>)> {
    let department = DepartmentRepository::new()
        .find_by_id(department_id)
        .await?
        .ok_or_else(|| AppError::not_found("Department not found"))?;

    Ok((StatusCode::OK, Json(department.into())))
}

/// Update a department, including its HOD (Principal only)
#[utoipa::path(
    put,
    path = "/api/admin/departments/{department_id}",
    params(("department_id" = Uuid, Path, description = "Department ID")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department updated", body = DepartmentResponse),
        (status = 400, description = "HOD is not an HOD of this department", body = ErrorResponse),
        (status = 404, description = "Department not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn update_department(
    _principal: PrincipalUser,
    Path(department_id): Path<Uuid>,
    Json(payload): Json<UpdateDepartmentRequest>,
) -> AppResult<(StatusCode, Json<DepartmentResponse>)> {
    let name = payload.name.map(|n| n.trim().to_string());
    let code = payload.code.map(|c| c.trim().to_uppercase());

    let mut errors = FieldErrors::new();
    if let Some(name) = &name {
        errors.required("name", name);
    }
    if let Some(code) = &code {
        errors.required("code", code);
    }
    errors.into_result()?;

    if let Some(Some(hod_id)) = payload.hod_id {
        let candidate = UserRepository::new()
            .find_by_id(hod_id)
            .await?
            .ok_or_else(|| AppError::bad_request("HOD user not found"))?;
        user_rules::ensure_valid_hod(&candidate, department_id)?;
    }

    let department = DepartmentRepository::new()
        .update(
            department_id,
            DepartmentUpdate {
                name,
                code,
                description: payload.description.map(|d| d.trim().to_string()),
                hod_id: payload.hod_id,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(department.into())))
}

/// Delete an unused department (Principal only)
#[utoipa::path(
    delete,
    path = "/api/admin/departments/{department_id}",
    params(("department_id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted", body = MessageResponse),
        (status = 404, description = "Department not found", body = ErrorResponse),
        (status = 409, description = "Department still referenced", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn delete_department(
    _principal: PrincipalUser,
    Path(department_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    DepartmentRepository::new().delete(department_id).await?;
    tracing::info!(department_id = %department_id, "Department deleted");

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Department deleted successfully")),
    ))
}
