use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use super::dto::{
    ComplaintListResponse, ComplaintQueryParams, ComplaintResponse, CreateComplaintRequest,
    ResolveComplaintRequest,
};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::{HodUser, PrincipalUser, StudentUser};
use crate::middleware::permission::Scope;
use crate::repositories::ComplaintRepository;
use crate::utils::pagination::PageRequest;
use crate::utils::validation::normalize_optional;

pub fn create_route() -> Router {
    Router::new()
        .route("/api/admin/complaints", get(get_all_complaints))
        .route(
            "/api/admin/complaints/{complaint_id}/resolve",
            post(resolve_complaint),
        )
        .route("/api/hod/complaints", get(hod_get_complaints))
        .route(
            "/api/hod/complaints/{complaint_id}/resolve",
            post(hod_resolve_complaint),
        )
        .route(
            "/api/student/complaints",
            get(student_get_complaints).post(student_create_complaint),
        )
}

async fn list_complaints(
    scope: Scope,
    params: ComplaintQueryParams,
) -> AppResult<(StatusCode, Json<ComplaintListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let (complaints, total) = ComplaintRepository::new()
        .find_all_with_pagination(&scope, params.status, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ComplaintListResponse {
            complaints: complaints.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

async fn close_complaint(
    scope: Scope,
    complaint_id: Uuid,
    resolved_by: Uuid,
    payload: ResolveComplaintRequest,
) -> AppResult<ComplaintResponse> {
    let repository = ComplaintRepository::new();
    let complaint = repository
        .find_by_id(complaint_id)
        .await?
        .ok_or_else(|| AppError::not_found("Complaint not found"))?;
    scope.ensure_department(complaint.department_id)?;

    let closed = repository
        .resolve(
            complaint,
            payload.status,
            normalize_optional(payload.response),
            resolved_by,
        )
        .await?;
    tracing::info!(complaint_id = %complaint_id, resolved_by = %resolved_by, "Complaint closed");

    Ok(closed.into())
}

/// List all complaints
#[utoipa::path(
    get,
    path = "/api/admin/complaints",
    params(ComplaintQueryParams),
    responses(
        (status = 200, description = "Complaints retrieved", body = ComplaintListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_all_complaints(
    _principal: PrincipalUser,
    Query(params): Query<ComplaintQueryParams>,
) -> AppResult<(StatusCode, Json<ComplaintListResponse>)> {
    list_complaints(Scope::Institution, params).await
}

/// Resolve or reject a complaint
#[utoipa::path(
    post,
    path = "/api/admin/complaints/{complaint_id}/resolve",
    params(("complaint_id" = Uuid, Path, description = "Complaint ID")),
    request_body = ResolveComplaintRequest,
    responses(
        (status = 200, description = "Complaint closed", body = ComplaintResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse),
        (status = 409, description = "Complaint already closed", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn resolve_complaint(
    principal: PrincipalUser,
    Path(complaint_id): Path<Uuid>,
    Json(payload): Json<ResolveComplaintRequest>,
) -> AppResult<(StatusCode, Json<ComplaintResponse>)> {
    let closed = close_complaint(Scope::Institution, complaint_id, principal.id(), payload).await?;
    Ok((StatusCode::OK, Json(closed)))
}

/// List complaints raised in the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/complaints",
    params(ComplaintQueryParams),
    responses(
        (status = 200, description = "Complaints retrieved", body = ComplaintListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_get_complaints(
    hod: HodUser,
    Query(params): Query<ComplaintQueryParams>,
) -> AppResult<(StatusCode, Json<ComplaintListResponse>)> {
    list_complaints(hod.scope(), params).await
}

/// Resolve or reject a complaint from the HOD's department
#[utoipa::path(
    post,
    path = "/api/hod/complaints/{complaint_id}/resolve",
    params(("complaint_id" = Uuid, Path, description = "Complaint ID")),
    request_body = ResolveComplaintRequest,
    responses(
        (status = 200, description = "Complaint closed", body = ComplaintResponse),
        (status = 403, description = "Complaint belongs to another department", body = ErrorResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse),
        (status = 409, description = "Complaint already closed", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_resolve_complaint(
    hod: HodUser,
    Path(complaint_id): Path<Uuid>,
    Json(payload): Json<ResolveComplaintRequest>,
) -> AppResult<(StatusCode, Json<ComplaintResponse>)> {
    let closed = close_complaint(hod.scope(), complaint_id, hod.user.user_id, payload).await?;
    Ok((StatusCode::OK, Json(closed)))
}

/// The caller's complaints
#[utoipa::path(
    get,
    path = "/api/student/complaints",
    params(ComplaintQueryParams),
    responses(
        (status = 200, description = "Complaints retrieved", body = ComplaintListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_get_complaints(
    student: StudentUser,
    Query(params): Query<ComplaintQueryParams>,
) -> AppResult<(StatusCode, Json<ComplaintListResponse>)> {
    list_complaints(student.scope()?, params).await
}

/// Raise a complaint
///
/// The complaint is routed to the student's department at the time it is raised.
#[utoipa::path(
    post,
    path = "/api/student/complaints",
    request_body = CreateComplaintRequest,
    responses(
        (status = 201, description = "Complaint created", body = ComplaintResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_create_complaint(
    student: StudentUser,
    Json(payload): Json<CreateComplaintRequest>,
) -> AppResult<(StatusCode, Json<ComplaintResponse>)> {
    payload.validate()?;

    let complaint = ComplaintRepository::new()
        .create(
            student.id(),
            student.0.department_id,
            payload.subject.trim().to_string(),
            payload.description.trim().to_string(),
        )
        .await?;
    tracing::info!(complaint_id = %complaint.complaint_id, student_id = %student.id(), "Complaint raised");

    Ok((StatusCode::CREATED, Json(complaint.into())))
}
