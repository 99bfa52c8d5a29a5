use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{delete, get},
};
use uuid::Uuid;

use super::dto::{
    CreateEnrollmentRequest, EnrollmentListResponse, EnrollmentQueryParams, EnrollmentResponse,
};
use crate::entities::batch;
use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::{HodUser, PrincipalUser};
use crate::middleware::permission::Scope;
use crate::repositories::{BatchRepository, EnrollmentFilter, EnrollmentRepository, UserRepository};
use crate::routes::dto::MessageResponse;
use crate::utils::pagination::PageRequest;
use crate::utils::validation::is_valid_academic_year;

pub fn create_route() -> Router {
    Router::new()
        .route(
            "/api/admin/enrollments",
            get(get_all_enrollments).post(create_enrollment),
        )
        .route("/api/admin/enrollments/{enrollment_id}", delete(delete_enrollment))
        .route(
            "/api/hod/enrollments",
            get(hod_get_enrollments).post(hod_create_enrollment),
        )
}

async fn list_enrollments(
    scope: Scope,
    params: EnrollmentQueryParams,
) -> AppResult<(StatusCode, Json<EnrollmentListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let filter = EnrollmentFilter {
        batch_id: params.batch_id,
        student_id: params.student_id,
        academic_year: params.academic_year,
    };
    let (enrollments, total) = EnrollmentRepository::new()
        .find_all_with_pagination(&scope, filter, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(EnrollmentListResponse {
            enrollments: enrollments.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

/// An enrollment always carries its batch's academic year.
fn enrollment_year(requested: Option<String>, batch: &batch::Model) -> AppResult<String> {
    match requested.map(|y| y.trim().to_string()) {
        Some(year) if !is_valid_academic_year(&year) => {
            Err(AppError::bad_request("academic_year must look like 2025-2026"))
        }
        Some(year) if year != batch.academic_year => Err(AppError::bad_request(format!(
            "Batch {} belongs to academic year {}, not {}",
            batch.name, batch.academic_year, year
        ))),
        _ => Ok(batch.academic_year.clone()),
    }
}

/// Enrolls a student of the batch's department. One enrollment per student and academic year.
async fn enroll(scope: Scope, payload: CreateEnrollmentRequest) -> AppResult<EnrollmentResponse> {
    let batch = BatchRepository::new()
        .find_by_id(payload.batch_id)
        .await?
        .ok_or_else(|| AppError::bad_request("Batch not found"))?;
    scope.ensure_department(Some(batch.department_id))?;

    let student = UserRepository::new()
        .find_by_id(payload.student_id)
        .await?
        .ok_or_else(|| AppError::bad_request("Student not found"))?;
    if student.role != RoleEnum::Student {
        return Err(AppError::bad_request("Only students can be enrolled"));
    }
    if student.department_id != Some(batch.department_id) {
        return Err(AppError::bad_request(
            "Student and batch belong to different departments",
        ));
    }

    let academic_year = enrollment_year(payload.academic_year, &batch)?;

    let enrollment = EnrollmentRepository::new()
        .create(student.user_id, batch.batch_id, academic_year)
        .await?;
    tracing::info!(student_id = %student.user_id, batch_id = %batch.batch_id, "Student enrolled");
    Ok(enrollment.into())
}

/// List enrollments (Principal only)
#[utoipa::path(
    get,
    path = "/api/admin/enrollments",
    params(EnrollmentQueryParams),
    responses(
        (status = 200, description = "Enrollments retrieved", body = EnrollmentListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn get_all_enrollments(
    principal: PrincipalUser,
    Query(params): Query<EnrollmentQueryParams>,
) -> AppResult<(StatusCode, Json<EnrollmentListResponse>)> {
    list_enrollments(principal.scope()?, params).await
}

/// Enroll a student in a batch (Principal only)
#[utoipa::path(
    post,
    path = "/api/admin/enrollments",
    request_body = CreateEnrollmentRequest,
    responses(
        (status = 201, description = "Student enrolled", body = EnrollmentResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Student already enrolled for the academic year", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn create_enrollment(
    principal: PrincipalUser,
    Json(payload): Json<CreateEnrollmentRequest>,
) -> AppResult<(StatusCode, Json<EnrollmentResponse>)> {
    Ok((StatusCode::CREATED, Json(enroll(principal.scope()?, payload).await?)))
}

/// Remove an enrollment (Principal only)
#[utoipa::path(
    delete,
    path = "/api/admin/enrollments/{enrollment_id}",
    params(("enrollment_id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment removed", body = MessageResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn delete_enrollment(
    _principal: PrincipalUser,
    Path(enrollment_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    EnrollmentRepository::new().delete(enrollment_id).await?;

    Ok((StatusCode::OK, Json(MessageResponse::new("Enrollment removed successfully"))))
}

/// List enrollments in batches of the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/enrollments",
    params(EnrollmentQueryParams),
    responses(
        (status = 200, description = "Enrollments retrieved", body = EnrollmentListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_get_enrollments(
    hod: HodUser,
    Query(params): Query<EnrollmentQueryParams>,
) -> AppResult<(StatusCode, Json<EnrollmentListResponse>)> {
    list_enrollments(hod.scope(), params).await
}

/// Enroll a student of the HOD's department
#[utoipa::path(
    post,
    path = "/api/hod/enrollments",
    request_body = CreateEnrollmentRequest,
    responses(
        (status = 201, description = "Student enrolled", body = EnrollmentResponse),
        (status = 403, description = "Batch belongs to another department", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_create_enrollment(
    hod: HodUser,
    Json(payload): Json<CreateEnrollmentRequest>,
) -> AppResult<(StatusCode, Json<EnrollmentResponse>)> {
    Ok((StatusCode::CREATED, Json(enroll(hod.scope(), payload).await?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn batch_of_year(academic_year: &str) -> batch::Model {
        let now = Utc::now().naive_utc();
        batch::Model {
            batch_id: Uuid::new_v4(),
            name: "CSE-A".to_string(),
            department_id: Uuid::new_v4(),
            year: 2,
            semester: 3,
            academic_year: academic_year.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_enrollment_year_follows_batch() {
        let batch = batch_of_year("2025-2026");
        assert_eq!(enrollment_year(None, &batch).unwrap(), "2025-2026");
        assert_eq!(
            enrollment_year(Some(" 2025-2026 ".to_string()), &batch).unwrap(),
            "2025-2026"
        );
    }

    #[test]
    fn test_enrollment_year_mismatch_rejected() {
        let batch = batch_of_year("2025-2026");
        let err = enrollment_year(Some("2024-2025".to_string()), &batch).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref message, .. } if message.contains("2025-2026")));
        assert!(enrollment_year(Some("2025".to_string()), &batch).is_err());
    }
}
