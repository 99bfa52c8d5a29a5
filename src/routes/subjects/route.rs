use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use super::dto::{
    CreateSubjectRequest, StudentSubjectsResponse, SubjectListResponse, SubjectQueryParams,
    SubjectResponse, SubjectStudentsResponse, UpdateSubjectRequest,
};
use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::{FacultyUser, HodUser, PrincipalUser, StudentUser};
use crate::middleware::permission::Scope;
use crate::repositories::{
    BatchRepository, DepartmentRepository, EnrollmentRepository, NewSubject, SettingsRepository,
    SubjectFilter, SubjectRepository, SubjectUpdate, UserRepository,
};
use crate::routes::dto::MessageResponse;
use crate::services::roster;
use crate::utils::pagination::PageRequest;

pub fn create_route() -> Router {
    Router::new()
        .route("/api/admin/subjects", get(get_all_subjects).post(create_subject))
        .route(
            "/api/admin/subjects/{subject_id}",
            get(get_subject).put(update_subject).delete(delete_subject),
        )
        .route("/api/hod/subjects", get(hod_get_subjects).post(hod_create_subject))
        .route("/api/hod/subjects/{subject_id}", put(hod_update_subject))
        .route("/api/faculty/subjects", get(faculty_get_subjects))
        .route(
            "/api/faculty/subjects/{subject_id}/students",
            get(faculty_get_subject_students),
        )
        .route("/api/student/subjects", get(student_get_subjects))
}

/// A subject's faculty must teach in the subject's department and its batch must belong
/// to it.
async fn ensure_subject_links(
    department_id: Uuid,
    faculty_id: Option<Uuid>,
    batch_id: Option<Uuid>,
) -> AppResult<()> {
    if let Some(faculty_id) = faculty_id {
        let faculty = UserRepository::new()
            .find_by_id(faculty_id)
            .await?
            .ok_or_else(|| AppError::bad_request("Faculty member not found"))?;
        if faculty.role != RoleEnum::Faculty || faculty.department_id != Some(department_id) {
            return Err(AppError::bad_request(
                "Assigned faculty must be a faculty member of the subject's department",
            ));
        }
    }
    if let Some(batch_id) = batch_id {
        let batch = BatchRepository::new()
            .find_by_id(batch_id)
            .await?
            .ok_or_else(|| AppError::bad_request("Batch not found"))?;
        if batch.department_id != department_id {
            return Err(AppError::bad_request(
                "Batch belongs to a different department",
            ));
        }
    }
    Ok(())
}

async fn list_subjects(
    scope: Scope,
    params: SubjectQueryParams,
) -> AppResult<(StatusCode, Json<SubjectListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let filter = SubjectFilter {
        department_id: params.department_id,
        batch_id: params.batch_id,
        semester: params.semester,
    };
    let (subjects, total) = SubjectRepository::new()
        .find_all_with_pagination(&scope, filter, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(SubjectListResponse {
            subjects: subjects.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

async fn insert_subject(
    department_id: Uuid,
    payload: CreateSubjectRequest,
) -> AppResult<SubjectResponse> {
    payload.validate()?;
    DepartmentRepository::new()
        .find_by_id(department_id)
        .await?
        .ok_or_else(|| AppError::bad_request("Department not found"))?;
    ensure_subject_links(department_id, payload.faculty_id, payload.batch_id).await?;

    let subject = SubjectRepository::new()
        .create(NewSubject {
            name: payload.name.trim().to_string(),
            code: payload.code.trim().to_uppercase(),
            credits: payload.credits,
            semester: payload.semester,
            department_id,
            faculty_id: payload.faculty_id,
            batch_id: payload.batch_id,
        })
        .await?;
    tracing::info!(subject_id = %subject.subject_id, code = %subject.code, "Subject created");
    Ok(subject.into())
}

async fn apply_subject_update(
    scope: Scope,
    subject_id: Uuid,
    payload: UpdateSubjectRequest,
) -> AppResult<SubjectResponse> {
    payload.validate()?;
    let subject_repo = SubjectRepository::new();
    let subject = subject_repo
        .find_by_id(subject_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subject not found"))?;
    scope.ensure_subject(subject.department_id, subject.faculty_id)?;

    ensure_subject_links(
        subject.department_id,
        payload.faculty_id.flatten(),
        payload.batch_id.flatten(),
    )
    .await?;

    let updated = subject_repo
        .update(
            subject_id,
            SubjectUpdate {
                name: payload.name.map(|n| n.trim().to_string()),
                code: payload.code.map(|c| c.trim().to_uppercase()),
                credits: payload.credits,
                semester: payload.semester,
                faculty_id: payload.faculty_id,
                batch_id: payload.batch_id,
            },
        )
        .await?;
    Ok(updated.into())
}

/// List subjects (Principal only)
#[utoipa::path(
    get,
    path = "/api/admin/subjects",
    params(SubjectQueryParams),
    responses(
        (status = 200, description = "Subjects retrieved", body = SubjectListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
pub async fn get_all_subjects(
    principal: PrincipalUser,
    Query(params): Query<SubjectQueryParams>,
) -> AppResult<(StatusCode, Json<SubjectListResponse>)> {
    list_subjects(principal.scope()?, params).await
}

/// Create a subject (Principal only)
#[utoipa::path(
    post,
    path = "/api/admin/subjects",
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = SubjectResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Subject code already used", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
pub async fn create_subject(
    _principal: PrincipalUser,
    Json(payload): Json<CreateSubjectRequest>,
) -> AppResult<(StatusCode, Json<SubjectResponse>)> {
    let department_id = payload
        .department_id
        .ok_or_else(|| AppError::bad_request("department_id is required"))?;
    Ok((StatusCode::CREATED, Json(insert_subject(department_id, payload).await?)))
}

/// Get a subject (Principal only)
#[utoipa::path(
    get,
    path = "/api/admin/subjects/{subject_id}",
    params(("subject_id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject retrieved", body = SubjectResponse),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
pub async fn get_subject(
    _principal: PrincipalUser,
    Path(subject_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<SubjectResponse>)> {
    let subject = SubjectRepository::new()
        .find_by_id(subject_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subject not found"))?;

    Ok((StatusCode::OK, Json(subject.into())))
}

/// Update a subject (Principal only)
#[utoipa::path(
    put,
    path = "/api/admin/subjects/{subject_id}",
    params(("subject_id" = Uuid, Path, description = "Subject ID")),
    request_body = UpdateSubjectRequest,
    responses(
        (status = 200, description = "Subject updated", body = SubjectResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
pub async fn update_subject(
    principal: PrincipalUser,
    Path(subject_id): Path<Uuid>,
    Json(payload): Json<UpdateSubjectRequest>,
) -> AppResult<(StatusCode, Json<SubjectResponse>)> {
    let subject = apply_subject_update(principal.scope()?, subject_id, payload).await?;
    Ok((StatusCode::OK, Json(subject)))
}

/// Delete a subject (Principal only)
#[utoipa::path(
    delete,
    path = "/api/admin/subjects/{subject_id}",
    params(("subject_id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject deleted", body = MessageResponse),
        (status = 404, description = "Subject not found", body = ErrorResponse),
        (status = 409, description = "Subject still has records", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
pub async fn delete_subject(
    _principal: PrincipalUser,
    Path(subject_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    SubjectRepository::new().delete(subject_id).await?;
    tracing::info!(subject_id = %subject_id, "Subject deleted");

    Ok((StatusCode::OK, Json(MessageResponse::new("Subject deleted successfully"))))
}

/// List subjects of the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/subjects",
    params(SubjectQueryParams),
    responses(
        (status = 200, description = "Subjects retrieved", body = SubjectListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_get_subjects(
    hod: HodUser,
    Query(params): Query<SubjectQueryParams>,
) -> AppResult<(StatusCode, Json<SubjectListResponse>)> {
    list_subjects(hod.scope(), params).await
}

/// Create a subject in the HOD's department
#[utoipa::path(
    post,
    path = "/api/hod/subjects",
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = SubjectResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_create_subject(
    hod: HodUser,
    Json(payload): Json<CreateSubjectRequest>,
) -> AppResult<(StatusCode, Json<SubjectResponse>)> {
    if payload.department_id.is_some_and(|d| d != hod.department_id) {
        return Err(AppError::forbidden("Subjects can only be created in your own department"));
    }
    Ok((StatusCode::CREATED, Json(insert_subject(hod.department_id, payload).await?)))
}

/// Update a subject of the HOD's department, including its faculty assignment
#[utoipa::path(
    put,
    path = "/api/hod/subjects/{subject_id}",
    params(("subject_id" = Uuid, Path, description = "Subject ID")),
    request_body = UpdateSubjectRequest,
    responses(
        (status = 200, description = "Subject updated", body = SubjectResponse),
        (status = 403, description = "Subject belongs to another department", body = ErrorResponse),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_update_subject(
    hod: HodUser,
    Path(subject_id): Path<Uuid>,
    Json(payload): Json<UpdateSubjectRequest>,
) -> AppResult<(StatusCode, Json<SubjectResponse>)> {
    let subject = apply_subject_update(hod.scope(), subject_id, payload).await?;
    Ok((StatusCode::OK, Json(subject)))
}

/// List subjects assigned to the calling faculty member
#[utoipa::path(
    get,
    path = "/api/faculty/subjects",
    params(SubjectQueryParams),
    responses(
        (status = 200, description = "Subjects retrieved", body = SubjectListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_get_subjects(
    faculty: FacultyUser,
    Query(params): Query<SubjectQueryParams>,
) -> AppResult<(StatusCode, Json<SubjectListResponse>)> {
    list_subjects(faculty.scope()?, params).await
}

/// List students enrolled in the batch of one of the caller's subjects
#[utoipa::path(
    get,
    path = "/api/faculty/subjects/{subject_id}/students",
    params(("subject_id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Students retrieved", body = SubjectStudentsResponse),
        (status = 403, description = "Subject is not assigned to the caller", body = ErrorResponse),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_get_subject_students(
    faculty: FacultyUser,
    Path(subject_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<SubjectStudentsResponse>)> {
    let subject = roster::subject_in_scope(&faculty.scope()?, subject_id).await?;
    let students = UserRepository::new().find_roster(&subject).await?;

    Ok((
        StatusCode::OK,
        Json(SubjectStudentsResponse {
            subject_id,
            students: students.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// List subjects of the batch the student is enrolled in for the current academic year
#[utoipa::path(
    get,
    path = "/api/student/subjects",
    responses(
        (status = 200, description = "Subjects retrieved", body = StudentSubjectsResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_get_subjects(
    student: StudentUser,
) -> AppResult<(StatusCode, Json<StudentSubjectsResponse>)> {
    let academic_year = SettingsRepository::new().current_academic_year().await?;
    let enrollment = EnrollmentRepository::new()
        .find_for_student(student.id(), &academic_year)
        .await?;

    let subjects = match &enrollment {
        Some(enrollment) => SubjectRepository::new().find_by_batch(enrollment.batch_id).await?,
        None => Vec::new(),
    };

    Ok((
        StatusCode::OK,
        Json(StudentSubjectsResponse {
            academic_year,
            batch_id: enrollment.map(|e| e.batch_id),
            subjects: subjects.into_iter().map(Into::into).collect(),
        }),
    ))
}
