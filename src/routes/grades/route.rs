use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    routing::get,
};

use super::dto::{
    GradeListResponse, GradeQueryParams, RecordGradesRequest, RecordedGradesResponse,
};
use crate::error::{AppResult, ErrorResponse};
use crate::extractor::{FacultyUser, HodUser, StudentUser};
use crate::middleware::permission::Scope;
use crate::repositories::{GradeEntry, GradeFilter, GradeRepository};
use crate::services::roster;
use crate::utils::pagination::PageRequest;
use crate::utils::validation::normalize_optional;

pub fn create_route() -> Router {
    Router::new()
        .route("/api/hod/grades", get(hod_get_grades))
        .route(
            "/api/faculty/grades",
            get(faculty_get_grades).post(faculty_record_grades),
        )
        .route("/api/student/grades", get(student_get_grades))
}

async fn list_grades(
    scope: Scope,
    params: GradeQueryParams,
) -> AppResult<(StatusCode, Json<GradeListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let filter = GradeFilter {
        subject_id: params.subject_id,
        student_id: params.student_id,
        exam_type: params.exam_type,
    };
    let (grades, total) = GradeRepository::new()
        .find_all_with_pagination(&scope, filter, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(GradeListResponse {
            grades: grades.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

/// List grades of students in the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/grades",
    params(GradeQueryParams),
    responses(
        (status = 200, description = "Grades retrieved", body = GradeListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_get_grades(
    hod: HodUser,
    Query(params): Query<GradeQueryParams>,
) -> AppResult<(StatusCode, Json<GradeListResponse>)> {
    list_grades(hod.scope(), params).await
}

/// List grades recorded for the caller's subjects
#[utoipa::path(
    get,
    path = "/api/faculty/grades",
    params(GradeQueryParams),
    responses(
        (status = 200, description = "Grades retrieved", body = GradeListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_get_grades(
    faculty: FacultyUser,
    Query(params): Query<GradeQueryParams>,
) -> AppResult<(StatusCode, Json<GradeListResponse>)> {
    list_grades(faculty.scope()?, params).await
}

/// Record one exam's marks for a subject
///
/// A student already graded for the exam gets the new marks. All rows are written in one
/// transaction.
#[utoipa::path(
    post,
    path = "/api/faculty/grades",
    request_body = RecordGradesRequest,
    responses(
        (status = 200, description = "Grades saved", body = RecordedGradesResponse),
        (status = 400, description = "Invalid marks", body = ErrorResponse),
        (status = 403, description = "Subject is not assigned to the caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_record_grades(
    faculty: FacultyUser,
    Json(payload): Json<RecordGradesRequest>,
) -> AppResult<(StatusCode, Json<RecordedGradesResponse>)> {
    payload.validate()?;
    let subject = roster::subject_in_scope(&faculty.scope()?, payload.subject_id).await?;
    let student_ids: Vec<_> = payload.grades.iter().map(|g| g.student_id).collect();
    roster::ensure_students_take_subject(&subject, &student_ids).await?;

    let entries = payload
        .grades
        .into_iter()
        .map(|g| GradeEntry {
            student_id: g.student_id,
            marks: g.marks,
            remarks: normalize_optional(g.remarks),
        })
        .collect();
    let saved = GradeRepository::new()
        .upsert_bulk(subject.subject_id, payload.exam_type, payload.max_marks, entries)
        .await?;
    tracing::info!(subject_id = %subject.subject_id, count = saved.len(), "Grades recorded");

    Ok((
        StatusCode::OK,
        Json(RecordedGradesResponse {
            subject_id: subject.subject_id,
            exam_type: payload.exam_type,
            grades: saved.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// The caller's grades
#[utoipa::path(
    get,
    path = "/api/student/grades",
    params(GradeQueryParams),
    responses(
        (status = 200, description = "Grades retrieved", body = GradeListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_get_grades(
    student: StudentUser,
    Query(params): Query<GradeQueryParams>,
) -> AppResult<(StatusCode, Json<GradeListResponse>)> {
    list_grades(student.scope()?, params).await
}
