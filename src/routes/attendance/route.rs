use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

use super::dto::{
    AttendanceListResponse, AttendanceQueryParams, MarkAttendanceRequest,
    StudentAttendanceResponse, SubjectDayAttendanceResponse, SubjectDayQuery,
};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::{FacultyUser, HodUser, StudentUser};
use crate::repositories::{AttendanceFilter, AttendanceRepository, SubjectRepository};
use crate::services::attendance_summary::summarize;
use crate::services::roster;
use crate::utils::pagination::PageRequest;

pub fn create_route() -> Router {
    Router::new()
        .route("/api/hod/attendance", get(hod_get_attendance))
        .route(
            "/api/faculty/attendance",
            get(faculty_get_attendance).post(faculty_mark_attendance),
        )
        .route("/api/student/attendance", get(student_get_attendance))
}

/// List attendance of students in the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/attendance",
    params(AttendanceQueryParams),
    responses(
        (status = 200, description = "Attendance retrieved", body = AttendanceListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_get_attendance(
    hod: HodUser,
    Query(params): Query<AttendanceQueryParams>,
) -> AppResult<(StatusCode, Json<AttendanceListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let filter = AttendanceFilter {
        subject_id: params.subject_id,
        student_id: params.student_id,
        from: params.from,
        to: params.to,
    };
    let (records, total) = AttendanceRepository::new()
        .find_all_with_pagination(&hod.scope(), filter, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(AttendanceListResponse {
            records: records.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

/// Attendance of one of the caller's subjects on one day
#[utoipa::path(
    get,
    path = "/api/faculty/attendance",
    params(SubjectDayQuery),
    responses(
        (status = 200, description = "Attendance retrieved", body = SubjectDayAttendanceResponse),
        (status = 403, description = "Subject is not assigned to the caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_get_attendance(
    faculty: FacultyUser,
    Query(query): Query<SubjectDayQuery>,
) -> AppResult<(StatusCode, Json<SubjectDayAttendanceResponse>)> {
    let subject = roster::subject_in_scope(&faculty.scope()?, query.subject_id).await?;
    let records = AttendanceRepository::new()
        .find_for_subject_on(subject.subject_id, query.date)
        .await?;

    Ok((
        StatusCode::OK,
        Json(SubjectDayAttendanceResponse {
            subject_id: subject.subject_id,
            date: query.date,
            records: records.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// Mark attendance for one subject and day
///
/// Re-marking a student overwrites the earlier status. All records are written in one
/// transaction.
#[utoipa::path(
    post,
    path = "/api/faculty/attendance",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Attendance saved", body = SubjectDayAttendanceResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Subject is not assigned to the caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_mark_attendance(
    faculty: FacultyUser,
    Json(payload): Json<MarkAttendanceRequest>,
) -> AppResult<(StatusCode, Json<SubjectDayAttendanceResponse>)> {
    if payload.records.is_empty() {
        return Err(AppError::bad_request("No attendance records provided"));
    }
    if payload.date > Utc::now().date_naive() {
        return Err(AppError::bad_request("Attendance cannot be marked for a future date"));
    }

    let subject = roster::subject_in_scope(&faculty.scope()?, payload.subject_id).await?;
    let student_ids: Vec<_> = payload.records.iter().map(|r| r.student_id).collect();
    roster::ensure_students_take_subject(&subject, &student_ids).await?;

    let entries = payload
        .records
        .into_iter()
        .map(|r| (r.student_id, r.status))
        .collect();
    let saved = AttendanceRepository::new()
        .upsert_bulk(subject.subject_id, payload.date, faculty.id(), entries)
        .await?;
    tracing::info!(subject_id = %subject.subject_id, date = %payload.date, count = saved.len(), "Attendance marked");

    Ok((
        StatusCode::OK,
        Json(SubjectDayAttendanceResponse {
            subject_id: subject.subject_id,
            date: payload.date,
            records: saved.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// The caller's attendance with a per-subject summary
#[utoipa::path(
    get,
    path = "/api/student/attendance",
    responses(
        (status = 200, description = "Attendance retrieved", body = StudentAttendanceResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_get_attendance(
    student: StudentUser,
) -> AppResult<(StatusCode, Json<StudentAttendanceResponse>)> {
    let records = AttendanceRepository::new()
        .find_for_student(student.id())
        .await?;

    let mut subject_ids: Vec<_> = records.iter().map(|r| r.subject_id).collect();
    subject_ids.sort();
    subject_ids.dedup();
    let subject_names: HashMap<_, _> = SubjectRepository::new()
        .find_by_ids(subject_ids)
        .await?
        .into_iter()
        .map(|s| (s.subject_id, s.name))
        .collect();

    let summary = summarize(&records, &subject_names);

    Ok((
        StatusCode::OK,
        Json(StudentAttendanceResponse {
            summary,
            records: records.into_iter().map(Into::into).collect(),
        }),
    ))
}
