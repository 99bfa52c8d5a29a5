use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{
    AssignmentListResponse, AssignmentQueryParams, AssignmentResponse, CreateAssignmentRequest,
    GradeSubmissionRequest, StudentAssignmentListResponse, StudentAssignmentResponse,
    SubmissionListResponse, SubmissionResponse, SubmitAssignmentRequest, UpdateAssignmentRequest,
};
use crate::entities::assignment;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::{FacultyUser, StudentUser};
use crate::middleware::permission::Scope;
use crate::repositories::{
    AssignmentRepository, AssignmentUpdate, EnrollmentRepository, NewAssignment,
    SettingsRepository, SubjectRepository,
};
use crate::routes::dto::MessageResponse;
use crate::services::roster;
use crate::utils::pagination::PageRequest;
use crate::utils::validation::normalize_optional;

pub fn create_route() -> Router {
    Router::new()
        .route(
            "/api/faculty/assignments",
            get(faculty_get_assignments).post(faculty_create_assignment),
        )
        .route(
            "/api/faculty/assignments/{id}",
            put(faculty_update_assignment).delete(faculty_delete_assignment),
        )
        .route(
            "/api/faculty/assignments/{id}/submissions",
            get(faculty_get_submissions),
        )
        .route(
            "/api/faculty/submissions/{id}/grade",
            post(faculty_grade_submission),
        )
        .route("/api/student/assignments", get(student_get_assignments))
        .route(
            "/api/student/assignments/{id}/submit",
            post(student_submit_assignment),
        )
}

/// Loads an assignment whose subject is inside `scope`.
async fn assignment_in_scope(scope: &Scope, assignment_id: Uuid) -> AppResult<assignment::Model> {
    let assignment = AssignmentRepository::new()
        .find_by_id(assignment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Assignment not found"))?;
    roster::subject_in_scope(scope, assignment.subject_id).await?;
    Ok(assignment)
}

/// List assignments of the caller's subjects
#[utoipa::path(
    get,
    path = "/api/faculty/assignments",
    params(AssignmentQueryParams),
    responses(
        (status = 200, description = "Assignments retrieved", body = AssignmentListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_get_assignments(
    faculty: FacultyUser,
    Query(params): Query<AssignmentQueryParams>,
) -> AppResult<(StatusCode, Json<AssignmentListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let (assignments, total) = AssignmentRepository::new()
        .find_all_with_pagination(&faculty.scope()?, params.subject_id, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(AssignmentListResponse {
            assignments: assignments.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

/// Create an assignment for one of the caller's subjects
#[utoipa::path(
    post,
    path = "/api/faculty/assignments",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 201, description = "Assignment created", body = AssignmentResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Subject is not assigned to the caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_create_assignment(
    faculty: FacultyUser,
    Json(payload): Json<CreateAssignmentRequest>,
) -> AppResult<(StatusCode, Json<AssignmentResponse>)> {
    payload.validate()?;
    let subject = roster::subject_in_scope(&faculty.scope()?, payload.subject_id).await?;

    let assignment = AssignmentRepository::new()
        .create(NewAssignment {
            subject_id: subject.subject_id,
            faculty_id: faculty.id(),
            title: payload.title.trim().to_string(),
            description: normalize_optional(payload.description),
            due_date: payload.due_date,
            max_marks: payload.max_marks,
        })
        .await?;
    tracing::info!(assignment_id = %assignment.assignment_id, subject_id = %subject.subject_id, "Assignment created");

    Ok((StatusCode::CREATED, Json(assignment.into())))
}

/// Update an assignment
#[utoipa::path(
    put,
    path = "/api/faculty/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = UpdateAssignmentRequest,
    responses(
        (status = 200, description = "Assignment updated", body = AssignmentResponse),
        (status = 403, description = "Subject is not assigned to the caller", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse),
        (status = 409, description = "max_marks is below marks already awarded", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_update_assignment(
    faculty: FacultyUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssignmentRequest>,
) -> AppResult<(StatusCode, Json<AssignmentResponse>)> {
    payload.validate()?;
    assignment_in_scope(&faculty.scope()?, id).await?;

    let updated = AssignmentRepository::new()
        .update(
            id,
            AssignmentUpdate {
                title: payload.title.map(|t| t.trim().to_string()),
                description: payload.description.map(|d| d.trim().to_string()),
                due_date: payload.due_date,
                max_marks: payload.max_marks,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(updated.into())))
}

/// Delete an assignment and its submissions
#[utoipa::path(
    delete,
    path = "/api/faculty/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment deleted", body = MessageResponse),
        (status = 403, description = "Subject is not assigned to the caller", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_delete_assignment(
    faculty: FacultyUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    assignment_in_scope(&faculty.scope()?, id).await?;
    AssignmentRepository::new().delete(id).await?;
    tracing::info!(assignment_id = %id, "Assignment deleted");

    Ok((StatusCode::OK, Json(MessageResponse::new("Assignment deleted"))))
}

/// Submissions received for an assignment
#[utoipa::path(
    get,
    path = "/api/faculty/assignments/{id}/submissions",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Submissions retrieved", body = SubmissionListResponse),
        (status = 403, description = "Subject is not assigned to the caller", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_get_submissions(
    faculty: FacultyUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<SubmissionListResponse>)> {
    assignment_in_scope(&faculty.scope()?, id).await?;
    let submissions = AssignmentRepository::new().find_submissions(id).await?;

    Ok((
        StatusCode::OK,
        Json(SubmissionListResponse {
            assignment_id: id,
            submissions: submissions.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// Grade a submission
#[utoipa::path(
    post,
    path = "/api/faculty/submissions/{id}/grade",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = GradeSubmissionRequest,
    responses(
        (status = 200, description = "Submission graded", body = SubmissionResponse),
        (status = 400, description = "Marks out of range", body = ErrorResponse),
        (status = 403, description = "Subject is not assigned to the caller", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn faculty_grade_submission(
    faculty: FacultyUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<GradeSubmissionRequest>,
) -> AppResult<(StatusCode, Json<SubmissionResponse>)> {
    let repository = AssignmentRepository::new();
    let submission = repository
        .find_submission(id)
        .await?
        .ok_or_else(|| AppError::not_found("Submission not found"))?;
    let assignment = assignment_in_scope(&faculty.scope()?, submission.assignment_id).await?;

    if payload.marks < 0 || payload.marks > assignment.max_marks {
        return Err(AppError::bad_request(format!(
            "Marks must be between 0 and {}",
            assignment.max_marks
        )));
    }

    let graded = repository
        .grade_submission(id, payload.marks, normalize_optional(payload.feedback))
        .await?;
    tracing::info!(submission_id = %id, marks = payload.marks, "Submission graded");

    Ok((StatusCode::OK, Json(graded.into())))
}

/// Assignments for the caller's current batch, with their submissions
#[utoipa::path(
    get,
    path = "/api/student/assignments",
    responses(
        (status = 200, description = "Assignments retrieved", body = StudentAssignmentListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_get_assignments(
    student: StudentUser,
) -> AppResult<(StatusCode, Json<StudentAssignmentListResponse>)> {
    let academic_year = SettingsRepository::new().current_academic_year().await?;
    let enrollment = EnrollmentRepository::new()
        .find_for_student(student.id(), &academic_year)
        .await?;

    let subject_ids: Vec<Uuid> = match &enrollment {
        Some(enrollment) => SubjectRepository::new()
            .find_by_batch(enrollment.batch_id)
            .await?
            .into_iter()
            .map(|s| s.subject_id)
            .collect(),
        None => Vec::new(),
    };

    let repository = AssignmentRepository::new();
    let assignments = repository.find_for_subjects(subject_ids).await?;
    let mut submissions: HashMap<_, _> = repository
        .find_submissions_of_student(
            student.id(),
            assignments.iter().map(|a| a.assignment_id).collect(),
        )
        .await?
        .into_iter()
        .map(|s| (s.assignment_id, s))
        .collect();

    let assignments = assignments
        .into_iter()
        .map(|assignment| StudentAssignmentResponse {
            submission: submissions
                .remove(&assignment.assignment_id)
                .map(Into::into),
            assignment: assignment.into(),
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(StudentAssignmentListResponse {
            academic_year,
            assignments,
        }),
    ))
}

/// Submit or resubmit work for an assignment
///
/// Accepted until the due date. Once graded, the submission can no longer change.
#[utoipa::path(
    post,
    path = "/api/student/assignments/{id}/submit",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = SubmitAssignmentRequest,
    responses(
        (status = 200, description = "Submission saved", body = SubmissionResponse),
        (status = 400, description = "Past the due date or empty content", body = ErrorResponse),
        (status = 403, description = "Caller does not take the subject", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse),
        (status = 409, description = "Submission already graded", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_submit_assignment(
    student: StudentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAssignmentRequest>,
) -> AppResult<(StatusCode, Json<SubmissionResponse>)> {
    let content = payload.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::bad_request("Submission content is required"));
    }

    let assignment = AssignmentRepository::new()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Assignment not found"))?;
    if Utc::now().naive_utc() > assignment.due_date {
        return Err(AppError::bad_request("The due date for this assignment has passed"));
    }

    let subject = SubjectRepository::new()
        .find_by_id(assignment.subject_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subject not found"))?;
    let roster = roster::subject_roster(&subject).await?;
    if !roster.contains(&student.id()) {
        return Err(AppError::forbidden("You are not taking this subject"));
    }

    let submission = AssignmentRepository::new()
        .submit(id, student.id(), content)
        .await?;
    tracing::info!(assignment_id = %id, student_id = %student.id(), "Assignment submitted");

    Ok((StatusCode::OK, Json(submission.into())))
}
