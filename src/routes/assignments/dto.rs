use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::{assignment, submission};
use crate::error::AppResult;
use crate::utils::pagination::{PageMeta, default_page, default_page_size};
use crate::utils::validation::FieldErrors;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AssignmentQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub subject_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAssignmentRequest {
    pub subject_id: Uuid,
    #[schema(example = "Linked lists")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "2025-03-01T23:59:00")]
    pub due_date: NaiveDateTime,
    #[schema(example = 20)]
    pub max_marks: i32,
}

impl CreateAssignmentRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        errors
            .required("title", &self.title)
            .check(self.max_marks > 0, "max_marks", "must be greater than 0");
        errors.into_result()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    /// Empty string clears the description
    pub description: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub max_marks: Option<i32>,
}

impl UpdateAssignmentRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            errors.required("title", title);
        }
        if let Some(max_marks) = self.max_marks {
            errors.check(max_marks > 0, "max_marks", "must be greater than 0");
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAssignmentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GradeSubmissionRequest {
    #[schema(example = 18)]
    pub marks: i32,
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub assignment_id: Uuid,
    pub subject_id: Uuid,
    pub faculty_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDateTime,
    pub max_marks: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<assignment::Model> for AssignmentResponse {
    fn from(assignment: assignment::Model) -> Self {
        Self {
            assignment_id: assignment.assignment_id,
            subject_id: assignment.subject_id,
            faculty_id: assignment.faculty_id,
            title: assignment.title,
            description: assignment.description,
            due_date: assignment.due_date,
            max_marks: assignment.max_marks,
            created_at: assignment.created_at,
            updated_at: assignment.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentListResponse {
    pub assignments: Vec<AssignmentResponse>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionResponse {
    pub submission_id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub content: String,
    pub submitted_at: NaiveDateTime,
    pub marks: Option<i32>,
    pub feedback: Option<String>,
}

impl From<submission::Model> for SubmissionResponse {
    fn from(submission: submission::Model) -> Self {
        Self {
            submission_id: submission.submission_id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            content: submission.content,
            submitted_at: submission.submitted_at,
            marks: submission.marks,
            feedback: submission.feedback,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionListResponse {
    pub assignment_id: Uuid,
    pub submissions: Vec<SubmissionResponse>,
}

/// An assignment as seen by a student, with their own submission if any.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAssignmentResponse {
    #[serde(flatten)]
    pub assignment: AssignmentResponse,
    pub submission: Option<SubmissionResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAssignmentListResponse {
    pub academic_year: String,
    pub assignments: Vec<StudentAssignmentResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_title_and_positive_marks() {
        let request = CreateAssignmentRequest {
            subject_id: Uuid::new_v4(),
            title: "  ".to_string(),
            description: None,
            due_date: chrono::Utc::now().naive_utc(),
            max_marks: 0,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_partial_update_only_checks_given_fields() {
        let request = UpdateAssignmentRequest {
            title: None,
            description: Some(String::new()),
            due_date: None,
            max_marks: Some(10),
        };
        assert!(request.validate().is_ok());
    }
}
