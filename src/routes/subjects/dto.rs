use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::subject;
use crate::error::AppResult;
use crate::routes::dto::nullable;
use crate::routes::users::dto::UserResponse;
use crate::utils::pagination::{PageMeta, default_page, default_page_size};
use crate::utils::validation::FieldErrors;

const CREDITS: std::ops::RangeInclusive<i32> = 0..=20;
const SEMESTERS: std::ops::RangeInclusive<i32> = 1..=12;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubjectRequest {
    #[schema(example = "Operating Systems")]
    pub name: String,
    #[schema(example = "CS301")]
    pub code: String,
    #[schema(example = 4)]
    pub credits: i32,
    #[schema(example = 5)]
    pub semester: i32,
    /// Required for the principal; HODs always create in their own department
    pub department_id: Option<Uuid>,
    pub faculty_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
}

impl CreateSubjectRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        errors
            .required("name", &self.name)
            .required("code", &self.code)
            .check(CREDITS.contains(&self.credits), "credits", "must be between 0 and 20")
            .check(SEMESTERS.contains(&self.semester), "semester", "must be between 1 and 12");
        errors.into_result()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSubjectRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub credits: Option<i32>,
    pub semester: Option<i32>,
    /// `null` unassigns the faculty member
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Uuid>)]
    pub faculty_id: Option<Option<Uuid>>,
    /// `null` detaches the subject from its batch
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Uuid>)]
    pub batch_id: Option<Option<Uuid>>,
}

impl UpdateSubjectRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.required("name", name);
        }
        if let Some(code) = &self.code {
            errors.required("code", code);
        }
        if let Some(credits) = self.credits {
            errors.check(CREDITS.contains(&credits), "credits", "must be between 0 and 20");
        }
        if let Some(semester) = self.semester {
            errors.check(SEMESTERS.contains(&semester), "semester", "must be between 1 and 12");
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubjectQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub semester: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubjectResponse {
    pub subject_id: Uuid,
    pub name: String,
    pub code: String,
    pub credits: i32,
    pub semester: i32,
    pub department_id: Uuid,
    pub faculty_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<subject::Model> for SubjectResponse {
    fn from(subject: subject::Model) -> Self {
        Self {
            subject_id: subject.subject_id,
            name: subject.name,
            code: subject.code,
            credits: subject.credits,
            semester: subject.semester,
            department_id: subject.department_id,
            faculty_id: subject.faculty_id,
            batch_id: subject.batch_id,
            created_at: subject.created_at,
            updated_at: subject.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubjectListResponse {
    pub subjects: Vec<SubjectResponse>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentSubjectsResponse {
    pub academic_year: String,
    pub batch_id: Option<Uuid>,
    pub subjects: Vec<SubjectResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubjectStudentsResponse {
    pub subject_id: Uuid,
    pub students: Vec<UserResponse>,
}
