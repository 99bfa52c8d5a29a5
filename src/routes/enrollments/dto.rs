use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::enrollment;
use crate::utils::pagination::{PageMeta, default_page, default_page_size};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEnrollmentRequest {
    pub student_id: Uuid,
    pub batch_id: Uuid,
    /// Defaults to the batch's academic year
    #[schema(example = "2025-2026")]
    pub academic_year: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EnrollmentQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub batch_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub academic_year: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentResponse {
    pub enrollment_id: Uuid,
    pub student_id: Uuid,
    pub batch_id: Uuid,
    pub academic_year: String,
    pub created_at: NaiveDateTime,
}

impl From<enrollment::Model> for EnrollmentResponse {
    fn from(enrollment: enrollment::Model) -> Self {
        Self {
            enrollment_id: enrollment.enrollment_id,
            student_id: enrollment.student_id,
            batch_id: enrollment.batch_id,
            academic_year: enrollment.academic_year,
            created_at: enrollment.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentListResponse {
    pub enrollments: Vec<EnrollmentResponse>,
    pub pagination: PageMeta,
}
