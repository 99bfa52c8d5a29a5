use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::complaint;
use crate::entities::sea_orm_active_enums::ComplaintStatus;
use crate::error::AppResult;
use crate::utils::pagination::{PageMeta, default_page, default_page_size};
use crate::utils::validation::FieldErrors;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ComplaintQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub status: Option<ComplaintStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateComplaintRequest {
    #[schema(example = "Projector in room 204")]
    pub subject: String,
    pub description: String,
}

impl CreateComplaintRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        errors
            .required("subject", &self.subject)
            .required("description", &self.description);
        errors.into_result()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveComplaintRequest {
    /// `RESOLVED` or `REJECTED`
    #[schema(example = "RESOLVED")]
    pub status: ComplaintStatus,
    pub response: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComplaintResponse {
    pub complaint_id: Uuid,
    pub student_id: Uuid,
    pub department_id: Option<Uuid>,
    pub subject: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub response: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<complaint::Model> for ComplaintResponse {
    fn from(complaint: complaint::Model) -> Self {
        Self {
            complaint_id: complaint.complaint_id,
            student_id: complaint.student_id,
            department_id: complaint.department_id,
            subject: complaint.subject,
            description: complaint.description,
            status: complaint.status,
            response: complaint.response,
            resolved_by: complaint.resolved_by,
            created_at: complaint.created_at,
            updated_at: complaint.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComplaintListResponse {
    pub complaints: Vec<ComplaintResponse>,
    pub pagination: PageMeta,
}
