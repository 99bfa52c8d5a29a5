use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::department;
use crate::routes::dto::nullable;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDepartmentRequest {
    #[schema(example = "Computer Science")]
    pub name: String,
    #[schema(example = "CSE")]
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    /// Empty string clears the description
    pub description: Option<String>,
    /// A user with the HOD role in this department; `null` removes the HOD
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Uuid>)]
    pub hod_id: Option<Option<Uuid>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentResponse {
    pub department_id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub hod_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<department::Model> for DepartmentResponse {
    fn from(department: department::Model) -> Self {
        Self {
            department_id: department.department_id,
            name: department.name,
            code: department.code,
            description: department.description,
            hod_id: department.hod_id,
            created_at: department.created_at,
            updated_at: department.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentListResponse {
    pub departments: Vec<DepartmentResponse>,
    pub total: usize,
}
