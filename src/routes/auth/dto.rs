use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::department;
use crate::routes::users::dto::UserResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentSummary {
    pub department_id: uuid::Uuid,
    pub name: String,
    pub code: String,
}

impl From<department::Model> for DepartmentSummary {
    fn from(department: department::Model) -> Self {
        Self {
            department_id: department.department_id,
            name: department.name,
            code: department.code,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub department: Option<DepartmentSummary>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[schema(example = "Asha Rao")]
    pub name: Option<String>,
    /// Empty string clears the phone number
    #[schema(example = "+91 98765 43210")]
    pub phone: Option<String>,
}
