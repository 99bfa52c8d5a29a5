use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::entities::user;
use crate::services::provisioning::{ProvisionRow, ProvisionedUser};
use crate::utils::pagination::{PageMeta, default_page, default_page_size};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: RoleEnum,
    pub department_id: Option<Uuid>,
    pub phone: Option<String>,
    pub roll_number: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            name: user.name,
            role: user.role,
            department_id: user.department_id,
            phone: user.phone,
            roll_number: user.roll_number,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub pagination: PageMeta,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub role: Option<RoleEnum>,
    pub department_id: Option<Uuid>,
    /// Matches name, email or roll number
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DepartmentMemberQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub search: Option<String>,
}

/// Returned on account creation. The temporary password is shown once and never stored.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedUserResponse {
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

impl From<ProvisionedUser> for CreatedUserResponse {
    fn from(provisioned: ProvisionedUser) -> Self {
        Self {
            user: provisioned.user.into(),
            temporary_password: provisioned.temporary_password,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkCreateUsersRequest {
    pub users: Vec<ProvisionRow>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[schema(example = "Asha Rao")]
    pub name: Option<String>,
    pub role: Option<RoleEnum>,
    pub department_id: Option<Uuid>,
    /// Empty string clears the phone number
    pub phone: Option<String>,
    /// Empty string clears the roll number
    pub roll_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferPrincipalRequest {
    /// Role the outgoing principal takes after the transfer
    #[schema(example = "FACULTY")]
    pub former_role: RoleEnum,
    /// Department of the outgoing principal in their new role
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferPrincipalResponse {
    pub principal: UserResponse,
    pub former_principal: UserResponse,
}
