use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use super::dto::{
    BulkCreateUsersRequest, CreatedUserResponse, DepartmentMemberQueryParams,
    TransferPrincipalRequest, TransferPrincipalResponse, UpdateUserRequest, UserListResponse,
    UserQueryParams, UserResponse,
};
use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::{HodUser, PrincipalUser};
use crate::middleware::permission::Scope;
use crate::repositories::{DatabaseDirectory, DepartmentRepository, UserFilter, UserRepository, UserUpdate};
use crate::routes::dto::MessageResponse;
use crate::services::provisioning::{ProvisionPolicy, ProvisionReport, ProvisionRow, Provisioner};
use crate::services::{account_sync, user_rules, xlsx_import};
use crate::static_service::identity_provider;
use crate::utils::pagination::PageRequest;
use crate::utils::validation::normalize_optional;

pub fn create_route() -> Router {
    Router::new()
        .route("/api/admin/users", get(get_all_users).post(create_user))
        .route("/api/admin/users/bulk", post(create_users_bulk))
        .route("/api/admin/users/bulk/upload", post(upload_users_bulk))
        .route(
            "/api/admin/users/{user_id}",
            get(get_user_by_id).put(update_user).delete(delete_user),
        )
        .route(
            "/api/admin/users/{user_id}/transfer-principal",
            post(transfer_principal),
        )
        .route("/api/hod/faculty", get(get_department_faculty))
        .route("/api/hod/students", get(get_department_students))
        .route("/api/hod/users/bulk", post(hod_create_users_bulk))
        .route("/api/hod/users/{user_id}", get(hod_get_user_by_id))
}

fn provisioner(policy: ProvisionPolicy) -> AppResult<Provisioner> {
    Ok(Provisioner::new(
        identity_provider()?,
        Arc::new(DatabaseDirectory::new()),
        policy,
    ))
}

/// Bulk rows are numbered from 1 in request order.
fn numbered(rows: Vec<ProvisionRow>) -> impl Iterator<Item = (usize, ProvisionRow)> {
    rows.into_iter().enumerate().map(|(idx, row)| (idx + 1, row))
}

async fn list_department_members(
    scope: Scope,
    role: RoleEnum,
    params: DepartmentMemberQueryParams,
) -> AppResult<(StatusCode, Json<UserListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let filter = UserFilter {
        role: Some(role),
        department_id: None,
        search: params.search,
    };
    let (users, total) = UserRepository::new()
        .find_all_with_pagination(&scope, filter, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(UserListResponse {
            users: users.into_iter().map(UserResponse::from).collect(),
            pagination: page.meta(total),
        }),
    ))
}

/// List users (Principal only)
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserQueryParams),
    responses(
        (status = 200, description = "Users retrieved", body = UserListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_all_users(
    principal: PrincipalUser,
    Query(params): Query<UserQueryParams>,
) -> AppResult<(StatusCode, Json<UserListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let filter = UserFilter {
        role: params.role,
        department_id: params.department_id,
        search: params.search,
    };
    let (users, total) = UserRepository::new()
        .find_all_with_pagination(&principal.scope()?, filter, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(UserListResponse {
            users: users.into_iter().map(UserResponse::from).collect(),
            pagination: page.meta(total),
        }),
    ))
}

/// Create a user account (Principal only)
///
/// Creates the identity-provider account and the local user. A temporary password is
/// generated and returned once when none is supplied.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = ProvisionRow,
    responses(
        (status = 201, description = "User created", body = CreatedUserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 502, description = "Identity provider failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    _principal: PrincipalUser,
    Json(payload): Json<ProvisionRow>,
) -> AppResult<(StatusCode, Json<CreatedUserResponse>)> {
    let provisioned = provisioner(ProvisionPolicy::principal())?
        .provision(payload)
        .await?;
    tracing::info!(user_id = %provisioned.user.user_id, role = provisioned.user.role.as_str(), "User created");

    Ok((StatusCode::CREATED, Json(provisioned.into())))
}

/// Create users in bulk from JSON rows (Principal only)
#[utoipa::path(
    post,
    path = "/api/admin/users/bulk",
    request_body = BulkCreateUsersRequest,
    responses(
        (status = 200, description = "Per-row provisioning report", body = ProvisionReport),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_users_bulk(
    _principal: PrincipalUser,
    Json(payload): Json<BulkCreateUsersRequest>,
) -> AppResult<(StatusCode, Json<ProvisionReport>)> {
    if payload.users.is_empty() {
        return Err(AppError::bad_request("No users provided"));
    }

    let mut report = ProvisionReport::default();
    provisioner(ProvisionPolicy::principal())?
        .provision_all(numbered(payload.users), &mut report)
        .await;
    tracing::info!(total = report.total, succeeded = report.succeeded, failed = report.failed, "Bulk user creation finished");

    Ok((StatusCode::OK, Json(report)))
}

/// Create users in bulk from an uploaded .xlsx file (Principal only)
///
/// The first sheet is read, the header row skipped. Columns: email, name, role, department,
/// batch, academic_year, phone, roll_number, password.
#[utoipa::path(
    post,
    path = "/api/admin/users/bulk/upload",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-row provisioning report", body = ProvisionReport),
        (status = 400, description = "Missing or unreadable file", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn upload_users_bulk(
    _principal: PrincipalUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ProvisionReport>)> {
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(format!("Failed to read file: {}", e)))?;
            file_data = Some(data.to_vec());
            break;
        }
    }

    let file_data = file_data.ok_or_else(|| AppError::bad_request("No file provided"))?;
    let rows = xlsx_import::read_rows(file_data)?;
    if rows.is_empty() {
        return Err(AppError::bad_request("The sheet contains no user rows"));
    }

    let mut report = ProvisionReport::default();
    provisioner(ProvisionPolicy::principal())?
        .provision_all(rows, &mut report)
        .await;
    tracing::info!(total = report.total, succeeded = report.succeeded, failed = report.failed, "Bulk user upload finished");

    Ok((StatusCode::OK, Json(report)))
}

/// Get a user (Principal only)
#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User retrieved", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user_by_id(
    _principal: PrincipalUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = UserRepository::new()
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok((StatusCode::OK, Json(user.into())))
}

/// Update a user (Principal only)
///
/// The principal role cannot be granted or removed here; use the transfer endpoint.
#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Principal invariant violated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    _principal: PrincipalUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user_repo = UserRepository::new();
    let current = user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let role = payload.role.unwrap_or(current.role);
    user_rules::ensure_role_change_allowed(&current, role)?;

    if let Some(department_id) = payload.department_id {
        DepartmentRepository::new()
            .find_by_id(department_id)
            .await?
            .ok_or_else(|| AppError::bad_request("Department not found"))?;
    }
    user_rules::ensure_department_requirement(role, payload.department_id.or(current.department_id))?;

    let name = match payload.name {
        Some(name) => Some(
            normalize_optional(Some(name))
                .ok_or_else(|| AppError::bad_request("Name cannot be empty"))?,
        ),
        None => None,
    };

    let updated = user_repo
        .update(
            user_id,
            UserUpdate {
                name: name.clone(),
                role: payload.role,
                department_id: payload.department_id,
                phone: payload.phone.map(|p| p.trim().to_string()),
                roll_number: payload.roll_number.map(|r| r.trim().to_string()),
            },
        )
        .await?;

    if let Some(name) = name.filter(|n| *n != current.name) {
        let identity = identity_provider()?;
        account_sync::sync_display_name(identity.as_ref(), &updated.firebase_uid, &name).await;
    }

    Ok((StatusCode::OK, Json(updated.into())))
}

/// Delete a user (Principal only)
///
/// The identity-provider account is removed after the local delete commits.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "The principal cannot be deleted", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    principal: PrincipalUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let user_repo = UserRepository::new();
    let target = user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    user_rules::ensure_deletable(&target, principal.id())?;

    let identity = identity_provider()?;
    user_repo.delete(user_id).await?;
    account_sync::remove_account(identity.as_ref(), &target.firebase_uid).await;

    tracing::info!(user_id = %user_id, "User deleted");
    Ok((StatusCode::OK, Json(MessageResponse::new("User deleted successfully"))))
}

/// Transfer the principal role to another user (Principal only)
///
/// The caller takes `former_role` and both rows change in one transaction.
#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/transfer-principal",
    params(("user_id" = Uuid, Path, description = "User who becomes principal")),
    request_body = TransferPrincipalRequest,
    responses(
        (status = 200, description = "Principal transferred", body = TransferPrincipalResponse),
        (status = 400, description = "Invalid transfer", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn transfer_principal(
    principal: PrincipalUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<TransferPrincipalRequest>,
) -> AppResult<(StatusCode, Json<TransferPrincipalResponse>)> {
    let user_repo = UserRepository::new();
    let successor = user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    user_rules::ensure_transferable(&principal.0, &successor, payload.former_role, payload.department_id)?;

    if let Some(department_id) = payload.department_id {
        DepartmentRepository::new()
            .find_by_id(department_id)
            .await?
            .ok_or_else(|| AppError::bad_request("Department not found"))?;
    }

    let (former, promoted) = user_repo
        .transfer_principal(&principal.0, user_id, payload.former_role, payload.department_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(TransferPrincipalResponse {
            principal: promoted.into(),
            former_principal: former.into(),
        }),
    ))
}

/// List faculty of the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/faculty",
    params(DepartmentMemberQueryParams),
    responses(
        (status = 200, description = "Faculty retrieved", body = UserListResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn get_department_faculty(
    hod: HodUser,
    Query(params): Query<DepartmentMemberQueryParams>,
) -> AppResult<(StatusCode, Json<UserListResponse>)> {
    list_department_members(hod.scope(), RoleEnum::Faculty, params).await
}

/// List students of the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/students",
    params(DepartmentMemberQueryParams),
    responses(
        (status = 200, description = "Students retrieved", body = UserListResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn get_department_students(
    hod: HodUser,
    Query(params): Query<DepartmentMemberQueryParams>,
) -> AppResult<(StatusCode, Json<UserListResponse>)> {
    list_department_members(hod.scope(), RoleEnum::Student, params).await
}

/// Get a user of the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User retrieved", body = UserResponse),
        (status = 403, description = "User belongs to another department", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_get_user_by_id(
    hod: HodUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = UserRepository::new()
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    hod.scope().ensure_department(user.department_id)?;

    Ok((StatusCode::OK, Json(user.into())))
}

/// Create faculty and students of the HOD's department in bulk
///
/// The department of every row is forced to the HOD's own.
#[utoipa::path(
    post,
    path = "/api/hod/users/bulk",
    request_body = BulkCreateUsersRequest,
    responses(
        (status = 200, description = "Per-row provisioning report", body = ProvisionReport),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_create_users_bulk(
    hod: HodUser,
    Json(payload): Json<BulkCreateUsersRequest>,
) -> AppResult<(StatusCode, Json<ProvisionReport>)> {
    if payload.users.is_empty() {
        return Err(AppError::bad_request("No users provided"));
    }

    let mut report = ProvisionReport::default();
    provisioner(ProvisionPolicy::hod(hod.department_id))?
        .provision_all(numbered(payload.users), &mut report)
        .await;
    tracing::info!(department_id = %hod.department_id, total = report.total, failed = report.failed, "HOD bulk user creation finished");

    Ok((StatusCode::OK, Json(report)))
}
