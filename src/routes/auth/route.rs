use axum::{
    Json, Router,
    http::StatusCode,
    routing::get,
};

use super::dto::{ProfileResponse, UpdateProfileRequest};
use crate::entities::user;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::CurrentUser;
use crate::repositories::{DepartmentRepository, UserRepository};
use crate::services::account_sync;
use crate::static_service::identity_provider;
use crate::utils::validation::FieldErrors;

pub fn create_route() -> Router {
    Router::new().route("/api/auth/me", get(get_me).put(update_me))
}

async fn profile_of(user: user::Model) -> AppResult<ProfileResponse> {
    let department = match user.department_id {
        Some(department_id) => DepartmentRepository::new().find_by_id(department_id).await?,
        None => None,
    };
    Ok(ProfileResponse {
        user: user.into(),
        department: department.map(Into::into),
    })
}

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile retrieved", body = ProfileResponse),
        (status = 401, description = "Missing, invalid or unprovisioned token", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn get_me(
    CurrentUser(user): CurrentUser,
) -> AppResult<(StatusCode, Json<ProfileResponse>)> {
    Ok((StatusCode::OK, Json(profile_of(user).await?)))
}

/// Update the caller's name and phone number
///
/// A name change is pushed to the identity provider as the display name; a failed push
/// does not fail the request.
#[utoipa::path(
    put,
    path = "/api/auth/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn update_me(
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<(StatusCode, Json<ProfileResponse>)> {
    let name = payload.name.map(|n| n.trim().to_string());
    let phone = payload.phone.map(|p| p.trim().to_string());

    let mut errors = FieldErrors::new();
    if let Some(name) = &name {
        errors.required("name", name);
    }
    if let Some(phone) = &phone {
        errors.check(phone.len() <= 20, "phone", "must be at most 20 characters");
    }
    errors.into_result()?;

    if name.is_none() && phone.is_none() {
        return Err(AppError::bad_request("Nothing to update"));
    }

    let updated = UserRepository::new()
        .update_profile(user.user_id, name.clone(), phone)
        .await?;

    if let Some(name) = name.filter(|n| *n != user.name) {
        let identity = identity_provider()?;
        account_sync::sync_display_name(identity.as_ref(), &updated.firebase_uid, &name).await;
    }

    Ok((StatusCode::OK, Json(profile_of(updated).await?)))
}
