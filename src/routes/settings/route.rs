use axum::{Json, Router, http::StatusCode, routing::get};

use super::dto::{SettingsResponse, UpdateSettingsRequest};
use crate::error::{AppResult, ErrorResponse};
use crate::extractor::PrincipalUser;
use crate::repositories::{SettingsRepository, SettingsUpdate};

pub fn create_route() -> Router {
    Router::new().route("/api/admin/settings", get(get_settings).put(update_settings))
}

/// College settings
#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses(
        (status = 200, description = "Settings retrieved", body = SettingsResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_settings(
    _principal: PrincipalUser,
) -> AppResult<(StatusCode, Json<SettingsResponse>)> {
    let settings = SettingsRepository::new().get().await?;
    Ok((StatusCode::OK, Json(settings.into())))
}

/// Update college settings
///
/// Changing `current_academic_year` changes which enrollment students see as current.
#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = SettingsResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_settings(
    _principal: PrincipalUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> AppResult<(StatusCode, Json<SettingsResponse>)> {
    payload.validate()?;

    let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
    let settings = SettingsRepository::new()
        .update(SettingsUpdate {
            college_name: trim(payload.college_name),
            address: trim(payload.address),
            contact_email: trim(payload.contact_email),
            contact_phone: trim(payload.contact_phone),
            website: trim(payload.website),
            current_academic_year: trim(payload.current_academic_year),
        })
        .await?;
    tracing::info!(academic_year = %settings.current_academic_year, "College settings updated");

    Ok((StatusCode::OK, Json(settings.into())))
}
