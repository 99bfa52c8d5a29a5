use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use super::dto::{
    CreateNoticeRequest, NoticeListResponse, NoticeQueryParams, NoticeResponse,
    UpdateNoticeRequest,
};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::{CurrentUser, HodUser, PrincipalUser};
use crate::repositories::{DepartmentRepository, NewNotice, NoticeRepository, NoticeUpdate};
use crate::routes::dto::MessageResponse;
use crate::utils::pagination::PageRequest;

pub fn create_route() -> Router {
    Router::new()
        .route("/api/notices", get(get_notices))
        .route(
            "/api/admin/notices",
            get(get_all_notices).post(create_notice),
        )
        .route(
            "/api/admin/notices/{notice_id}",
            put(update_notice).delete(delete_notice),
        )
        .route(
            "/api/hod/notices",
            get(hod_get_notices).post(hod_create_notice),
        )
}

async fn ensure_department_exists(department_id: Option<Uuid>) -> AppResult<()> {
    if let Some(department_id) = department_id {
        DepartmentRepository::new()
            .find_by_id(department_id)
            .await?
            .ok_or_else(|| AppError::not_found("Department not found"))?;
    }
    Ok(())
}

/// Notices visible to the caller
///
/// Institution-wide notices plus those of the caller's department, filtered by audience.
#[utoipa::path(
    get,
    path = "/api/notices",
    params(NoticeQueryParams),
    responses(
        (status = 200, description = "Notices retrieved", body = NoticeListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Notices"
)]
pub async fn get_notices(
    current_user: CurrentUser,
    Query(params): Query<NoticeQueryParams>,
) -> AppResult<(StatusCode, Json<NoticeListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let (notices, total) = NoticeRepository::new()
        .find_visible(&current_user.0, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(NoticeListResponse {
            notices: notices.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

/// List all notices
#[utoipa::path(
    get,
    path = "/api/admin/notices",
    params(NoticeQueryParams),
    responses(
        (status = 200, description = "Notices retrieved", body = NoticeListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_all_notices(
    _principal: PrincipalUser,
    Query(params): Query<NoticeQueryParams>,
) -> AppResult<(StatusCode, Json<NoticeListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let (notices, total) = NoticeRepository::new()
        .find_all_with_pagination(params.department_id, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(NoticeListResponse {
            notices: notices.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

/// Publish a notice
#[utoipa::path(
    post,
    path = "/api/admin/notices",
    request_body = CreateNoticeRequest,
    responses(
        (status = 201, description = "Notice created", body = NoticeResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Department not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_notice(
    principal: PrincipalUser,
    Json(payload): Json<CreateNoticeRequest>,
) -> AppResult<(StatusCode, Json<NoticeResponse>)> {
    payload.validate()?;
    ensure_department_exists(payload.department_id).await?;

    let notice = NoticeRepository::new()
        .create(NewNotice {
            title: payload.title.trim().to_string(),
            content: payload.content.trim().to_string(),
            audience: payload.audience,
            department_id: payload.department_id,
            author_id: principal.id(),
        })
        .await?;
    tracing::info!(notice_id = %notice.notice_id, "Notice published");

    Ok((StatusCode::CREATED, Json(notice.into())))
}

/// Update a notice
#[utoipa::path(
    put,
    path = "/api/admin/notices/{notice_id}",
    params(("notice_id" = Uuid, Path, description = "Notice ID")),
    request_body = UpdateNoticeRequest,
    responses(
        (status = 200, description = "Notice updated", body = NoticeResponse),
        (status = 404, description = "Notice not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_notice(
    _principal: PrincipalUser,
    Path(notice_id): Path<Uuid>,
    Json(payload): Json<UpdateNoticeRequest>,
) -> AppResult<(StatusCode, Json<NoticeResponse>)> {
    payload.validate()?;
    if let Some(department_id) = payload.department_id {
        ensure_department_exists(department_id).await?;
    }

    let notice = NoticeRepository::new()
        .update(
            notice_id,
            NoticeUpdate {
                title: payload.title.map(|t| t.trim().to_string()),
                content: payload.content.map(|c| c.trim().to_string()),
                audience: payload.audience,
                department_id: payload.department_id,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(notice.into())))
}

/// Delete a notice
#[utoipa::path(
    delete,
    path = "/api/admin/notices/{notice_id}",
    params(("notice_id" = Uuid, Path, description = "Notice ID")),
    responses(
        (status = 200, description = "Notice deleted", body = MessageResponse),
        (status = 404, description = "Notice not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_notice(
    _principal: PrincipalUser,
    Path(notice_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    NoticeRepository::new().delete(notice_id).await?;
    tracing::info!(notice_id = %notice_id, "Notice deleted");

    Ok((StatusCode::OK, Json(MessageResponse::new("Notice deleted"))))
}

/// List the department's notices
#[utoipa::path(
    get,
    path = "/api/hod/notices",
    params(NoticeQueryParams),
    responses(
        (status = 200, description = "Notices retrieved", body = NoticeListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_get_notices(
    hod: HodUser,
    Query(params): Query<NoticeQueryParams>,
) -> AppResult<(StatusCode, Json<NoticeListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let (notices, total) = NoticeRepository::new()
        .find_all_with_pagination(Some(hod.department_id), page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(NoticeListResponse {
            notices: notices.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

/// Publish a notice to the HOD's department
#[utoipa::path(
    post,
    path = "/api/hod/notices",
    request_body = CreateNoticeRequest,
    responses(
        (status = 201, description = "Notice created", body = NoticeResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Department outside the HOD's scope", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_create_notice(
    hod: HodUser,
    Json(payload): Json<CreateNoticeRequest>,
) -> AppResult<(StatusCode, Json<NoticeResponse>)> {
    payload.validate()?;
    if let Some(department_id) = payload.department_id {
        hod.scope().ensure_department(Some(department_id))?;
    }

    let notice = NoticeRepository::new()
        .create(NewNotice {
            title: payload.title.trim().to_string(),
            content: payload.content.trim().to_string(),
            audience: payload.audience,
            department_id: Some(hod.department_id),
            author_id: hod.user.user_id,
        })
        .await?;
    tracing::info!(notice_id = %notice.notice_id, department_id = %hod.department_id, "Department notice published");

    Ok((StatusCode::CREATED, Json(notice.into())))
}
