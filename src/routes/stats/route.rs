use axum::{Json, Router, http::StatusCode, routing::get};

use super::dto::{AdminStatsResponse, HodStatsResponse, RoleCounts};
use crate::error::AppResult;
use crate::extractor::{HodUser, PrincipalUser};
use crate::middleware::permission::Scope;
use crate::repositories::{
    BatchRepository, ComplaintRepository, DepartmentRepository, FeeRepository, SubjectRepository,
    UserRepository,
};

pub fn create_route() -> Router {
    Router::new()
        .route("/api/admin/stats", get(get_admin_stats))
        .route("/api/hod/stats", get(get_hod_stats))
}

/// Institution dashboard counters
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Statistics retrieved", body = AdminStatsResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_admin_stats(
    _principal: PrincipalUser,
) -> AppResult<(StatusCode, Json<AdminStatsResponse>)> {
    let users = RoleCounts::from_rows(UserRepository::new().count_by_role(None).await?);
    let departments = DepartmentRepository::new().count().await?;
    let batches = BatchRepository::new().count(None).await?;
    let subjects = SubjectRepository::new().count(None).await?;
    let pending_complaints = ComplaintRepository::new().count_pending(None).await?;
    let fees = FeeRepository::new().totals(&Scope::Institution).await?;

    Ok((
        StatusCode::OK,
        Json(AdminStatsResponse {
            users,
            departments,
            batches,
            subjects,
            pending_complaints,
            fees: fees.into(),
        }),
    ))
}

/// Department dashboard counters
#[utoipa::path(
    get,
    path = "/api/hod/stats",
    responses(
        (status = 200, description = "Statistics retrieved", body = HodStatsResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn get_hod_stats(hod: HodUser) -> AppResult<(StatusCode, Json<HodStatsResponse>)> {
    let department_id = Some(hod.department_id);
    let users = RoleCounts::from_rows(UserRepository::new().count_by_role(department_id).await?);
    let batches = BatchRepository::new().count(department_id).await?;
    let subjects = SubjectRepository::new().count(department_id).await?;
    let pending_complaints = ComplaintRepository::new()
        .count_pending(department_id)
        .await?;
    let fees = FeeRepository::new().totals(&hod.scope()).await?;

    Ok((
        StatusCode::OK,
        Json(HodStatsResponse {
            department_id: hod.department_id,
            users,
            batches,
            subjects,
            pending_complaints,
            fees: fees.into(),
        }),
    ))
}
