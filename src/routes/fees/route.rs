use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{
    BatchFeesResponse, CreateBatchFeesRequest, CreateFeeRequest, FeeExportParams, FeeExportRow,
    FeeListResponse, FeeQueryParams, FeeResponse, MarkOverdueResponse, UpdateFeeRequest,
    UpdateFeeStatusRequest, validate_new_fee,
};
use crate::entities::fee;
use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::extractor::{HodUser, PrincipalUser, StudentUser};
use crate::middleware::permission::Scope;
use crate::repositories::{BatchRepository, FeeFilter, FeeRepository, FeeUpdate, UserRepository};
use crate::routes::dto::MessageResponse;
use crate::services::fee_rules;
use crate::utils::pagination::PageRequest;

pub fn create_route() -> Router {
    Router::new()
        .route("/api/admin/fees", get(get_all_fees).post(create_fee))
        .route("/api/admin/fees/bulk", post(create_batch_fees))
        .route("/api/admin/fees/mark-overdue", post(mark_overdue_fees))
        .route("/api/admin/fees/export", get(export_fees))
        .route(
            "/api/admin/fees/{fee_id}",
            get(get_fee).put(update_fee).delete(delete_fee),
        )
        .route("/api/admin/fees/{fee_id}/status", post(update_fee_status))
        .route("/api/hod/fees", get(hod_get_fees))
        .route("/api/student/fees", get(student_get_fees))
}

async fn list_fees(
    scope: Scope,
    params: FeeQueryParams,
) -> AppResult<(StatusCode, Json<FeeListResponse>)> {
    let page = PageRequest::new(params.page, params.page_size);
    let filter = FeeFilter {
        status: params.status,
        student_id: params.student_id,
    };
    let (fees, total) = FeeRepository::new()
        .find_all_with_pagination(&scope, filter, page)
        .await?;

    Ok((
        StatusCode::OK,
        Json(FeeListResponse {
            fees: fees.into_iter().map(Into::into).collect(),
            pagination: page.meta(total),
        }),
    ))
}

async fn find_fee(fee_id: Uuid) -> AppResult<fee::Model> {
    FeeRepository::new()
        .find_by_id(fee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Fee not found"))
}

/// Serializes fee rows into CSV with a header line.
pub fn fees_to_csv(rows: Vec<FeeExportRow>) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("Failed to flush CSV export: {}", err.error()))
}

/// List fees
#[utoipa::path(
    get,
    path = "/api/admin/fees",
    params(FeeQueryParams),
    responses(
        (status = 200, description = "Fees retrieved", body = FeeListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_all_fees(
    _principal: PrincipalUser,
    Query(params): Query<FeeQueryParams>,
) -> AppResult<(StatusCode, Json<FeeListResponse>)> {
    list_fees(Scope::Institution, params).await
}

/// Bill a student
#[utoipa::path(
    post,
    path = "/api/admin/fees",
    request_body = CreateFeeRequest,
    responses(
        (status = 201, description = "Fee created", body = FeeResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_fee(
    _principal: PrincipalUser,
    Json(payload): Json<CreateFeeRequest>,
) -> AppResult<(StatusCode, Json<FeeResponse>)> {
    validate_new_fee(&payload.description, payload.amount)?;

    let student = UserRepository::new()
        .find_by_id(payload.student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))?;
    if student.role != RoleEnum::Student {
        return Err(AppError::bad_request("Fees can only be billed to students"));
    }

    let fee = FeeRepository::new()
        .create(
            student.user_id,
            payload.description.trim().to_string(),
            payload.amount,
            payload.due_date,
        )
        .await?;
    tracing::info!(fee_id = %fee.fee_id, student_id = %student.user_id, "Fee created");

    Ok((StatusCode::CREATED, Json(fee.into())))
}

/// Bill every student enrolled in a batch
///
/// All fees are created in one transaction; a batch with no students is rejected.
#[utoipa::path(
    post,
    path = "/api/admin/fees/bulk",
    request_body = CreateBatchFeesRequest,
    responses(
        (status = 201, description = "Fees created", body = BatchFeesResponse),
        (status = 400, description = "Invalid input or empty batch", body = ErrorResponse),
        (status = 404, description = "Batch not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_batch_fees(
    _principal: PrincipalUser,
    Json(payload): Json<CreateBatchFeesRequest>,
) -> AppResult<(StatusCode, Json<BatchFeesResponse>)> {
    validate_new_fee(&payload.description, payload.amount)?;

    let batch = BatchRepository::new()
        .find_by_id(payload.batch_id)
        .await?
        .ok_or_else(|| AppError::not_found("Batch not found"))?;

    let fees = FeeRepository::new()
        .create_for_batch(
            batch.batch_id,
            payload.description.trim().to_string(),
            payload.amount,
            payload.due_date,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BatchFeesResponse {
            batch_id: batch.batch_id,
            created: fees.len(),
            fees: fees.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// Move pending fees past their due date to OVERDUE
#[utoipa::path(
    post,
    path = "/api/admin/fees/mark-overdue",
    responses(
        (status = 200, description = "Overdue fees marked", body = MarkOverdueResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn mark_overdue_fees(
    _principal: PrincipalUser,
) -> AppResult<(StatusCode, Json<MarkOverdueResponse>)> {
    let updated = FeeRepository::new()
        .mark_overdue(Utc::now().date_naive())
        .await?;
    tracing::info!(updated, "Marked overdue fees");

    Ok((StatusCode::OK, Json(MarkOverdueResponse { updated })))
}

/// Export fees as CSV
#[utoipa::path(
    get,
    path = "/api/admin/fees/export",
    params(FeeExportParams),
    responses(
        (status = 200, description = "CSV export", content_type = "text/csv", body = String)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn export_fees(
    _principal: PrincipalUser,
    Query(params): Query<FeeExportParams>,
) -> AppResult<impl IntoResponse> {
    let filter = FeeFilter {
        status: params.status,
        student_id: params.student_id,
    };
    let rows = FeeRepository::new()
        .find_with_students(&Scope::Institution, filter)
        .await?
        .into_iter()
        .map(|(fee, student)| FeeExportRow::new(fee, student))
        .collect();
    let body = fees_to_csv(rows)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"fees.csv\""),
        ],
        body,
    ))
}

/// Get a fee
#[utoipa::path(
    get,
    path = "/api/admin/fees/{fee_id}",
    params(("fee_id" = Uuid, Path, description = "Fee ID")),
    responses(
        (status = 200, description = "Fee retrieved", body = FeeResponse),
        (status = 404, description = "Fee not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_fee(
    _principal: PrincipalUser,
    Path(fee_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<FeeResponse>)> {
    let fee = find_fee(fee_id).await?;
    Ok((StatusCode::OK, Json(fee.into())))
}

/// Edit a fee's description, amount or due date
#[utoipa::path(
    put,
    path = "/api/admin/fees/{fee_id}",
    params(("fee_id" = Uuid, Path, description = "Fee ID")),
    request_body = UpdateFeeRequest,
    responses(
        (status = 200, description = "Fee updated", body = FeeResponse),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Fee not found", body = ErrorResponse),
        (status = 409, description = "Fee is already paid", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_fee(
    _principal: PrincipalUser,
    Path(fee_id): Path<Uuid>,
    Json(payload): Json<UpdateFeeRequest>,
) -> AppResult<(StatusCode, Json<FeeResponse>)> {
    let fee = find_fee(fee_id).await?;
    fee_rules::ensure_editable(&fee)?;
    if let Some(amount) = payload.amount {
        fee_rules::validate_amount_edit(&fee, amount)?;
    }
    let description = payload.description.map(|d| d.trim().to_string());
    if description.as_deref() == Some("") {
        return Err(AppError::bad_request("Fee description cannot be empty"));
    }

    let updated = FeeRepository::new()
        .update(
            fee,
            FeeUpdate {
                description,
                amount: payload.amount,
                due_date: payload.due_date,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(updated.into())))
}

/// Delete a fee that has not been paid
#[utoipa::path(
    delete,
    path = "/api/admin/fees/{fee_id}",
    params(("fee_id" = Uuid, Path, description = "Fee ID")),
    responses(
        (status = 200, description = "Fee deleted", body = MessageResponse),
        (status = 404, description = "Fee not found", body = ErrorResponse),
        (status = 409, description = "Fee is already paid", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_fee(
    _principal: PrincipalUser,
    Path(fee_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let fee = find_fee(fee_id).await?;
    fee_rules::ensure_editable(&fee)?;
    FeeRepository::new().delete(fee_id).await?;
    tracing::info!(fee_id = %fee_id, "Fee deleted");

    Ok((StatusCode::OK, Json(MessageResponse::new("Fee deleted"))))
}

/// Change a fee's payment status
#[utoipa::path(
    post,
    path = "/api/admin/fees/{fee_id}/status",
    params(("fee_id" = Uuid, Path, description = "Fee ID")),
    request_body = UpdateFeeStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = FeeResponse),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 404, description = "Fee not found", body = ErrorResponse),
        (status = 409, description = "Fee is already paid", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_fee_status(
    _principal: PrincipalUser,
    Path(fee_id): Path<Uuid>,
    Json(payload): Json<UpdateFeeStatusRequest>,
) -> AppResult<(StatusCode, Json<FeeResponse>)> {
    let fee = find_fee(fee_id).await?;
    let now = Utc::now().naive_utc();
    let payment = fee_rules::transition(
        &fee,
        payload.status,
        payload.amount_paid,
        now.date(),
        now,
    )?;

    let updated = FeeRepository::new().apply_payment(fee, payment).await?;
    tracing::info!(fee_id = %fee_id, status = updated.status.as_str(), "Fee status updated");

    Ok((StatusCode::OK, Json(updated.into())))
}

/// List fees of students in the HOD's department
#[utoipa::path(
    get,
    path = "/api/hod/fees",
    params(FeeQueryParams),
    responses(
        (status = 200, description = "Fees retrieved", body = FeeListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "HOD"
)]
pub async fn hod_get_fees(
    hod: HodUser,
    Query(params): Query<FeeQueryParams>,
) -> AppResult<(StatusCode, Json<FeeListResponse>)> {
    list_fees(hod.scope(), params).await
}

/// The caller's fees
#[utoipa::path(
    get,
    path = "/api/student/fees",
    params(FeeQueryParams),
    responses(
        (status = 200, description = "Fees retrieved", body = FeeListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_get_fees(
    student: StudentUser,
    Query(params): Query<FeeQueryParams>,
) -> AppResult<(StatusCode, Json<FeeListResponse>)> {
    list_fees(student.scope()?, params).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sea_orm_active_enums::FeeStatus;
    use rust_decimal::Decimal;

    #[test]
    fn test_csv_has_header_and_rows() {
        let now = Utc::now().naive_utc();
        let fee = fee::Model {
            fee_id: Uuid::nil(),
            student_id: Uuid::new_v4(),
            description: "Hostel, term 2".to_string(),
            amount: Decimal::from(1200),
            amount_paid: Decimal::ZERO,
            due_date: now.date(),
            status: FeeStatus::Overdue,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        let bytes = fees_to_csv(vec![FeeExportRow::new(fee, None)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("fee_id,student_name,student_email"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Hostel, term 2\""));
        assert!(row.contains("OVERDUE"));
        assert!(lines.next().is_none());
    }
}
