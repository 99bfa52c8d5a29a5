use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::FeeStatus;
use crate::entities::{fee, user};
use crate::error::AppResult;
use crate::utils::pagination::{PageMeta, default_page, default_page_size};
use crate::utils::validation::FieldErrors;

#[derive(Debug, Deserialize, IntoParams)]
pub struct FeeQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub status: Option<FeeStatus>,
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FeeExportParams {
    pub status: Option<FeeStatus>,
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFeeRequest {
    pub student_id: Uuid,
    #[schema(example = "Tuition, semester 1")]
    pub description: String,
    #[schema(value_type = String, example = "25000.00")]
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBatchFeesRequest {
    pub batch_id: Uuid,
    pub description: String,
    #[schema(value_type = String, example = "1500.00")]
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

pub fn validate_new_fee(description: &str, amount: Decimal) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    errors
        .required("description", description)
        .check(amount > Decimal::ZERO, "amount", "must be greater than 0");
    errors.into_result()
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFeeRequest {
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFeeStatusRequest {
    #[schema(example = "PARTIALLY_PAID")]
    pub status: FeeStatus,
    /// Required for `PARTIALLY_PAID`, ignored otherwise
    #[schema(value_type = Option<String>, example = "400.00")]
    pub amount_paid: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeeResponse {
    pub fee_id: Uuid,
    pub student_id: Uuid,
    pub description: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub amount_paid: Decimal,
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub due_date: NaiveDate,
    pub status: FeeStatus,
    pub paid_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<fee::Model> for FeeResponse {
    fn from(fee: fee::Model) -> Self {
        let balance = if fee.status == FeeStatus::Waived {
            Decimal::ZERO
        } else {
            fee.amount - fee.amount_paid
        };
        Self {
            fee_id: fee.fee_id,
            student_id: fee.student_id,
            description: fee.description,
            amount: fee.amount,
            amount_paid: fee.amount_paid,
            balance,
            due_date: fee.due_date,
            status: fee.status,
            paid_at: fee.paid_at,
            created_at: fee.created_at,
            updated_at: fee.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeeListResponse {
    pub fees: Vec<FeeResponse>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchFeesResponse {
    pub batch_id: Uuid,
    pub created: usize,
    pub fees: Vec<FeeResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkOverdueResponse {
    pub updated: u64,
}

/// One line of the fee CSV export.
#[derive(Debug, Serialize)]
pub struct FeeExportRow {
    pub fee_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub roll_number: String,
    pub description: String,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub due_date: NaiveDate,
    pub status: &'static str,
    pub paid_at: String,
}

impl FeeExportRow {
    pub fn new(fee: fee::Model, student: Option<user::Model>) -> Self {
        let (student_name, student_email, roll_number) = match student {
            Some(student) => (
                student.name,
                student.email,
                student.roll_number.unwrap_or_default(),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        Self {
            fee_id: fee.fee_id,
            student_name,
            student_email,
            roll_number,
            description: fee.description,
            amount: fee.amount,
            amount_paid: fee.amount_paid,
            due_date: fee.due_date,
            status: fee.status.as_str(),
            paid_at: fee
                .paid_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fee(status: FeeStatus, amount: i64, paid: i64) -> fee::Model {
        let now = Utc::now().naive_utc();
        fee::Model {
            fee_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            description: "Library".to_string(),
            amount: Decimal::from(amount),
            amount_paid: Decimal::from(paid),
            due_date: now.date(),
            status,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_balance_of_partial_payment() {
        let response = FeeResponse::from(fee(FeeStatus::PartiallyPaid, 1000, 400));
        assert_eq!(response.balance, Decimal::from(600));
    }

    #[test]
    fn test_waived_fee_has_no_balance() {
        let response = FeeResponse::from(fee(FeeStatus::Waived, 1000, 0));
        assert_eq!(response.balance, Decimal::ZERO);
    }

    #[test]
    fn test_new_fee_validation() {
        assert!(validate_new_fee("Tuition", Decimal::from(10)).is_ok());
        assert!(validate_new_fee("", Decimal::from(10)).is_err());
        assert!(validate_new_fee("Tuition", Decimal::ZERO).is_err());
    }

    #[test]
    fn test_export_row_without_student() {
        let row = FeeExportRow::new(fee(FeeStatus::Pending, 50, 0), None);
        assert_eq!(row.status, "PENDING");
        assert!(row.student_name.is_empty());
        assert!(row.paid_at.is_empty());
    }
}
