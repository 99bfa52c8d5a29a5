//! Fee status machine.
//!
//! `PENDING` is the initial state. `PAID` is terminal: once a fee is paid its status,
//! amount and due date are frozen and it can no longer be deleted. Every transition keeps
//! `0 <= amount_paid <= amount`.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::entities::fee;
use crate::entities::sea_orm_active_enums::FeeStatus;
use crate::error::AppError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeeRuleError {
    #[error("Fee is already paid and can no longer be modified")]
    AlreadyPaid,

    #[error("{0}")]
    Invalid(String),
}

impl From<FeeRuleError> for AppError {
    fn from(err: FeeRuleError) -> Self {
        match err {
            FeeRuleError::AlreadyPaid => AppError::conflict(FeeRuleError::AlreadyPaid.to_string()),
            FeeRuleError::Invalid(message) => AppError::bad_request(message),
        }
    }
}

/// Payment fields after a transition has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePayment {
    pub status: FeeStatus,
    pub amount_paid: Decimal,
    pub paid_at: Option<NaiveDateTime>,
}

pub fn ensure_editable(fee: &fee::Model) -> Result<(), FeeRuleError> {
    if fee.status == FeeStatus::Paid {
        return Err(FeeRuleError::AlreadyPaid);
    }
    Ok(())
}

pub fn validate_amount(amount: Decimal) -> Result<(), FeeRuleError> {
    if amount <= Decimal::ZERO {
        return Err(FeeRuleError::Invalid(
            "Fee amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Checks an edit of `amount` keeps the recorded payment within bounds.
pub fn validate_amount_edit(fee: &fee::Model, new_amount: Decimal) -> Result<(), FeeRuleError> {
    ensure_editable(fee)?;
    validate_amount(new_amount)?;
    // a partial payment has to stay strictly below the amount
    if new_amount < fee.amount_paid
        || (fee.status == FeeStatus::PartiallyPaid && new_amount == fee.amount_paid)
    {
        return Err(FeeRuleError::Invalid(format!(
            "Fee amount must exceed the amount already paid ({})",
            fee.amount_paid
        )));
    }
    Ok(())
}

/// Whether the overdue sweep should move this fee to `OVERDUE`.
pub fn is_overdue(fee: &fee::Model, today: NaiveDate) -> bool {
    fee.status == FeeStatus::Pending && fee.due_date < today
}

/// Applies a status change requested by an administrator.
///
/// `amount_paid` is only read for `PARTIALLY_PAID`; the other targets fix it themselves.
pub fn transition(
    fee: &fee::Model,
    target: FeeStatus,
    amount_paid: Option<Decimal>,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<FeePayment, FeeRuleError> {
    ensure_editable(fee)?;

    match target {
        FeeStatus::Pending => Ok(FeePayment {
            status: FeeStatus::Pending,
            amount_paid: Decimal::ZERO,
            paid_at: None,
        }),
        FeeStatus::PartiallyPaid => {
            let paid = amount_paid.ok_or_else(|| {
                FeeRuleError::Invalid(
                    "amount_paid is required for a partial payment".to_string(),
                )
            })?;
            if paid <= Decimal::ZERO || paid >= fee.amount {
                return Err(FeeRuleError::Invalid(format!(
                    "A partial payment must be greater than 0 and less than {}",
                    fee.amount
                )));
            }
            Ok(FeePayment {
                status: FeeStatus::PartiallyPaid,
                amount_paid: paid,
                paid_at: None,
            })
        }
        FeeStatus::Paid => Ok(FeePayment {
            status: FeeStatus::Paid,
            amount_paid: fee.amount,
            paid_at: Some(now),
        }),
        FeeStatus::Waived => Ok(FeePayment {
            status: FeeStatus::Waived,
            amount_paid: Decimal::ZERO,
            paid_at: None,
        }),
        FeeStatus::Overdue => {
            if !is_overdue(fee, today) {
                return Err(FeeRuleError::Invalid(
                    "Only a pending fee past its due date can be marked overdue".to_string(),
                ));
            }
            Ok(FeePayment {
                status: FeeStatus::Overdue,
                amount_paid: fee.amount_paid,
                paid_at: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn fee_of(amount: i64, due_date: NaiveDate) -> fee::Model {
        let now = Utc::now().naive_utc();
        fee::Model {
            fee_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            description: "Tuition".to_string(),
            amount: Decimal::from(amount),
            amount_paid: Decimal::ZERO,
            due_date,
            status: FeeStatus::Pending,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(fee: &mut fee::Model, payment: FeePayment) {
        fee.status = payment.status;
        fee.amount_paid = payment.amount_paid;
        fee.paid_at = payment.paid_at;
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_partial_then_paid() {
        let today = day(2025, 1, 10);
        let now = Utc::now().naive_utc();
        let mut fee = fee_of(1000, day(2025, 2, 1));

        let payment = transition(
            &fee,
            FeeStatus::PartiallyPaid,
            Some(Decimal::from(400)),
            today,
            now,
        )
        .unwrap();
        assert_eq!(payment.status, FeeStatus::PartiallyPaid);
        assert_eq!(payment.amount_paid, Decimal::from(400));
        apply(&mut fee, payment);

        let payment = transition(&fee, FeeStatus::Paid, None, today, now).unwrap();
        assert_eq!(payment.status, FeeStatus::Paid);
        assert_eq!(payment.amount_paid, Decimal::from(1000));
        assert_eq!(payment.paid_at, Some(now));
    }

    #[test]
    fn test_partial_payment_bounds() {
        let today = day(2025, 1, 10);
        let now = Utc::now().naive_utc();
        let fee = fee_of(1000, day(2025, 2, 1));

        for paid in [0, 1000, 1500, -5] {
            assert!(matches!(
                transition(&fee, FeeStatus::PartiallyPaid, Some(Decimal::from(paid)), today, now),
                Err(FeeRuleError::Invalid(_))
            ));
        }
        assert!(transition(&fee, FeeStatus::PartiallyPaid, None, today, now).is_err());
    }

    #[test]
    fn test_paid_is_terminal() {
        let today = day(2025, 1, 10);
        let now = Utc::now().naive_utc();
        let mut fee = fee_of(1000, day(2025, 2, 1));
        let payment = transition(&fee, FeeStatus::Paid, None, today, now).unwrap();
        apply(&mut fee, payment);

        for target in [
            FeeStatus::Pending,
            FeeStatus::Waived,
            FeeStatus::Paid,
            FeeStatus::Overdue,
        ] {
            assert_eq!(
                transition(&fee, target, None, today, now),
                Err(FeeRuleError::AlreadyPaid)
            );
        }
        assert_eq!(ensure_editable(&fee), Err(FeeRuleError::AlreadyPaid));
        assert_eq!(
            validate_amount_edit(&fee, Decimal::from(2000)),
            Err(FeeRuleError::AlreadyPaid)
        );
    }

    #[test]
    fn test_waive_and_reset_clear_payment() {
        let today = day(2025, 1, 10);
        let now = Utc::now().naive_utc();
        let mut fee = fee_of(1000, day(2025, 2, 1));
        let payment = transition(
            &fee,
            FeeStatus::PartiallyPaid,
            Some(Decimal::from(250)),
            today,
            now,
        )
        .unwrap();
        apply(&mut fee, payment);

        let waived = transition(&fee, FeeStatus::Waived, None, today, now).unwrap();
        assert_eq!(waived.amount_paid, Decimal::ZERO);

        let reset = transition(&fee, FeeStatus::Pending, None, today, now).unwrap();
        assert_eq!(reset.status, FeeStatus::Pending);
        assert_eq!(reset.amount_paid, Decimal::ZERO);
    }

    #[test]
    fn test_overdue_only_from_pending_past_due() {
        let now = Utc::now().naive_utc();
        let fee = fee_of(1000, day(2025, 2, 1));

        assert!(transition(&fee, FeeStatus::Overdue, None, day(2025, 2, 1), now).is_err());
        let payment = transition(&fee, FeeStatus::Overdue, None, day(2025, 2, 2), now).unwrap();
        assert_eq!(payment.status, FeeStatus::Overdue);

        let mut partial = fee.clone();
        partial.status = FeeStatus::PartiallyPaid;
        partial.amount_paid = Decimal::from(10);
        assert!(!is_overdue(&partial, day(2025, 3, 1)));
        assert!(is_overdue(&fee, day(2025, 3, 1)));
    }

    #[test]
    fn test_amount_edit_cannot_drop_below_paid() {
        let mut fee = fee_of(1000, day(2025, 2, 1));
        fee.status = FeeStatus::PartiallyPaid;
        fee.amount_paid = Decimal::from(400);

        assert!(matches!(
            validate_amount_edit(&fee, Decimal::from(300)),
            Err(FeeRuleError::Invalid(_))
        ));
        assert!(validate_amount_edit(&fee, Decimal::from(400)).is_err());
        assert!(validate_amount_edit(&fee, Decimal::from(401)).is_ok());
        assert!(validate_amount_edit(&fee, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_rule_errors_map_to_http() {
        assert_eq!(
            AppError::from(FeeRuleError::AlreadyPaid).status_code(),
            axum::http::StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(FeeRuleError::Invalid("x".into())).status_code(),
            axum::http::StatusCode::BAD_REQUEST
        );
    }
}
