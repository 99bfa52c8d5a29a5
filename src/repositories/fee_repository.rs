use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::FeeStatus;
use crate::entities::{fee, user};
use crate::error::AppError;
use crate::middleware::permission::Scope;
use crate::repositories::scoping::{students_of_batch, students_of_department};
use crate::services::fee_rules::FeePayment;
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct FeeRepository;

#[derive(Debug, Default, Clone)]
pub struct FeeFilter {
    pub status: Option<FeeStatus>,
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Default)]
pub struct FeeUpdate {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeTotals {
    pub count: u64,
    pub billed: Decimal,
    pub collected: Decimal,
}

fn scoped(scope: &Scope, filter: FeeFilter) -> Select<fee::Entity> {
    let mut query = fee::Entity::find();

    if let Some(department_id) = scope.department_filter() {
        query = query.filter(fee::Column::StudentId.in_subquery(students_of_department(department_id)));
    }
    if let Some(student_id) = scope.student_filter() {
        query = query.filter(fee::Column::StudentId.eq(student_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(fee::Column::Status.eq(status));
    }
    if let Some(student_id) = filter.student_id {
        query = query.filter(fee::Column::StudentId.eq(student_id));
    }
    query
}

impl FeeRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_by_id(&self, fee_id: Uuid) -> Result<Option<fee::Model>> {
        let db = self.get_connection()?;
        Ok(fee::Entity::find_by_id(fee_id).one(db).await?)
    }

    pub async fn find_all_with_pagination(
        &self,
        scope: &Scope,
        filter: FeeFilter,
        page: PageRequest,
    ) -> Result<(Vec<fee::Model>, u64)> {
        let db = self.get_connection()?;
        let query = scoped(scope, filter);

        let total = query.clone().count(db).await?;
        let fees = query
            .order_by_asc(fee::Column::DueDate)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;

        Ok((fees, total))
    }

    /// Every fee in scope together with its student, for the CSV export.
    pub async fn find_with_students(
        &self,
        scope: &Scope,
        filter: FeeFilter,
    ) -> Result<Vec<(fee::Model, Option<user::Model>)>> {
        let db = self.get_connection()?;
        let rows = scoped(scope, filter)
            .find_also_related(user::Entity)
            .order_by_asc(fee::Column::DueDate)
            .all(db)
            .await?;
        Ok(rows)
    }

    pub async fn create(
        &self,
        student_id: Uuid,
        description: String,
        amount: Decimal,
        due_date: NaiveDate,
    ) -> Result<fee::Model> {
        let db = self.get_connection()?;
        Ok(new_fee(student_id, description, amount, due_date).insert(db).await?)
    }

    /// Bills every student enrolled in the batch, in one transaction.
    pub async fn create_for_batch(
        &self,
        batch_id: Uuid,
        description: String,
        amount: Decimal,
        due_date: NaiveDate,
    ) -> Result<Vec<fee::Model>> {
        let db = self.get_connection()?;
        let txn = db.begin().await?;

        let student_ids: Vec<Uuid> = user::Entity::find()
            .select_only()
            .column(user::Column::UserId)
            .filter(user::Column::UserId.in_subquery(students_of_batch(batch_id)))
            .into_tuple()
            .all(&txn)
            .await?;
        if student_ids.is_empty() {
            return Err(AppError::bad_request("The batch has no enrolled students").into());
        }

        let mut fees = Vec::with_capacity(student_ids.len());
        for student_id in student_ids {
            let created = new_fee(student_id, description.clone(), amount, due_date)
                .insert(&txn)
                .await?;
            fees.push(created);
        }

        txn.commit().await?;
        tracing::info!(batch_id = %batch_id, count = fees.len(), "Created batch fees");
        Ok(fees)
    }

    pub async fn update(&self, fee: fee::Model, updates: FeeUpdate) -> Result<fee::Model> {
        let db = self.get_connection()?;
        let mut active_model: fee::ActiveModel = fee.into();
        if let Some(description) = updates.description {
            active_model.description = Set(description);
        }
        if let Some(amount) = updates.amount {
            active_model.amount = Set(amount);
        }
        if let Some(due_date) = updates.due_date {
            active_model.due_date = Set(due_date);
        }
        active_model.updated_at = Set(Utc::now().naive_utc());
        Ok(active_model.update(db).await?)
    }

    pub async fn apply_payment(&self, fee: fee::Model, payment: FeePayment) -> Result<fee::Model> {
        let db = self.get_connection()?;
        let mut active_model: fee::ActiveModel = fee.into();
        active_model.status = Set(payment.status);
        active_model.amount_paid = Set(payment.amount_paid);
        active_model.paid_at = Set(payment.paid_at);
        active_model.updated_at = Set(Utc::now().naive_utc());
        Ok(active_model.update(db).await?)
    }

    pub async fn delete(&self, fee_id: Uuid) -> Result<()> {
        let db = self.get_connection()?;
        let result = fee::Entity::delete_by_id(fee_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Fee not found").into());
        }
        Ok(())
    }

    /// Moves every pending fee past its due date to `OVERDUE`.
    pub async fn mark_overdue(&self, today: NaiveDate) -> Result<u64> {
        let db = self.get_connection()?;
        let result = fee::Entity::update_many()
            .col_expr(fee::Column::Status, FeeStatus::Overdue.as_enum())
            .col_expr(fee::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
            .filter(fee::Column::Status.eq(FeeStatus::Pending))
            .filter(fee::Column::DueDate.lt(today))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn totals(&self, scope: &Scope) -> Result<FeeTotals> {
        let db = self.get_connection()?;
        let query = scoped(scope, FeeFilter::default());
        let count = query.clone().count(db).await?;
        let sums: Option<(Option<Decimal>, Option<Decimal>)> = query
            .select_only()
            .column_as(fee::Column::Amount.sum(), "billed")
            .column_as(fee::Column::AmountPaid.sum(), "collected")
            .into_tuple()
            .one(db)
            .await?;
        let (billed, collected) = sums.unwrap_or((None, None));
        Ok(FeeTotals {
            count,
            billed: billed.unwrap_or(Decimal::ZERO),
            collected: collected.unwrap_or(Decimal::ZERO),
        })
    }
}

fn new_fee(student_id: Uuid, description: String, amount: Decimal, due_date: NaiveDate) -> fee::ActiveModel {
    let now = Utc::now().naive_utc();
    fee::ActiveModel {
        fee_id: Set(Uuid::new_v4()),
        student_id: Set(student_id),
        description: Set(description),
        amount: Set(amount),
        amount_paid: Set(Decimal::ZERO),
        due_date: Set(due_date),
        status: Set(FeeStatus::Pending),
        paid_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_hod_fees_limited_to_department_students() {
        let department_id = Uuid::new_v4();
        let sql = scoped(&Scope::Department(department_id), FeeFilter::default())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""fee"."student_id" IN (SELECT "user"."user_id" FROM "user""#));
        assert!(sql.contains(&format!(r#""user"."department_id" = '{}'"#, department_id)));
        assert!(sql.contains("'student'"));
    }

    #[test]
    fn test_student_fees_limited_to_self() {
        let student_id = Uuid::new_v4();
        let filter = FeeFilter {
            status: Some(FeeStatus::Overdue),
            ..Default::default()
        };
        let sql = scoped(&Scope::Own(student_id), filter)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(&format!(r#""fee"."student_id" = '{}'"#, student_id)));
        assert!(sql.contains("'overdue'"));
        assert!(!sql.contains("IN (SELECT"));
    }
}
