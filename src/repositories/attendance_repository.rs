use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Insert, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::attendance;
use crate::entities::sea_orm_active_enums::AttendanceStatus;
use crate::middleware::permission::Scope;
use crate::repositories::scoping::{students_of_department, subjects_of_faculty};
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct AttendanceRepository;

#[derive(Debug, Default, Clone)]
pub struct AttendanceFilter {
    pub subject_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AttendanceRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_all_with_pagination(
        &self,
        scope: &Scope,
        filter: AttendanceFilter,
        page: PageRequest,
    ) -> Result<(Vec<attendance::Model>, u64)> {
        let db = self.get_connection()?;
        let query = scoped(scope, filter);

        let total = query.clone().count(db).await?;
        let records = query
            .order_by_desc(attendance::Column::Date)
            .order_by_asc(attendance::Column::StudentId)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;

        Ok((records, total))
    }

    pub async fn find_for_student(&self, student_id: Uuid) -> Result<Vec<attendance::Model>> {
        let db = self.get_connection()?;
        let records = attendance::Entity::find()
            .filter(attendance::Column::StudentId.eq(student_id))
            .order_by_desc(attendance::Column::Date)
            .all(db)
            .await?;
        Ok(records)
    }

    pub async fn find_for_subject_on(
        &self,
        subject_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<attendance::Model>> {
        let db = self.get_connection()?;
        let records = attendance::Entity::find()
            .filter(attendance::Column::SubjectId.eq(subject_id))
            .filter(attendance::Column::Date.eq(date))
            .all(db)
            .await?;
        Ok(records)
    }

    /// Marks attendance for one subject and date. Re-marking a student overwrites the
    /// previous status; the whole batch is written in one transaction.
    pub async fn upsert_bulk(
        &self,
        subject_id: Uuid,
        date: NaiveDate,
        marked_by: Uuid,
        entries: Vec<(Uuid, AttendanceStatus)>,
    ) -> Result<Vec<attendance::Model>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let txn = db.begin().await?;

        upsert_statement(subject_id, date, marked_by, entries, now)
            .exec(&txn)
            .await?;

        let records = attendance::Entity::find()
            .filter(attendance::Column::SubjectId.eq(subject_id))
            .filter(attendance::Column::Date.eq(date))
            .order_by_asc(attendance::Column::StudentId)
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(records)
    }
}

fn scoped(scope: &Scope, filter: AttendanceFilter) -> Select<attendance::Entity> {
    let mut query = attendance::Entity::find();

    if let Some(department_id) = scope.department_filter() {
        query = query.filter(
            attendance::Column::StudentId.in_subquery(students_of_department(department_id)),
        );
    }
    if let Some(faculty_id) = scope.faculty_filter() {
        query =
            query.filter(attendance::Column::SubjectId.in_subquery(subjects_of_faculty(faculty_id)));
    }
    if let Some(student_id) = scope.student_filter() {
        query = query.filter(attendance::Column::StudentId.eq(student_id));
    }

    if let Some(subject_id) = filter.subject_id {
        query = query.filter(attendance::Column::SubjectId.eq(subject_id));
    }
    if let Some(student_id) = filter.student_id {
        query = query.filter(attendance::Column::StudentId.eq(student_id));
    }
    if let Some(from) = filter.from {
        query = query.filter(attendance::Column::Date.gte(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(attendance::Column::Date.lte(to));
    }
    query
}

/// One row per (student, subject, date); a repeated mark replaces status and marker.
fn upsert_statement(
    subject_id: Uuid,
    date: NaiveDate,
    marked_by: Uuid,
    entries: Vec<(Uuid, AttendanceStatus)>,
    now: NaiveDateTime,
) -> Insert<attendance::ActiveModel> {
    let models = entries.into_iter().map(|(student_id, status)| attendance::ActiveModel {
        attendance_id: Set(Uuid::new_v4()),
        student_id: Set(student_id),
        subject_id: Set(subject_id),
        date: Set(date),
        status: Set(status),
        marked_by: Set(marked_by),
        created_at: Set(now),
        updated_at: Set(now),
    });

    attendance::Entity::insert_many(models).on_conflict(
        OnConflict::columns([
            attendance::Column::StudentId,
            attendance::Column::SubjectId,
            attendance::Column::Date,
        ])
        .update_columns([
            attendance::Column::Status,
            attendance::Column::MarkedBy,
            attendance::Column::UpdatedAt,
        ])
        .to_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn sql_for(scope: Scope) -> String {
        scoped(&scope, AttendanceFilter::default())
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_hod_attendance_limited_to_department_students() {
        let department_id = Uuid::new_v4();
        let sql = sql_for(Scope::Department(department_id));
        assert!(sql.contains(r#""attendance"."student_id" IN (SELECT "user"."user_id" FROM "user""#));
        assert!(sql.contains(&format!(r#""user"."department_id" = '{}'"#, department_id)));
    }

    #[test]
    fn test_faculty_attendance_limited_to_own_subjects() {
        let user_id = Uuid::new_v4();
        let sql = sql_for(Scope::Faculty {
            user_id,
            department_id: Some(Uuid::new_v4()),
        });
        assert!(sql.contains(r#""attendance"."subject_id" IN (SELECT "subject"."subject_id" FROM "subject""#));
        assert!(sql.contains(&format!(r#""subject"."faculty_id" = '{}'"#, user_id)));
    }

    #[test]
    fn test_student_attendance_limited_to_self() {
        let student_id = Uuid::new_v4();
        let sql = sql_for(Scope::Own(student_id));
        assert!(sql.contains(&format!(r#""attendance"."student_id" = '{}'"#, student_id)));
        assert!(!sql.contains("IN (SELECT"));
    }

    #[test]
    fn test_date_range_filter() {
        let filter = AttendanceFilter {
            from: NaiveDate::from_ymd_opt(2025, 1, 6),
            to: NaiveDate::from_ymd_opt(2025, 1, 10),
            ..Default::default()
        };
        let sql = scoped(&Scope::Institution, filter)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""attendance"."date" >= '2025-01-06'"#));
        assert!(sql.contains(r#""attendance"."date" <= '2025-01-10'"#));
    }

    #[test]
    fn test_remarking_overwrites_status() {
        let sql = upsert_statement(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            Uuid::new_v4(),
            vec![
                (Uuid::new_v4(), AttendanceStatus::Present),
                (Uuid::new_v4(), AttendanceStatus::Late),
            ],
            Utc::now().naive_utc(),
        )
        .build(DbBackend::Postgres)
        .to_string();

        assert!(sql.starts_with(r#"INSERT INTO "attendance""#));
        assert!(sql.contains(r#"ON CONFLICT ("student_id", "subject_id", "date") DO UPDATE SET"#));
        assert!(sql.contains(r#""status" = "excluded"."status""#));
        assert!(sql.contains(r#""marked_by" = "excluded"."marked_by""#));
        assert!(!sql.contains(r#""created_at" = "excluded"."created_at""#));
    }
}
