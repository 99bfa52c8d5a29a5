use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Insert, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::grade;
use crate::entities::sea_orm_active_enums::ExamType;
use crate::middleware::permission::Scope;
use crate::repositories::scoping::{students_of_department, subjects_of_faculty};
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct GradeRepository;

#[derive(Debug, Default, Clone)]
pub struct GradeFilter {
    pub subject_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub exam_type: Option<ExamType>,
}

pub struct GradeEntry {
    pub student_id: Uuid,
    pub marks: Decimal,
    pub remarks: Option<String>,
}

impl GradeRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_all_with_pagination(
        &self,
        scope: &Scope,
        filter: GradeFilter,
        page: PageRequest,
    ) -> Result<(Vec<grade::Model>, u64)> {
        let db = self.get_connection()?;
        let query = scoped(scope, filter);

        let total = query.clone().count(db).await?;
        let grades = query
            .order_by_asc(grade::Column::SubjectId)
            .order_by_asc(grade::Column::StudentId)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;

        Ok((grades, total))
    }

    /// Records one exam for a subject. A student already graded for the exam gets the
    /// new marks; all rows are written in one transaction.
    pub async fn upsert_bulk(
        &self,
        subject_id: Uuid,
        exam_type: ExamType,
        max_marks: Decimal,
        entries: Vec<GradeEntry>,
    ) -> Result<Vec<grade::Model>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let txn = db.begin().await?;

        upsert_statement(subject_id, exam_type, max_marks, entries, now)
            .exec(&txn)
            .await?;

        let grades = grade::Entity::find()
            .filter(grade::Column::SubjectId.eq(subject_id))
            .filter(grade::Column::ExamType.eq(exam_type))
            .order_by_asc(grade::Column::StudentId)
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(grades)
    }
}

fn scoped(scope: &Scope, filter: GradeFilter) -> Select<grade::Entity> {
    let mut query = grade::Entity::find();

    if let Some(department_id) = scope.department_filter() {
        query =
            query.filter(grade::Column::StudentId.in_subquery(students_of_department(department_id)));
    }
    if let Some(faculty_id) = scope.faculty_filter() {
        query = query.filter(grade::Column::SubjectId.in_subquery(subjects_of_faculty(faculty_id)));
    }
    if let Some(student_id) = scope.student_filter() {
        query = query.filter(grade::Column::StudentId.eq(student_id));
    }

    if let Some(subject_id) = filter.subject_id {
        query = query.filter(grade::Column::SubjectId.eq(subject_id));
    }
    if let Some(student_id) = filter.student_id {
        query = query.filter(grade::Column::StudentId.eq(student_id));
    }
    if let Some(exam_type) = filter.exam_type {
        query = query.filter(grade::Column::ExamType.eq(exam_type));
    }
    query
}

fn upsert_statement(
    subject_id: Uuid,
    exam_type: ExamType,
    max_marks: Decimal,
    entries: Vec<GradeEntry>,
    now: NaiveDateTime,
) -> Insert<grade::ActiveModel> {
    let models = entries.into_iter().map(|entry| grade::ActiveModel {
        grade_id: Set(Uuid::new_v4()),
        student_id: Set(entry.student_id),
        subject_id: Set(subject_id),
        exam_type: Set(exam_type),
        marks: Set(entry.marks),
        max_marks: Set(max_marks),
        remarks: Set(entry.remarks),
        created_at: Set(now),
        updated_at: Set(now),
    });

    grade::Entity::insert_many(models).on_conflict(
        OnConflict::columns([
            grade::Column::StudentId,
            grade::Column::SubjectId,
            grade::Column::ExamType,
        ])
        .update_columns([
            grade::Column::Marks,
            grade::Column::MaxMarks,
            grade::Column::Remarks,
            grade::Column::UpdatedAt,
        ])
        .to_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_hod_grades_limited_to_department_students() {
        let department_id = Uuid::new_v4();
        let sql = scoped(&Scope::Department(department_id), GradeFilter::default())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""grade"."student_id" IN (SELECT "user"."user_id" FROM "user""#));
        assert!(sql.contains(&format!(r#""user"."department_id" = '{}'"#, department_id)));
    }

    #[test]
    fn test_student_grades_limited_to_self() {
        let student_id = Uuid::new_v4();
        let filter = GradeFilter {
            exam_type: Some(ExamType::Midterm),
            ..Default::default()
        };
        let sql = scoped(&Scope::Own(student_id), filter)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(&format!(r#""grade"."student_id" = '{}'"#, student_id)));
        assert!(sql.contains("'midterm'"));
    }

    #[test]
    fn test_regrading_overwrites_marks() {
        let sql = upsert_statement(
            Uuid::new_v4(),
            ExamType::Final,
            Decimal::from(100),
            vec![GradeEntry {
                student_id: Uuid::new_v4(),
                marks: Decimal::from(88),
                remarks: None,
            }],
            Utc::now().naive_utc(),
        )
        .build(DbBackend::Postgres)
        .to_string();

        assert!(sql.contains(r#"ON CONFLICT ("student_id", "subject_id", "exam_type") DO UPDATE SET"#));
        assert!(sql.contains(r#""marks" = "excluded"."marks""#));
        assert!(sql.contains(r#""max_marks" = "excluded"."max_marks""#));
    }
}
