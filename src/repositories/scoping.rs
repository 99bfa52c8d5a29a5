//! Sub-queries shared by repositories to keep every query inside the caller's scope.

use sea_orm::sea_query::{Expr, Func, SelectStatement, SimpleExpr};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect, QueryTrait};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::entities::{batch, enrollment, subject, user};

/// Ids of the students belonging to `department_id`.
pub fn students_of_department(department_id: Uuid) -> SelectStatement {
    user::Entity::find()
        .select_only()
        .column(user::Column::UserId)
        .filter(user::Column::Role.eq(RoleEnum::Student))
        .filter(user::Column::DepartmentId.eq(department_id))
        .into_query()
}

/// Ids of the subjects assigned to `faculty_id`.
pub fn subjects_of_faculty(faculty_id: Uuid) -> SelectStatement {
    subject::Entity::find()
        .select_only()
        .column(subject::Column::SubjectId)
        .filter(subject::Column::FacultyId.eq(faculty_id))
        .into_query()
}

/// Ids of the subjects owned by `department_id`.
pub fn subjects_of_department(department_id: Uuid) -> SelectStatement {
    subject::Entity::find()
        .select_only()
        .column(subject::Column::SubjectId)
        .filter(subject::Column::DepartmentId.eq(department_id))
        .into_query()
}

/// Ids of the batches owned by `department_id`.
pub fn batches_of_department(department_id: Uuid) -> SelectStatement {
    batch::Entity::find()
        .select_only()
        .column(batch::Column::BatchId)
        .filter(batch::Column::DepartmentId.eq(department_id))
        .into_query()
}

/// Ids of the students enrolled in `batch_id`.
pub fn students_of_batch(batch_id: Uuid) -> SelectStatement {
    enrollment::Entity::find()
        .select_only()
        .column(enrollment::Column::StudentId)
        .filter(enrollment::Column::BatchId.eq(batch_id))
        .into_query()
}

/// `lower(column) = lower(value)`.
pub fn eq_ignore_case<C>(column: C, value: &str) -> SimpleExpr
where
    C: ColumnTrait,
{
    Expr::expr(Func::lower(Expr::col(column))).eq(value.trim().to_lowercase())
}

/// `lower(column) LIKE %lower(term)%`.
pub fn contains_ignore_case<C>(column: C, term: &str) -> SimpleExpr
where
    C: ColumnTrait,
{
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", term.trim().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbBackend;

    fn render(statement: SelectStatement) -> String {
        DbBackend::Postgres.build(&statement).to_string()
    }

    #[test]
    fn test_students_of_department_excludes_staff() {
        let department_id = Uuid::new_v4();
        let sql = render(students_of_department(department_id));
        assert!(sql.starts_with(r#"SELECT "user"."user_id" FROM "user""#));
        assert!(sql.contains("'student'"));
        assert!(sql.contains(&format!(r#""user"."department_id" = '{}'"#, department_id)));
    }

    #[test]
    fn test_students_of_batch_reads_enrollments() {
        let batch_id = Uuid::new_v4();
        let sql = render(students_of_batch(batch_id));
        assert_eq!(
            sql,
            format!(
                r#"SELECT "enrollment"."student_id" FROM "enrollment" WHERE "enrollment"."batch_id" = '{}'"#,
                batch_id
            )
        );
    }

    #[test]
    fn test_case_insensitive_helpers() {
        let sql = render(
            user::Entity::find()
                .select_only()
                .column(user::Column::UserId)
                .filter(eq_ignore_case(user::Column::Email, " Ada@Uni.EDU "))
                .into_query(),
        );
        assert!(sql.contains(r#"LOWER("email") = 'ada@uni.edu'"#));
    }
}
