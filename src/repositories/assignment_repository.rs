use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{assignment, submission};
use crate::error::AppError;
use crate::middleware::permission::Scope;
use crate::repositories::scoping::{subjects_of_department, subjects_of_faculty};
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct AssignmentRepository;

pub struct NewAssignment {
    pub subject_id: Uuid,
    pub faculty_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDateTime,
    pub max_marks: i32,
}

#[derive(Debug, Default)]
pub struct AssignmentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub max_marks: Option<i32>,
}

impl AssignmentRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_by_id(&self, assignment_id: Uuid) -> Result<Option<assignment::Model>> {
        let db = self.get_connection()?;
        Ok(assignment::Entity::find_by_id(assignment_id).one(db).await?)
    }

    pub async fn find_all_with_pagination(
        &self,
        scope: &Scope,
        subject_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<(Vec<assignment::Model>, u64)> {
        let db = self.get_connection()?;
        let query = scoped(scope, subject_id);

        let total = query.clone().count(db).await?;
        let assignments = query
            .order_by_desc(assignment::Column::DueDate)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;

        Ok((assignments, total))
    }

    pub async fn find_for_subjects(&self, subject_ids: Vec<Uuid>) -> Result<Vec<assignment::Model>> {
        if subject_ids.is_empty() {
            return Ok(Vec::new());
        }
        let db = self.get_connection()?;
        let assignments = assignment::Entity::find()
            .filter(assignment::Column::SubjectId.is_in(subject_ids))
            .order_by_asc(assignment::Column::DueDate)
            .all(db)
            .await?;
        Ok(assignments)
    }

    pub async fn create(&self, new_assignment: NewAssignment) -> Result<assignment::Model> {
        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let model = assignment::ActiveModel {
            assignment_id: Set(Uuid::new_v4()),
            subject_id: Set(new_assignment.subject_id),
            faculty_id: Set(new_assignment.faculty_id),
            title: Set(new_assignment.title),
            description: Set(new_assignment.description),
            due_date: Set(new_assignment.due_date),
            max_marks: Set(new_assignment.max_marks),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(db).await?)
    }

    pub async fn update(
        &self,
        assignment_id: Uuid,
        updates: AssignmentUpdate,
    ) -> Result<assignment::Model> {
        let db = self.get_connection()?;
        let txn = db.begin().await?;

        let assignment = assignment::Entity::find_by_id(assignment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("Assignment not found"))?;

        if let Some(max_marks) = updates.max_marks {
            let awarded = highest_awarded_marks(assignment_id)
                .into_tuple::<Option<i32>>()
                .one(&txn)
                .await?
                .flatten();
            ensure_covers_awarded(max_marks, awarded)?;
        }

        let mut active_model: assignment::ActiveModel = assignment.into();
        if let Some(title) = updates.title {
            active_model.title = Set(title);
        }
        if let Some(description) = updates.description {
            active_model.description = Set(Some(description).filter(|d| !d.is_empty()));
        }
        if let Some(due_date) = updates.due_date {
            active_model.due_date = Set(due_date);
        }
        if let Some(max_marks) = updates.max_marks {
            active_model.max_marks = Set(max_marks);
        }
        active_model.updated_at = Set(Utc::now().naive_utc());

        let updated = active_model.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, assignment_id: Uuid) -> Result<()> {
        let db = self.get_connection()?;
        let result = assignment::Entity::delete_by_id(assignment_id)
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Assignment not found").into());
        }
        Ok(())
    }

    pub async fn find_submissions(&self, assignment_id: Uuid) -> Result<Vec<submission::Model>> {
        let db = self.get_connection()?;
        let submissions = submission::Entity::find()
            .filter(submission::Column::AssignmentId.eq(assignment_id))
            .order_by_asc(submission::Column::SubmittedAt)
            .all(db)
            .await?;
        Ok(submissions)
    }

    pub async fn find_submission(&self, submission_id: Uuid) -> Result<Option<submission::Model>> {
        let db = self.get_connection()?;
        Ok(submission::Entity::find_by_id(submission_id).one(db).await?)
    }

    pub async fn find_submissions_of_student(
        &self,
        student_id: Uuid,
        assignment_ids: Vec<Uuid>,
    ) -> Result<Vec<submission::Model>> {
        if assignment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let db = self.get_connection()?;
        let submissions = submission::Entity::find()
            .filter(submission::Column::StudentId.eq(student_id))
            .filter(submission::Column::AssignmentId.is_in(assignment_ids))
            .all(db)
            .await?;
        Ok(submissions)
    }

    /// Stores a student's submission. Resubmitting replaces the content until the
    /// submission has been graded.
    pub async fn submit(
        &self,
        assignment_id: Uuid,
        student_id: Uuid,
        content: String,
    ) -> Result<submission::Model> {
        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();

        let existing = submission::Entity::find()
            .filter(submission::Column::AssignmentId.eq(assignment_id))
            .filter(submission::Column::StudentId.eq(student_id))
            .one(db)
            .await?;

        let saved = match existing {
            Some(existing) if existing.marks.is_some() => {
                return Err(AppError::conflict("Submission has already been graded").into());
            }
            Some(existing) => {
                let mut active_model: submission::ActiveModel = existing.into();
                active_model.content = Set(content);
                active_model.submitted_at = Set(now);
                active_model.update(db).await?
            }
            None => {
                submission::ActiveModel {
                    submission_id: Set(Uuid::new_v4()),
                    assignment_id: Set(assignment_id),
                    student_id: Set(student_id),
                    content: Set(content),
                    submitted_at: Set(now),
                    marks: Set(None),
                    feedback: Set(None),
                }
                .insert(db)
                .await?
            }
        };
        Ok(saved)
    }

    pub async fn grade_submission(
        &self,
        submission_id: Uuid,
        marks: i32,
        feedback: Option<String>,
    ) -> Result<submission::Model> {
        let submission = self
            .find_submission(submission_id)
            .await?
            .ok_or_else(|| AppError::not_found("Submission not found"))?;
        let db = self.get_connection()?;

        let mut active_model: submission::ActiveModel = submission.into();
        active_model.marks = Set(Some(marks));
        active_model.feedback = Set(feedback);
        Ok(active_model.update(db).await?)
    }
}

fn scoped(scope: &Scope, subject_id: Option<Uuid>) -> Select<assignment::Entity> {
    let mut query = assignment::Entity::find();

    if let Some(department_id) = scope.department_filter() {
        query = query.filter(
            assignment::Column::SubjectId.in_subquery(subjects_of_department(department_id)),
        );
    }
    if let Some(faculty_id) = scope.faculty_filter() {
        query =
            query.filter(assignment::Column::SubjectId.in_subquery(subjects_of_faculty(faculty_id)));
    }
    if let Some(subject_id) = subject_id {
        query = query.filter(assignment::Column::SubjectId.eq(subject_id));
    }
    query
}

/// `max(marks)` over the graded submissions of an assignment.
fn highest_awarded_marks(assignment_id: Uuid) -> Select<submission::Entity> {
    submission::Entity::find()
        .select_only()
        .column_as(submission::Column::Marks.max(), "marks")
        .filter(submission::Column::AssignmentId.eq(assignment_id))
        .filter(submission::Column::Marks.is_not_null())
}

/// Graded submissions must stay within `0..=max_marks`.
fn ensure_covers_awarded(max_marks: i32, awarded: Option<i32>) -> Result<(), AppError> {
    match awarded {
        Some(highest) if highest > max_marks => Err(AppError::conflict(format!(
            "max_marks cannot be lower than marks already awarded ({})",
            highest
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_max_marks_must_cover_awarded_marks() {
        assert!(ensure_covers_awarded(5, None).is_ok());
        assert!(ensure_covers_awarded(50, Some(50)).is_ok());
        assert!(ensure_covers_awarded(100, Some(42)).is_ok());
        assert!(matches!(
            ensure_covers_awarded(5, Some(42)),
            Err(AppError::Conflict(message)) if message.contains("42")
        ));
    }

    #[test]
    fn test_highest_awarded_marks_query() {
        let assignment_id = Uuid::new_v4();
        let sql = highest_awarded_marks(assignment_id)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.starts_with(r#"SELECT MAX("submission"."marks") AS "marks" FROM "submission""#));
        assert!(sql.contains(&format!(r#""submission"."assignment_id" = '{}'"#, assignment_id)));
        assert!(sql.contains(r#""submission"."marks" IS NOT NULL"#));
    }

    #[test]
    fn test_faculty_assignments_limited_to_own_subjects() {
        let user_id = Uuid::new_v4();
        let department_id = Uuid::new_v4();
        let sql = scoped(&Scope::Faculty { user_id, department_id: Some(department_id) }, None)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""assignment"."subject_id" IN (SELECT "subject"."subject_id" FROM "subject""#));
        assert!(sql.contains(&format!(r#""subject"."faculty_id" = '{}'"#, user_id)));
    }

    #[test]
    fn test_hod_assignments_limited_to_department_subjects() {
        let department_id = Uuid::new_v4();
        let sql = scoped(&Scope::Department(department_id), None)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(&format!(r#""subject"."department_id" = '{}'"#, department_id)));
        assert!(!sql.contains("faculty_id"));
    }
}
