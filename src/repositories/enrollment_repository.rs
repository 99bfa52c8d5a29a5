use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use crate::entities::enrollment;
use crate::error::AppError;
use crate::middleware::permission::Scope;
use crate::repositories::scoping::batches_of_department;
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct EnrollmentRepository;

#[derive(Debug, Default, Clone)]
pub struct EnrollmentFilter {
    pub batch_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub academic_year: Option<String>,
}

impl EnrollmentRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_by_id(&self, enrollment_id: Uuid) -> Result<Option<enrollment::Model>> {
        let db = self.get_connection()?;
        Ok(enrollment::Entity::find_by_id(enrollment_id).one(db).await?)
    }

    pub async fn find_all_with_pagination(
        &self,
        scope: &Scope,
        filter: EnrollmentFilter,
        page: PageRequest,
    ) -> Result<(Vec<enrollment::Model>, u64)> {
        let db = self.get_connection()?;
        let query = scoped(scope, filter);

        let total = query.clone().count(db).await?;
        let enrollments = query
            .order_by_desc(enrollment::Column::CreatedAt)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;

        Ok((enrollments, total))
    }

    /// The batch a student is enrolled in for `academic_year`, if any.
    pub async fn find_for_student(
        &self,
        student_id: Uuid,
        academic_year: &str,
    ) -> Result<Option<enrollment::Model>> {
        let db = self.get_connection()?;
        let enrollment = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::AcademicYear.eq(academic_year))
            .one(db)
            .await?;
        Ok(enrollment)
    }

    pub async fn create(
        &self,
        student_id: Uuid,
        batch_id: Uuid,
        academic_year: String,
    ) -> Result<enrollment::Model> {
        let db = self.get_connection()?;
        let model = enrollment::ActiveModel {
            enrollment_id: Set(Uuid::new_v4()),
            student_id: Set(student_id),
            batch_id: Set(batch_id),
            academic_year: Set(academic_year),
            created_at: Set(Utc::now().naive_utc()),
        };
        Ok(model.insert(db).await?)
    }

    pub async fn delete(&self, enrollment_id: Uuid) -> Result<()> {
        let db = self.get_connection()?;
        let result = enrollment::Entity::delete_by_id(enrollment_id)
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Enrollment not found").into());
        }
        Ok(())
    }
}

fn scoped(scope: &Scope, filter: EnrollmentFilter) -> Select<enrollment::Entity> {
    let mut query = enrollment::Entity::find();

    if let Some(department_id) = scope.department_filter() {
        query =
            query.filter(enrollment::Column::BatchId.in_subquery(batches_of_department(department_id)));
    }
    if let Some(student_id) = scope.student_filter() {
        query = query.filter(enrollment::Column::StudentId.eq(student_id));
    }
    if let Some(batch_id) = filter.batch_id {
        query = query.filter(enrollment::Column::BatchId.eq(batch_id));
    }
    if let Some(student_id) = filter.student_id {
        query = query.filter(enrollment::Column::StudentId.eq(student_id));
    }
    if let Some(academic_year) = filter.academic_year {
        query = query.filter(enrollment::Column::AcademicYear.eq(academic_year));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_hod_enrollments_limited_to_department_batches() {
        let department_id = Uuid::new_v4();
        let filter = EnrollmentFilter {
            academic_year: Some("2025-2026".to_string()),
            ..Default::default()
        };
        let sql = scoped(&Scope::Department(department_id), filter)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""enrollment"."batch_id" IN (SELECT "batch"."batch_id" FROM "batch""#));
        assert!(sql.contains(&format!(r#""batch"."department_id" = '{}'"#, department_id)));
        assert!(sql.contains(r#""enrollment"."academic_year" = '2025-2026'"#));
    }
}
