use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use crate::entities::subject;
use crate::error::AppError;
use crate::middleware::permission::Scope;
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct SubjectRepository;

#[derive(Debug, Default, Clone)]
pub struct SubjectFilter {
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub semester: Option<i32>,
}

pub struct NewSubject {
    pub name: String,
    pub code: String,
    pub credits: i32,
    pub semester: i32,
    pub department_id: Uuid,
    pub faculty_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
}

#[derive(Debug, Default)]
pub struct SubjectUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub credits: Option<i32>,
    pub semester: Option<i32>,
    /// `Some(None)` unassigns the faculty member.
    pub faculty_id: Option<Option<Uuid>>,
    /// `Some(None)` detaches the subject from its batch.
    pub batch_id: Option<Option<Uuid>>,
}

impl SubjectRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_by_id(&self, subject_id: Uuid) -> Result<Option<subject::Model>> {
        let db = self.get_connection()?;
        Ok(subject::Entity::find_by_id(subject_id).one(db).await?)
    }

    pub async fn find_by_ids(&self, subject_ids: Vec<Uuid>) -> Result<Vec<subject::Model>> {
        if subject_ids.is_empty() {
            return Ok(Vec::new());
        }
        let db = self.get_connection()?;
        let subjects = subject::Entity::find()
            .filter(subject::Column::SubjectId.is_in(subject_ids))
            .all(db)
            .await?;
        Ok(subjects)
    }

    pub async fn find_all_with_pagination(
        &self,
        scope: &Scope,
        filter: SubjectFilter,
        page: PageRequest,
    ) -> Result<(Vec<subject::Model>, u64)> {
        let db = self.get_connection()?;
        let query = scoped(scope, filter);

        let total = query.clone().count(db).await?;
        let subjects = query
            .order_by_asc(subject::Column::Code)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;

        Ok((subjects, total))
    }

    pub async fn find_by_batch(&self, batch_id: Uuid) -> Result<Vec<subject::Model>> {
        let db = self.get_connection()?;
        let subjects = subject::Entity::find()
            .filter(subject::Column::BatchId.eq(batch_id))
            .order_by_asc(subject::Column::Code)
            .all(db)
            .await?;
        Ok(subjects)
    }

    pub async fn create(&self, new_subject: NewSubject) -> Result<subject::Model> {
        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let model = subject::ActiveModel {
            subject_id: Set(Uuid::new_v4()),
            name: Set(new_subject.name),
            code: Set(new_subject.code),
            credits: Set(new_subject.credits),
            semester: Set(new_subject.semester),
            department_id: Set(new_subject.department_id),
            faculty_id: Set(new_subject.faculty_id),
            batch_id: Set(new_subject.batch_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(db).await?)
    }

    pub async fn update(&self, subject_id: Uuid, updates: SubjectUpdate) -> Result<subject::Model> {
        let subject = self
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| AppError::not_found("Subject not found"))?;
        let db = self.get_connection()?;

        let mut active_model: subject::ActiveModel = subject.into();
        if let Some(name) = updates.name {
            active_model.name = Set(name);
        }
        if let Some(code) = updates.code {
            active_model.code = Set(code);
        }
        if let Some(credits) = updates.credits {
            active_model.credits = Set(credits);
        }
        if let Some(semester) = updates.semester {
            active_model.semester = Set(semester);
        }
        if let Some(faculty_id) = updates.faculty_id {
            active_model.faculty_id = Set(faculty_id);
        }
        if let Some(batch_id) = updates.batch_id {
            active_model.batch_id = Set(batch_id);
        }
        active_model.updated_at = Set(Utc::now().naive_utc());

        Ok(active_model.update(db).await?)
    }

    pub async fn delete(&self, subject_id: Uuid) -> Result<()> {
        let db = self.get_connection()?;
        let result = subject::Entity::delete_by_id(subject_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Subject not found").into());
        }
        Ok(())
    }

    pub async fn count(&self, department_id: Option<Uuid>) -> Result<u64> {
        let db = self.get_connection()?;
        let mut query = subject::Entity::find();
        if let Some(department_id) = department_id {
            query = query.filter(subject::Column::DepartmentId.eq(department_id));
        }
        Ok(query.count(db).await?)
    }
}

fn scoped(scope: &Scope, filter: SubjectFilter) -> Select<subject::Entity> {
    let mut query = subject::Entity::find();

    if let Some(department_id) = scope.department_filter() {
        query = query.filter(subject::Column::DepartmentId.eq(department_id));
    }
    if let Some(faculty_id) = scope.faculty_filter() {
        query = query.filter(subject::Column::FacultyId.eq(faculty_id));
    }
    if let Some(department_id) = filter.department_id {
        query = query.filter(subject::Column::DepartmentId.eq(department_id));
    }
    if let Some(batch_id) = filter.batch_id {
        query = query.filter(subject::Column::BatchId.eq(batch_id));
    }
    if let Some(semester) = filter.semester {
        query = query.filter(subject::Column::Semester.eq(semester));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_hod_subjects_limited_to_department() {
        let department_id = Uuid::new_v4();
        let sql = scoped(&Scope::Department(department_id), SubjectFilter::default())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(&format!(r#""subject"."department_id" = '{}'"#, department_id)));
    }

    #[test]
    fn test_faculty_subjects_limited_to_assigned() {
        let user_id = Uuid::new_v4();
        let filter = SubjectFilter {
            semester: Some(3),
            ..Default::default()
        };
        let sql = scoped(
            &Scope::Faculty {
                user_id,
                department_id: Some(Uuid::new_v4()),
            },
            filter,
        )
        .build(DbBackend::Postgres)
        .to_string();
        assert!(sql.contains(&format!(r#""subject"."faculty_id" = '{}'"#, user_id)));
        assert!(sql.contains(r#""subject"."semester" = 3"#));
        assert!(!sql.contains(r#""subject"."department_id""#));
    }
}
