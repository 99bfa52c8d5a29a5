use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use crate::entities::batch;
use crate::error::AppError;
use crate::middleware::permission::Scope;
use crate::repositories::scoping::eq_ignore_case;
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct BatchRepository;

#[derive(Debug, Default, Clone)]
pub struct BatchFilter {
    pub department_id: Option<Uuid>,
    pub academic_year: Option<String>,
}

pub struct NewBatch {
    pub name: String,
    pub department_id: Uuid,
    pub year: i32,
    pub semester: i32,
    pub academic_year: String,
}

#[derive(Debug, Default)]
pub struct BatchUpdate {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<i32>,
    pub academic_year: Option<String>,
}

impl BatchRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_by_id(&self, batch_id: Uuid) -> Result<Option<batch::Model>> {
        let db = self.get_connection()?;
        Ok(batch::Entity::find_by_id(batch_id).one(db).await?)
    }

    pub async fn find_by_name(&self, department_id: Uuid, name: &str) -> Result<Vec<batch::Model>> {
        let db = self.get_connection()?;
        let batches = batch::Entity::find()
            .filter(batch::Column::DepartmentId.eq(department_id))
            .filter(eq_ignore_case(batch::Column::Name, name))
            .order_by_desc(batch::Column::AcademicYear)
            .all(db)
            .await?;
        Ok(batches)
    }

    pub async fn find_all_with_pagination(
        &self,
        scope: &Scope,
        filter: BatchFilter,
        page: PageRequest,
    ) -> Result<(Vec<batch::Model>, u64)> {
        let db = self.get_connection()?;
        let query = scoped(scope, filter);

        let total = query.clone().count(db).await?;
        let batches = query
            .order_by_desc(batch::Column::AcademicYear)
            .order_by_asc(batch::Column::Name)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;

        Ok((batches, total))
    }

    pub async fn create(&self, new_batch: NewBatch) -> Result<batch::Model> {
        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let model = batch::ActiveModel {
            batch_id: Set(Uuid::new_v4()),
            name: Set(new_batch.name),
            department_id: Set(new_batch.department_id),
            year: Set(new_batch.year),
            semester: Set(new_batch.semester),
            academic_year: Set(new_batch.academic_year),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(db).await?)
    }

    pub async fn update(&self, batch_id: Uuid, updates: BatchUpdate) -> Result<batch::Model> {
        let batch = self
            .find_by_id(batch_id)
            .await?
            .ok_or_else(|| AppError::not_found("Batch not found"))?;
        let db = self.get_connection()?;

        let mut active_model: batch::ActiveModel = batch.into();
        if let Some(name) = updates.name {
            active_model.name = Set(name);
        }
        if let Some(year) = updates.year {
            active_model.year = Set(year);
        }
        if let Some(semester) = updates.semester {
            active_model.semester = Set(semester);
        }
        if let Some(academic_year) = updates.academic_year {
            active_model.academic_year = Set(academic_year);
        }
        active_model.updated_at = Set(Utc::now().naive_utc());

        Ok(active_model.update(db).await?)
    }

    pub async fn delete(&self, batch_id: Uuid) -> Result<()> {
        let db = self.get_connection()?;
        let result = batch::Entity::delete_by_id(batch_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Batch not found").into());
        }
        Ok(())
    }

    pub async fn count(&self, department_id: Option<Uuid>) -> Result<u64> {
        let db = self.get_connection()?;
        let mut query = batch::Entity::find();
        if let Some(department_id) = department_id {
            query = query.filter(batch::Column::DepartmentId.eq(department_id));
        }
        Ok(query.count(db).await?)
    }
}

fn scoped(scope: &Scope, filter: BatchFilter) -> Select<batch::Entity> {
    let mut query = batch::Entity::find();

    if let Some(department_id) = scope.department_filter() {
        query = query.filter(batch::Column::DepartmentId.eq(department_id));
    }
    if let Some(department_id) = filter.department_id {
        query = query.filter(batch::Column::DepartmentId.eq(department_id));
    }
    if let Some(academic_year) = filter.academic_year {
        query = query.filter(batch::Column::AcademicYear.eq(academic_year));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_hod_cannot_filter_into_other_department() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let filter = BatchFilter {
            department_id: Some(other),
            ..Default::default()
        };
        let sql = scoped(&Scope::Department(own), filter)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(&format!(r#""batch"."department_id" = '{}'"#, own)));
        assert!(sql.contains(&format!(
            r#""batch"."department_id" = '{}' AND "batch"."department_id" = '{}'"#,
            own, other
        )));
    }

    #[test]
    fn test_principal_batches_unscoped() {
        let sql = scoped(&Scope::Institution, BatchFilter::default())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(!sql.contains("WHERE"));
    }
}
