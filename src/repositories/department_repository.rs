use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{batch, department, subject, user};
use crate::error::AppError;
use crate::repositories::scoping::eq_ignore_case;
use crate::static_service::database;

pub struct DepartmentRepository;

pub struct DepartmentUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` removes the HOD.
    pub hod_id: Option<Option<Uuid>>,
}

impl DepartmentRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_all(&self) -> Result<Vec<department::Model>> {
        let db = self.get_connection()?;
        let departments = department::Entity::find()
            .order_by_asc(department::Column::Name)
            .all(db)
            .await?;
        Ok(departments)
    }

    pub async fn find_by_id(&self, department_id: Uuid) -> Result<Option<department::Model>> {
        let db = self.get_connection()?;
        let department = department::Entity::find_by_id(department_id).one(db).await?;
        Ok(department)
    }

    /// Matches the name or the code, ignoring case.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<department::Model>> {
        let db = self.get_connection()?;
        let department = department::Entity::find()
            .filter(
                Condition::any()
                    .add(eq_ignore_case(department::Column::Name, name))
                    .add(eq_ignore_case(department::Column::Code, name)),
            )
            .one(db)
            .await?;
        Ok(department)
    }

    pub async fn create(
        &self,
        name: String,
        code: String,
        description: Option<String>,
    ) -> Result<department::Model> {
        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let department_model = department::ActiveModel {
            department_id: Set(Uuid::new_v4()),
            name: Set(name),
            code: Set(code),
            description: Set(description),
            hod_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = department_model.insert(db).await?;
        Ok(result)
    }

    pub async fn update(
        &self,
        department_id: Uuid,
        updates: DepartmentUpdate,
    ) -> Result<department::Model> {
        let department = self
            .find_by_id(department_id)
            .await?
            .ok_or_else(|| AppError::not_found("Department not found"))?;
        let db = self.get_connection()?;

        let mut active_model: department::ActiveModel = department.into();

        if let Some(name) = updates.name {
            active_model.name = Set(name);
        }
        if let Some(code) = updates.code {
            active_model.code = Set(code);
        }
        if let Some(description) = updates.description {
            active_model.description = Set(Some(description).filter(|d| !d.is_empty()));
        }
        if let Some(hod_id) = updates.hod_id {
            active_model.hod_id = Set(hod_id);
        }

        active_model.updated_at = Set(Utc::now().naive_utc());

        let result = active_model.update(db).await?;
        Ok(result)
    }

    /// Deletes an unused department; users, batches or subjects still referencing it block
    /// the delete with a conflict.
    pub async fn delete(&self, department_id: Uuid) -> Result<()> {
        let db = self.get_connection()?;

        let users = user::Entity::find()
            .filter(user::Column::DepartmentId.eq(department_id))
            .count(db)
            .await?;
        let batches = batch::Entity::find()
            .filter(batch::Column::DepartmentId.eq(department_id))
            .count(db)
            .await?;
        let subjects = subject::Entity::find()
            .filter(subject::Column::DepartmentId.eq(department_id))
            .count(db)
            .await?;
        if users + batches + subjects > 0 {
            return Err(AppError::conflict(format!(
                "Department is still in use by {} users, {} batches and {} subjects",
                users, batches, subjects
            ))
            .into());
        }

        let result = department::Entity::delete_by_id(department_id)
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Department not found").into());
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        let db = self.get_connection()?;
        Ok(department::Entity::find().count(db).await?)
    }
}
