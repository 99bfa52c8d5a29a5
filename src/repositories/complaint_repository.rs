use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use crate::entities::complaint;
use crate::entities::sea_orm_active_enums::ComplaintStatus;
use crate::error::AppError;
use crate::middleware::permission::Scope;
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct ComplaintRepository;

impl ComplaintRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_by_id(&self, complaint_id: Uuid) -> Result<Option<complaint::Model>> {
        let db = self.get_connection()?;
        Ok(complaint::Entity::find_by_id(complaint_id).one(db).await?)
    }

    pub async fn find_all_with_pagination(
        &self,
        scope: &Scope,
        status: Option<ComplaintStatus>,
        page: PageRequest,
    ) -> Result<(Vec<complaint::Model>, u64)> {
        let db = self.get_connection()?;
        let query = scoped(scope, status);

        let total = query.clone().count(db).await?;
        let complaints = query
            .order_by_desc(complaint::Column::CreatedAt)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;
        Ok((complaints, total))
    }

    pub async fn create(
        &self,
        student_id: Uuid,
        department_id: Option<Uuid>,
        subject: String,
        description: String,
    ) -> Result<complaint::Model> {
        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let model = complaint::ActiveModel {
            complaint_id: Set(Uuid::new_v4()),
            student_id: Set(student_id),
            department_id: Set(department_id),
            subject: Set(subject),
            description: Set(description),
            status: Set(ComplaintStatus::Pending),
            response: Set(None),
            resolved_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(db).await?)
    }

    /// Closes a pending complaint; resolved and rejected complaints are final.
    pub async fn resolve(
        &self,
        complaint: complaint::Model,
        status: ComplaintStatus,
        response: Option<String>,
        resolved_by: Uuid,
    ) -> Result<complaint::Model> {
        if status == ComplaintStatus::Pending {
            return Err(AppError::bad_request("A complaint can only be resolved or rejected").into());
        }
        if complaint.status != ComplaintStatus::Pending {
            return Err(AppError::conflict("Complaint has already been closed").into());
        }

        let db = self.get_connection()?;
        let mut active_model: complaint::ActiveModel = complaint.into();
        active_model.status = Set(status);
        active_model.response = Set(response);
        active_model.resolved_by = Set(Some(resolved_by));
        active_model.updated_at = Set(Utc::now().naive_utc());
        Ok(active_model.update(db).await?)
    }

    pub async fn count_pending(&self, department_id: Option<Uuid>) -> Result<u64> {
        let db = self.get_connection()?;
        let mut query =
            complaint::Entity::find().filter(complaint::Column::Status.eq(ComplaintStatus::Pending));
        if let Some(department_id) = department_id {
            query = query.filter(complaint::Column::DepartmentId.eq(department_id));
        }
        Ok(query.count(db).await?)
    }
}

fn scoped(scope: &Scope, status: Option<ComplaintStatus>) -> Select<complaint::Entity> {
    let mut query = complaint::Entity::find();

    if let Some(department_id) = scope.department_filter() {
        query = query.filter(complaint::Column::DepartmentId.eq(department_id));
    }
    if let Some(student_id) = scope.student_filter() {
        query = query.filter(complaint::Column::StudentId.eq(student_id));
    }
    if let Some(status) = status {
        query = query.filter(complaint::Column::Status.eq(status));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_hod_complaints_limited_to_department() {
        let department_id = Uuid::new_v4();
        let sql = scoped(&Scope::Department(department_id), Some(ComplaintStatus::Pending))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(&format!(r#""complaint"."department_id" = '{}'"#, department_id)));
        assert!(sql.contains("'pending'"));
    }

    #[test]
    fn test_student_complaints_limited_to_self() {
        let student_id = Uuid::new_v4();
        let sql = scoped(&Scope::Own(student_id), None)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(&format!(r#""complaint"."student_id" = '{}'"#, student_id)));
        assert!(!sql.contains("department_id"));
    }
}
