use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{batch, department, user};
use crate::repositories::{BatchRepository, DepartmentRepository, UserRepository};
use crate::services::provisioning::{NewEnrollment, NewLocalUser, UserDirectory};

/// `UserDirectory` backed by the database repositories.
pub struct DatabaseDirectory {
    users: UserRepository,
    departments: DepartmentRepository,
    batches: BatchRepository,
}

impl DatabaseDirectory {
    pub fn new() -> Self {
        Self {
            users: UserRepository::new(),
            departments: DepartmentRepository::new(),
            batches: BatchRepository::new(),
        }
    }
}

#[async_trait]
impl UserDirectory for DatabaseDirectory {
    async fn email_taken(&self, email: &str) -> anyhow::Result<bool> {
        Ok(self.users.find_by_email(email).await?.is_some())
    }

    async fn department_by_id(
        &self,
        department_id: Uuid,
    ) -> anyhow::Result<Option<department::Model>> {
        self.departments.find_by_id(department_id).await
    }

    async fn department_by_name(&self, name: &str) -> anyhow::Result<Option<department::Model>> {
        self.departments.find_by_name(name).await
    }

    async fn batch_by_id(&self, batch_id: Uuid) -> anyhow::Result<Option<batch::Model>> {
        self.batches.find_by_id(batch_id).await
    }

    async fn batches_by_name(
        &self,
        department_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Vec<batch::Model>> {
        self.batches.find_by_name(department_id, name).await
    }

    async fn create_user(
        &self,
        user: NewLocalUser,
        enrollment: Option<NewEnrollment>,
    ) -> anyhow::Result<user::Model> {
        self.users.create_with_enrollment(user, enrollment).await
    }
}
