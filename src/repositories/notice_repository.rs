use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::notice;
use crate::entities::sea_orm_active_enums::{NoticeAudience, RoleEnum};
use crate::entities::user;
use crate::error::AppError;
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct NoticeRepository;

pub struct NewNotice {
    pub title: String,
    pub content: String,
    pub audience: NoticeAudience,
    pub department_id: Option<Uuid>,
    pub author_id: Uuid,
}

#[derive(Debug, Default)]
pub struct NoticeUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub audience: Option<NoticeAudience>,
    /// `Some(None)` makes the notice institution-wide.
    pub department_id: Option<Option<Uuid>>,
}

/// Notices a user may read: institution-wide ones plus those of their department, limited
/// to the audiences that include their role.
fn visibility(viewer: &user::Model) -> Condition {
    let department = match viewer.department_id {
        Some(department_id) => Condition::any()
            .add(notice::Column::DepartmentId.is_null())
            .add(notice::Column::DepartmentId.eq(department_id)),
        None => Condition::all().add(notice::Column::DepartmentId.is_null()),
    };

    match viewer.role {
        RoleEnum::Principal => Condition::all(),
        RoleEnum::Hod => department,
        RoleEnum::Faculty => Condition::all()
            .add(department)
            .add(audience_includes(NoticeAudience::Faculty)),
        RoleEnum::Student => Condition::all()
            .add(department)
            .add(audience_includes(NoticeAudience::Students)),
    }
}

fn audience_includes(audience: NoticeAudience) -> Condition {
    Condition::any()
        .add(notice::Column::Audience.eq(NoticeAudience::All))
        .add(notice::Column::Audience.eq(audience))
}

impl NoticeRepository {
    pub fn new() -> Self {
        Self
    }

    fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_by_id(&self, notice_id: Uuid) -> Result<Option<notice::Model>> {
        let db = self.get_connection()?;
        Ok(notice::Entity::find_by_id(notice_id).one(db).await?)
    }

    pub async fn find_visible(
        &self,
        viewer: &user::Model,
        page: PageRequest,
    ) -> Result<(Vec<notice::Model>, u64)> {
        let db = self.get_connection()?;
        let query = notice::Entity::find().filter(visibility(viewer));

        let total = query.clone().count(db).await?;
        let notices = query
            .order_by_desc(notice::Column::CreatedAt)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;
        Ok((notices, total))
    }

    /// Notices owned by a department, or every notice when `department_id` is `None`.
    pub async fn find_all_with_pagination(
        &self,
        department_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<(Vec<notice::Model>, u64)> {
        let db = self.get_connection()?;
        let mut query = notice::Entity::find();
        if let Some(department_id) = department_id {
            query = query.filter(notice::Column::DepartmentId.eq(department_id));
        }

        let total = query.clone().count(db).await?;
        let notices = query
            .order_by_desc(notice::Column::CreatedAt)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;
        Ok((notices, total))
    }

    pub async fn create(&self, new_notice: NewNotice) -> Result<notice::Model> {
        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let model = notice::ActiveModel {
            notice_id: Set(Uuid::new_v4()),
            title: Set(new_notice.title),
            content: Set(new_notice.content),
            audience: Set(new_notice.audience),
            department_id: Set(new_notice.department_id),
            author_id: Set(new_notice.author_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(db).await?)
    }

    pub async fn update(&self, notice_id: Uuid, updates: NoticeUpdate) -> Result<notice::Model> {
        let notice = self
            .find_by_id(notice_id)
            .await?
            .ok_or_else(|| AppError::not_found("Notice not found"))?;
        let db = self.get_connection()?;

        let mut active_model: notice::ActiveModel = notice.into();
        if let Some(title) = updates.title {
            active_model.title = Set(title);
        }
        if let Some(content) = updates.content {
            active_model.content = Set(content);
        }
        if let Some(audience) = updates.audience {
            active_model.audience = Set(audience);
        }
        if let Some(department_id) = updates.department_id {
            active_model.department_id = Set(department_id);
        }
        active_model.updated_at = Set(Utc::now().naive_utc());

        Ok(active_model.update(db).await?)
    }

    pub async fn delete(&self, notice_id: Uuid) -> Result<()> {
        let db = self.get_connection()?;
        let result = notice::Entity::delete_by_id(notice_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Notice not found").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn viewer(role: RoleEnum, department_id: Option<Uuid>) -> user::Model {
        let now = Utc::now().naive_utc();
        user::Model {
            user_id: Uuid::new_v4(),
            firebase_uid: "uid".to_string(),
            email: "viewer@uni.edu".to_string(),
            name: "Viewer".to_string(),
            role,
            department_id,
            phone: None,
            roll_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn visible_sql(viewer: &user::Model) -> String {
        notice::Entity::find()
            .filter(visibility(viewer))
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_student_sees_own_department_and_student_notices() {
        let department_id = Uuid::new_v4();
        let sql = visible_sql(&viewer(RoleEnum::Student, Some(department_id)));
        assert!(sql.contains(r#""notice"."department_id" IS NULL"#));
        assert!(sql.contains(&format!(r#""notice"."department_id" = '{}'"#, department_id)));
        assert!(sql.contains("'all'"));
        assert!(sql.contains("'students'"));
        assert!(!sql.contains("'faculty'"));
    }

    #[test]
    fn test_faculty_sees_faculty_notices() {
        let department_id = Uuid::new_v4();
        let sql = visible_sql(&viewer(RoleEnum::Faculty, Some(department_id)));
        assert!(sql.contains(&format!(r#""notice"."department_id" = '{}'"#, department_id)));
        assert!(sql.contains("'faculty'"));
        assert!(!sql.contains("'students'"));
    }

    #[test]
    fn test_hod_sees_every_audience_of_department() {
        let department_id = Uuid::new_v4();
        let sql = visible_sql(&viewer(RoleEnum::Hod, Some(department_id)));
        assert!(sql.contains(&format!(r#""notice"."department_id" = '{}'"#, department_id)));
        assert!(!sql.contains(r#""notice"."audience""#));
    }

    #[test]
    fn test_viewer_without_department_sees_only_institution_notices() {
        let sql = visible_sql(&viewer(RoleEnum::Student, None));
        assert!(sql.contains(r#""notice"."department_id" IS NULL"#));
        assert!(!sql.contains(r#""notice"."department_id" = "#));
    }

    #[test]
    fn test_principal_sees_everything() {
        let sql = visible_sql(&viewer(RoleEnum::Principal, None));
        assert!(!sql.contains("department_id"));
        assert!(!sql.contains("audience"));
    }
}
