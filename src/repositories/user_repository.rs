use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::entities::{department, enrollment, subject, user};
use crate::error::AppError;
use crate::middleware::permission::Scope;
use crate::repositories::scoping::{contains_ignore_case, students_of_batch};
use crate::services::provisioning::{NewEnrollment, NewLocalUser};
use crate::static_service::database;
use crate::utils::pagination::PageRequest;

pub struct UserRepository;

#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub role: Option<RoleEnum>,
    pub department_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub role: Option<RoleEnum>,
    pub department_id: Option<Uuid>,
    /// `Some("")` clears the phone number.
    pub phone: Option<String>,
    /// `Some("")` clears the roll number.
    pub roll_number: Option<String>,
}

impl UserRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn get_connection(&self) -> Result<&'static DatabaseConnection> {
        database()
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<user::Model>> {
        let db = self.get_connection()?;
        let user = user::Entity::find_by_id(user_id).one(db).await?;
        Ok(user)
    }

    pub async fn find_by_firebase_uid(&self, firebase_uid: &str) -> Result<Option<user::Model>> {
        let db = self.get_connection()?;
        let user = user::Entity::find()
            .filter(user::Column::FirebaseUid.eq(firebase_uid))
            .one(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        let db = self.get_connection()?;
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(db)
            .await?;
        Ok(user)
    }

    pub async fn find_principal(&self) -> Result<Option<user::Model>> {
        let db = self.get_connection()?;
        let principal = user::Entity::find()
            .filter(user::Column::Role.eq(RoleEnum::Principal))
            .one(db)
            .await?;
        Ok(principal)
    }

    pub async fn find_all_with_pagination(
        &self,
        scope: &Scope,
        filter: UserFilter,
        page: PageRequest,
    ) -> Result<(Vec<user::Model>, u64)> {
        let db = self.get_connection()?;
        let query = scoped(scope, filter);

        let total = query.clone().count(db).await?;

        let users = query
            .order_by_asc(user::Column::Name)
            .limit(page.page_size)
            .offset(page.offset())
            .all(db)
            .await?;

        Ok((users, total))
    }

    /// The students a subject is taught to.
    pub async fn find_roster(&self, subject: &subject::Model) -> Result<Vec<user::Model>> {
        let db = self.get_connection()?;
        Ok(roster(subject).all(db).await?)
    }

    /// Inserts the user and the optional enrollment in one transaction.
    pub async fn create_with_enrollment(
        &self,
        new_user: NewLocalUser,
        new_enrollment: Option<NewEnrollment>,
    ) -> Result<user::Model> {
        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let txn = db.begin().await?;

        let user_model = user::ActiveModel {
            user_id: Set(Uuid::new_v4()),
            firebase_uid: Set(new_user.firebase_uid),
            email: Set(new_user.email),
            name: Set(new_user.name),
            role: Set(new_user.role),
            department_id: Set(new_user.department_id),
            phone: Set(new_user.phone),
            roll_number: Set(new_user.roll_number),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = user_model.insert(&txn).await?;

        if let Some(new_enrollment) = new_enrollment {
            enrollment::ActiveModel {
                enrollment_id: Set(Uuid::new_v4()),
                student_id: Set(created.user_id),
                batch_id: Set(new_enrollment.batch_id),
                academic_year: Set(new_enrollment.academic_year),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(created)
    }

    /// Applies the update; when an HOD loses the role or leaves the department, every
    /// department pointing at them is cleared in the same transaction.
    pub async fn update(&self, user_id: Uuid, updates: UserUpdate) -> Result<user::Model> {
        let db = self.get_connection()?;
        let txn = db.begin().await?;

        let before = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let was_hod = before.role == RoleEnum::Hod;
        let previous_department = before.department_id;

        let mut active_user: user::ActiveModel = before.into();
        if let Some(name) = updates.name {
            active_user.name = Set(name);
        }
        if let Some(role) = updates.role {
            active_user.role = Set(role);
        }
        if let Some(department_id) = updates.department_id {
            active_user.department_id = Set(Some(department_id));
        }
        if let Some(phone) = updates.phone {
            active_user.phone = Set(Some(phone).filter(|p| !p.is_empty()));
        }
        if let Some(roll_number) = updates.roll_number {
            active_user.roll_number = Set(Some(roll_number).filter(|r| !r.is_empty()));
        }
        active_user.updated_at = Set(Utc::now().naive_utc());

        let updated = active_user.update(&txn).await?;

        if was_hod
            && (updated.role != RoleEnum::Hod || updated.department_id != previous_department)
        {
            let cleared = clear_hod_links(&txn, user_id).await?;
            tracing::info!(user_id = %user_id, cleared, "Cleared HOD assignment after role change");
        }

        txn.commit().await?;
        Ok(updated)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        phone: Option<String>,
    ) -> Result<user::Model> {
        self.update(
            user_id,
            UserUpdate {
                name,
                phone,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<()> {
        let db = self.get_connection()?;
        let txn = db.begin().await?;

        clear_hod_links(&txn, user_id).await?;
        let result = user::Entity::delete_by_id(user_id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("User not found").into());
        }

        txn.commit().await?;
        Ok(())
    }

    /// Swaps the principal role: `successor_id` becomes principal, `current` takes
    /// `former_role` in `former_department_id`.
    pub async fn transfer_principal(
        &self,
        current: &user::Model,
        successor_id: Uuid,
        former_role: RoleEnum,
        former_department_id: Option<Uuid>,
    ) -> Result<(user::Model, user::Model)> {
        let db = self.get_connection()?;
        let now = Utc::now().naive_utc();
        let txn = db.begin().await?;

        let successor = user::Entity::find_by_id(successor_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if successor.role == RoleEnum::Hod {
            clear_hod_links(&txn, successor.user_id).await?;
        }

        let mut former: user::ActiveModel = current.clone().into();
        former.role = Set(former_role);
        former.department_id = Set(former_department_id);
        former.updated_at = Set(now);
        let former = former.update(&txn).await?;

        let mut promoted: user::ActiveModel = successor.into();
        promoted.role = Set(RoleEnum::Principal);
        promoted.department_id = Set(None);
        promoted.updated_at = Set(now);
        let promoted = promoted.update(&txn).await?;

        let principals = user::Entity::find()
            .filter(user::Column::Role.eq(RoleEnum::Principal))
            .count(&txn)
            .await?;
        if principals != 1 {
            return Err(AppError::conflict("Principal transfer would break the single principal rule").into());
        }

        txn.commit().await?;
        tracing::info!(from = %former.user_id, to = %promoted.user_id, "Principal role transferred");
        Ok((former, promoted))
    }

    /// Number of users per role, optionally inside one department.
    pub async fn count_by_role(&self, department_id: Option<Uuid>) -> Result<Vec<(RoleEnum, i64)>> {
        let db = self.get_connection()?;
        let mut query = user::Entity::find()
            .select_only()
            .column(user::Column::Role)
            .column_as(user::Column::UserId.count(), "count")
            .group_by(user::Column::Role);
        if let Some(department_id) = department_id {
            query = query.filter(user::Column::DepartmentId.eq(department_id));
        }
        let counts = query.into_tuple::<(RoleEnum, i64)>().all(db).await?;
        Ok(counts)
    }
}

fn scoped(scope: &Scope, filter: UserFilter) -> Select<user::Entity> {
    let mut query = user::Entity::find();

    // HODs only ever see their own department
    if let Some(department_id) = scope.department_filter() {
        query = query.filter(user::Column::DepartmentId.eq(department_id));
    }

    if let Some(role) = filter.role {
        query = query.filter(user::Column::Role.eq(role));
    }

    if let Some(department_id) = filter.department_id {
        query = query.filter(user::Column::DepartmentId.eq(department_id));
    }

    if let Some(search_term) = filter.search.filter(|s| !s.trim().is_empty()) {
        query = query.filter(
            Condition::any()
                .add(contains_ignore_case(user::Column::Name, &search_term))
                .add(contains_ignore_case(user::Column::Email, &search_term))
                .add(contains_ignore_case(user::Column::RollNumber, &search_term)),
        );
    }

    query
}

/// Students enrolled in the subject's batch, or every student of its department when the
/// subject has no batch.
fn roster(subject: &subject::Model) -> Select<user::Entity> {
    let query = user::Entity::find().filter(user::Column::Role.eq(RoleEnum::Student));
    let query = match subject.batch_id {
        Some(batch_id) => query.filter(user::Column::UserId.in_subquery(students_of_batch(batch_id))),
        None => query.filter(user::Column::DepartmentId.eq(subject.department_id)),
    };
    query
        .order_by_asc(user::Column::RollNumber)
        .order_by_asc(user::Column::Name)
}

/// Clears `hod_id` on every department led by `user_id`.
async fn clear_hod_links<C>(conn: &C, user_id: Uuid) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = department::Entity::update_many()
        .col_expr(department::Column::HodId, Expr::value(Option::<Uuid>::None))
        .col_expr(department::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(department::Column::HodId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn subject_of(department_id: Uuid, batch_id: Option<Uuid>) -> subject::Model {
        let now = Utc::now().naive_utc();
        subject::Model {
            subject_id: Uuid::new_v4(),
            name: "Compilers".to_string(),
            code: "CS401".to_string(),
            credits: 4,
            semester: 7,
            department_id,
            faculty_id: Some(Uuid::new_v4()),
            batch_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_batchless_roster_is_department_students() {
        let department_id = Uuid::new_v4();
        let sql = roster(&subject_of(department_id, None))
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains(&format!(r#""user"."department_id" = '{}'"#, department_id)));
        assert!(sql.contains("'student'"));
        assert!(!sql.contains("enrollment"));
    }

    #[test]
    fn test_batch_roster_is_enrolled_students() {
        let department_id = Uuid::new_v4();
        let batch_id = Uuid::new_v4();
        let sql = roster(&subject_of(department_id, Some(batch_id)))
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""user"."user_id" IN (SELECT "enrollment"."student_id" FROM "enrollment""#));
        assert!(sql.contains(&batch_id.to_string()));
        assert!(sql.contains("'student'"));
        assert!(!sql.contains(&department_id.to_string()));
    }

    #[test]
    fn test_hod_user_list_stays_in_department() {
        let department_id = Uuid::new_v4();
        let sql = scoped(&Scope::Department(department_id), UserFilter::default())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(&format!(r#""user"."department_id" = '{}'"#, department_id)));

        let sql = scoped(&Scope::Institution, UserFilter::default())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn test_user_search_matches_name_email_or_roll_number() {
        let filter = UserFilter {
            search: Some(" Ada ".to_string()),
            ..Default::default()
        };
        let sql = scoped(&Scope::Institution, filter)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#"LOWER("name") LIKE '%ada%'"#));
        assert!(sql.contains(r#"LOWER("email") LIKE '%ada%'"#));
        assert!(sql.contains(" OR "));
    }
}
