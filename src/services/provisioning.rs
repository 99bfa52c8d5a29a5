//! Account provisioning: identity-provider account first, then the local user (and the
//! student's enrollment) in one transaction. When the local write fails the provider
//! account is deleted again, so no credentials are left without a local record.
//!
//! Bulk runs process every row independently; a failed row is reported and the run goes on.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::TEMPORARY_PASSWORD_LENGTH;
use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::entities::{batch, department, user};
use crate::error::{AppError, AppResult, FieldError};
use crate::identity::{IdentityProvider, NewAccount};
use crate::middleware::permission::{HOD_MANAGED_ROLES, PRINCIPAL_MANAGED_ROLES};
use crate::services::user_rules;
use crate::utils::random::generate_random_string;
use crate::utils::validation::{
    FieldErrors, is_valid_academic_year, is_valid_email, normalize_optional,
};

const MIN_PASSWORD_LENGTH: usize = 6;

/// One account to create. Department and batch may be given by id or by name.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ProvisionRow {
    #[schema(example = "asha.rao@uni.edu")]
    pub email: String,
    #[schema(example = "Asha Rao")]
    pub name: String,
    #[schema(example = "STUDENT")]
    pub role: String,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    /// Department name or code, matched case-insensitively.
    #[serde(default)]
    #[schema(example = "Computer Science")]
    pub department: Option<String>,
    #[serde(default)]
    pub batch_id: Option<Uuid>,
    /// Batch name inside the resolved department, matched case-insensitively.
    #[serde(default)]
    #[schema(example = "CSE-2025-A")]
    pub batch: Option<String>,
    #[serde(default)]
    #[schema(example = "2025-2026")]
    pub academic_year: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
    /// Initial password; a temporary one is generated and returned when omitted.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLocalUser {
    pub firebase_uid: String,
    pub email: String,
    pub name: String,
    pub role: RoleEnum,
    pub department_id: Option<Uuid>,
    pub phone: Option<String>,
    pub roll_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrollment {
    pub batch_id: Uuid,
    pub academic_year: String,
}

/// Lookups and writes the provisioning pipeline needs from the database.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn email_taken(&self, email: &str) -> anyhow::Result<bool>;

    async fn department_by_id(&self, department_id: Uuid)
    -> anyhow::Result<Option<department::Model>>;

    async fn department_by_name(&self, name: &str) -> anyhow::Result<Option<department::Model>>;

    async fn batch_by_id(&self, batch_id: Uuid) -> anyhow::Result<Option<batch::Model>>;

    async fn batches_by_name(
        &self,
        department_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Vec<batch::Model>>;

    /// Inserts the user and, when given, the enrollment atomically.
    async fn create_user(
        &self,
        user: NewLocalUser,
        enrollment: Option<NewEnrollment>,
    ) -> anyhow::Result<user::Model>;
}

/// Which roles a caller may create and whether the department is fixed.
#[derive(Debug, Clone, Copy)]
pub struct ProvisionPolicy {
    pub allowed_roles: &'static [RoleEnum],
    pub forced_department: Option<Uuid>,
}

impl ProvisionPolicy {
    pub fn principal() -> Self {
        Self {
            allowed_roles: PRINCIPAL_MANAGED_ROLES,
            forced_department: None,
        }
    }

    pub fn hod(department_id: Uuid) -> Self {
        Self {
            allowed_roles: HOD_MANAGED_ROLES,
            forced_department: Some(department_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionedUser {
    pub user: user::Model,
    pub temporary_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProvisionSuccess {
    pub row: usize,
    pub email: String,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProvisionFailure {
    pub row: usize,
    pub email: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ProvisionReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub successes: Vec<ProvisionSuccess>,
    pub failures: Vec<ProvisionFailure>,
}

impl ProvisionReport {
    pub fn record_success(&mut self, row: usize, provisioned: &ProvisionedUser) {
        self.successes.push(ProvisionSuccess {
            row,
            email: provisioned.user.email.clone(),
            user_id: provisioned.user.user_id,
            temporary_password: provisioned.temporary_password.clone(),
        });
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, row: usize, email: impl Into<String>, error: impl Into<String>) {
        self.failures.push(ProvisionFailure {
            row,
            email: email.into(),
            error: error.into(),
        });
        self.total += 1;
        self.failed += 1;
    }
}

/// Flattens an error into a single line for the bulk report.
fn describe(err: &AppError) -> String {
    match err {
        AppError::Validation {
            message,
            details: Some(details),
        } => {
            let fields: Vec<String> = details
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .map(|item| {
                            format!(
                                "{} {}",
                                item["field"].as_str().unwrap_or_default(),
                                item["message"].as_str().unwrap_or_default()
                            )
                        })
                        .collect()
                })
                .unwrap_or_default();
            if fields.is_empty() {
                message.clone()
            } else {
                format!("{}: {}", message, fields.join(", "))
            }
        }
        AppError::Internal(_) => "Internal server error".to_string(),
        AppError::Upstream(_) => "Identity provider request failed".to_string(),
        other => other.to_string(),
    }
}

pub struct Provisioner {
    identity: Arc<dyn IdentityProvider>,
    directory: Arc<dyn UserDirectory>,
    policy: ProvisionPolicy,
}

impl Provisioner {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        directory: Arc<dyn UserDirectory>,
        policy: ProvisionPolicy,
    ) -> Self {
        Self {
            identity,
            directory,
            policy,
        }
    }

    /// Provisions every `(row number, row)` pair and reports each outcome.
    pub async fn provision_all(
        &self,
        rows: impl IntoIterator<Item = (usize, ProvisionRow)>,
        report: &mut ProvisionReport,
    ) {
        for (row_number, row) in rows {
            match self.provision(row.clone()).await {
                Ok(provisioned) => report.record_success(row_number, &provisioned),
                Err(err) => {
                    tracing::warn!(row = row_number, email = %row.email, "Provisioning failed: {}", err);
                    report.record_failure(row_number, row.email.trim(), describe(&err));
                }
            }
        }
    }

    pub async fn provision(&self, row: ProvisionRow) -> AppResult<ProvisionedUser> {
        let role = self.validate(&row)?;
        let email = row.email.trim().to_lowercase();

        if self.directory.email_taken(&email).await? {
            return Err(AppError::conflict(format!(
                "An account with email {} already exists",
                email
            )));
        }

        let department = self.resolve_department(&row).await?;
        let enrollment = self.resolve_enrollment(&row, role, department.department_id).await?;

        let (password, temporary_password) = match normalize_optional(row.password.clone()) {
            Some(password) => (password, None),
            None => {
                let generated = generate_random_string(TEMPORARY_PASSWORD_LENGTH);
                (generated.clone(), Some(generated))
            }
        };

        let name = row.name.trim().to_string();
        let uid = self
            .identity
            .create_account(&NewAccount {
                email: email.clone(),
                password,
                display_name: name.clone(),
            })
            .await?;

        let local = NewLocalUser {
            firebase_uid: uid.clone(),
            email: email.clone(),
            name,
            role,
            department_id: Some(department.department_id),
            phone: normalize_optional(row.phone.clone()),
            roll_number: normalize_optional(row.roll_number.clone()),
        };

        match self.directory.create_user(local, enrollment).await {
            Ok(user) => {
                tracing::info!(user_id = %user.user_id, email = %user.email, role = user.role.as_str(), "User provisioned");
                Ok(ProvisionedUser {
                    user,
                    temporary_password,
                })
            }
            Err(err) => {
                tracing::error!("Failed to create local user {}: {:?}", email, err);
                match self.identity.delete_account(&uid).await {
                    Ok(()) => tracing::info!("Rolled back identity account {} for {}", uid, email),
                    Err(rollback_err) => tracing::error!(
                        "Failed to roll back identity account {} for {}: {}",
                        uid,
                        email,
                        rollback_err
                    ),
                }
                Err(err.into())
            }
        }
    }

    fn validate(&self, row: &ProvisionRow) -> AppResult<RoleEnum> {
        let mut errors = FieldErrors::new();
        errors
            .required("name", &row.name)
            .check(is_valid_email(&row.email), "email", "must be a valid email");
        if let Some(password) = normalize_optional(row.password.clone()) {
            errors.check(
                password.len() >= MIN_PASSWORD_LENGTH,
                "password",
                "must be at least 6 characters",
            );
        }
        if let Some(year) = normalize_optional(row.academic_year.clone()) {
            errors.check(
                is_valid_academic_year(&year),
                "academic_year",
                "must look like 2024-2025",
            );
        }
        let role = RoleEnum::parse(&row.role);
        if role.is_none() {
            errors.push(
                "role",
                format!(
                    "unknown role '{}', expected PRINCIPAL, HOD, FACULTY or STUDENT",
                    row.role.trim()
                ),
            );
        }
        errors.into_result()?;

        let role = role.ok_or_else(|| AppError::bad_request("Unknown role"))?;
        user_rules::ensure_not_principal_role(role)?;
        if !self.policy.allowed_roles.contains(&role) {
            return Err(AppError::forbidden(format!(
                "You are not allowed to create {} accounts",
                role.as_str()
            )));
        }
        Ok(role)
    }

    async fn resolve_department(&self, row: &ProvisionRow) -> AppResult<department::Model> {
        if let Some(forced) = self.policy.forced_department {
            return self
                .directory
                .department_by_id(forced)
                .await?
                .ok_or_else(|| AppError::not_found("Department not found"));
        }

        if let Some(department_id) = row.department_id {
            return self
                .directory
                .department_by_id(department_id)
                .await?
                .ok_or_else(|| AppError::bad_request(format!("Unknown department: {}", department_id)));
        }

        match normalize_optional(row.department.clone()) {
            Some(name) => self
                .directory
                .department_by_name(&name)
                .await?
                .ok_or_else(|| AppError::bad_request(format!("Unknown department: {}", name))),
            None => Err(AppError::fields(
                "Validation failed",
                vec![FieldError {
                    field: "department".to_string(),
                    message: "is required".to_string(),
                }],
            )),
        }
    }

    async fn resolve_enrollment(
        &self,
        row: &ProvisionRow,
        role: RoleEnum,
        department_id: Uuid,
    ) -> AppResult<Option<NewEnrollment>> {
        let batch_name = normalize_optional(row.batch.clone());
        if row.batch_id.is_none() && batch_name.is_none() {
            return Ok(None);
        }
        if role != RoleEnum::Student {
            return Err(AppError::bad_request("Only students can be enrolled in a batch"));
        }
        let academic_year = normalize_optional(row.academic_year.clone());

        let batch = match (row.batch_id, batch_name) {
            (Some(batch_id), _) => self
                .directory
                .batch_by_id(batch_id)
                .await?
                .filter(|batch| batch.department_id == department_id)
                .ok_or_else(|| {
                    AppError::bad_request(format!("Unknown batch in this department: {}", batch_id))
                })?,
            (None, Some(name)) => {
                let mut candidates = self.directory.batches_by_name(department_id, &name).await?;
                if let Some(year) = &academic_year {
                    candidates.retain(|batch| &batch.academic_year == year);
                }
                match candidates.len() {
                    0 => {
                        return Err(AppError::bad_request(format!(
                            "Unknown batch in this department: {}",
                            name
                        )));
                    }
                    1 => candidates.remove(0),
                    _ => {
                        return Err(AppError::bad_request(format!(
                            "Batch {} exists in several academic years; specify academic_year",
                            name
                        )));
                    }
                }
            }
            (None, None) => return Ok(None),
        };

        if let Some(year) = academic_year.filter(|year| year != &batch.academic_year) {
            return Err(AppError::bad_request(format!(
                "Batch {} belongs to academic year {}, not {}",
                batch.name, batch.academic_year, year
            )));
        }

        Ok(Some(NewEnrollment {
            batch_id: batch.batch_id,
            academic_year: batch.academic_year,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityError, VerifiedIdentity};
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeIdentity {
        accounts: Mutex<Vec<(String, String)>>,
        next_id: Mutex<u32>,
    }

    impl FakeIdentity {
        fn emails(&self) -> Vec<String> {
            self.accounts
                .lock()
                .unwrap()
                .iter()
                .map(|(_, email)| email.clone())
                .collect()
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn verify_token(&self, _token: &str) -> Result<VerifiedIdentity, IdentityError> {
            Err(IdentityError::InvalidToken("not used".into()))
        }

        async fn create_account(&self, account: &NewAccount) -> Result<String, IdentityError> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.iter().any(|(_, email)| email == &account.email) {
                return Err(IdentityError::EmailExists(account.email.clone()));
            }
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let uid = format!("uid-{}", next_id);
            accounts.push((uid.clone(), account.email.clone()));
            Ok(uid)
        }

        async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
            let mut accounts = self.accounts.lock().unwrap();
            let before = accounts.len();
            accounts.retain(|(id, _)| id != uid);
            if accounts.len() == before {
                return Err(IdentityError::AccountNotFound(uid.to_string()));
            }
            Ok(())
        }

        async fn update_display_name(&self, _uid: &str, _name: &str) -> Result<(), IdentityError> {
            Ok(())
        }
    }

    struct FakeDirectory {
        departments: Vec<department::Model>,
        batches: Vec<batch::Model>,
        users: Mutex<Vec<user::Model>>,
        enrollments: Mutex<Vec<(Uuid, NewEnrollment)>>,
        fail_emails: Vec<String>,
    }

    fn department(name: &str, code: &str) -> department::Model {
        let now = Utc::now().naive_utc();
        department::Model {
            department_id: Uuid::new_v4(),
            name: name.to_string(),
            code: code.to_string(),
            description: None,
            hod_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn batch_in(department_id: Uuid, name: &str, academic_year: &str) -> batch::Model {
        let now = Utc::now().naive_utc();
        batch::Model {
            batch_id: Uuid::new_v4(),
            name: name.to_string(),
            department_id,
            year: 1,
            semester: 1,
            academic_year: academic_year.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    impl FakeDirectory {
        fn new(departments: Vec<department::Model>, batches: Vec<batch::Model>) -> Self {
            Self {
                departments,
                batches,
                users: Mutex::new(Vec::new()),
                enrollments: Mutex::new(Vec::new()),
                fail_emails: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl UserDirectory for FakeDirectory {
        async fn email_taken(&self, email: &str) -> anyhow::Result<bool> {
            Ok(self.users.lock().unwrap().iter().any(|u| u.email == email))
        }

        async fn department_by_id(&self, id: Uuid) -> anyhow::Result<Option<department::Model>> {
            Ok(self.departments.iter().find(|d| d.department_id == id).cloned())
        }

        async fn department_by_name(&self, name: &str) -> anyhow::Result<Option<department::Model>> {
            Ok(self
                .departments
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(name) || d.code.eq_ignore_ascii_case(name))
                .cloned())
        }

        async fn batch_by_id(&self, batch_id: Uuid) -> anyhow::Result<Option<batch::Model>> {
            Ok(self.batches.iter().find(|b| b.batch_id == batch_id).cloned())
        }

        async fn batches_by_name(
            &self,
            department_id: Uuid,
            name: &str,
        ) -> anyhow::Result<Vec<batch::Model>> {
            Ok(self
                .batches
                .iter()
                .filter(|b| b.department_id == department_id && b.name.eq_ignore_ascii_case(name))
                .cloned()
                .collect())
        }

        async fn create_user(
            &self,
            new_user: NewLocalUser,
            enrollment: Option<NewEnrollment>,
        ) -> anyhow::Result<user::Model> {
            if self.fail_emails.contains(&new_user.email) {
                anyhow::bail!("duplicate key value violates unique constraint");
            }
            let now = Utc::now().naive_utc();
            let model = user::Model {
                user_id: Uuid::new_v4(),
                firebase_uid: new_user.firebase_uid,
                email: new_user.email,
                name: new_user.name,
                role: new_user.role,
                department_id: new_user.department_id,
                phone: new_user.phone,
                roll_number: new_user.roll_number,
                created_at: now,
                updated_at: now,
            };
            if let Some(enrollment) = enrollment {
                self.enrollments.lock().unwrap().push((model.user_id, enrollment));
            }
            self.users.lock().unwrap().push(model.clone());
            Ok(model)
        }
    }

    fn row(email: &str, role: &str, department: &str) -> ProvisionRow {
        ProvisionRow {
            email: email.to_string(),
            name: "Test User".to_string(),
            role: role.to_string(),
            department: Some(department.to_string()),
            ..Default::default()
        }
    }

    fn numbered(rows: Vec<ProvisionRow>) -> Vec<(usize, ProvisionRow)> {
        rows.into_iter().enumerate().map(|(i, r)| (i + 1, r)).collect()
    }

    #[tokio::test]
    async fn test_local_failure_rolls_back_identity_account() {
        let cs = department("Computer Science", "CSE");
        let identity = Arc::new(FakeIdentity::default());
        let mut directory = FakeDirectory::new(vec![cs], vec![]);
        directory.fail_emails = vec!["broken@uni.edu".to_string()];
        let provisioner = Provisioner::new(
            identity.clone(),
            Arc::new(directory),
            ProvisionPolicy::principal(),
        );

        let result = provisioner
            .provision(row("broken@uni.edu", "faculty", "computer science"))
            .await;

        assert!(result.is_err());
        assert!(identity.emails().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_continues_after_failures() {
        let cs = department("Computer Science", "CSE");
        let identity = Arc::new(FakeIdentity::default());
        let directory = Arc::new(FakeDirectory::new(vec![cs], vec![]));
        let provisioner =
            Provisioner::new(identity.clone(), directory.clone(), ProvisionPolicy::principal());

        let rows = numbered(vec![
            row("a@uni.edu", "Faculty", "CSE"),
            row("b@uni.edu", "dean", "CSE"),
            row("c@uni.edu", "student", "Physics"),
            row("d@uni.edu", "STUDENT", "computer science"),
        ]);
        let mut report = ProvisionReport::default();
        provisioner.provision_all(rows, &mut report).await;

        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.failures[0].row, 2);
        assert!(report.failures[0].error.contains("unknown role"));
        assert_eq!(report.failures[1].row, 3);
        assert!(report.failures[1].error.contains("Unknown department"));
        assert!(report.successes.iter().all(|s| s.temporary_password.is_some()));
        assert_eq!(identity.emails(), vec!["a@uni.edu", "d@uni.edu"]);
    }

    #[tokio::test]
    async fn test_principal_rows_rejected() {
        let cs = department("Computer Science", "CSE");
        let provisioner = Provisioner::new(
            Arc::new(FakeIdentity::default()),
            Arc::new(FakeDirectory::new(vec![cs], vec![])),
            ProvisionPolicy::principal(),
        );
        let result = provisioner.provision(row("p@uni.edu", "principal", "CSE")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_hod_limited_to_own_department_and_roles() {
        let cs = department("Computer Science", "CSE");
        let physics = department("Physics", "PHY");
        let cs_id = cs.department_id;
        let provisioner = Provisioner::new(
            Arc::new(FakeIdentity::default()),
            Arc::new(FakeDirectory::new(vec![cs, physics], vec![])),
            ProvisionPolicy::hod(cs_id),
        );

        let created = provisioner
            .provision(row("s@uni.edu", "student", "Physics"))
            .await
            .unwrap();
        assert_eq!(created.user.department_id, Some(cs_id));

        let result = provisioner.provision(row("h@uni.edu", "hod", "CSE")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_student_enrolled_into_named_batch() {
        let cs = department("Computer Science", "CSE");
        let batch = batch_in(cs.department_id, "CSE-A", "2025-2026");
        let batch_id = batch.batch_id;
        let directory = Arc::new(FakeDirectory::new(vec![cs], vec![batch]));
        let provisioner = Provisioner::new(
            Arc::new(FakeIdentity::default()),
            directory.clone(),
            ProvisionPolicy::principal(),
        );

        let mut student = row("s@uni.edu", "student", "cse");
        student.batch = Some("cse-a".to_string());
        student.password = Some("secret123".to_string());
        let created = provisioner.provision(student).await.unwrap();

        assert_eq!(created.temporary_password, None);
        let enrollments = directory.enrollments.lock().unwrap();
        assert_eq!(enrollments.len(), 1);
        assert_eq!(enrollments[0].0, created.user.user_id);
        assert_eq!(
            enrollments[0].1,
            NewEnrollment {
                batch_id,
                academic_year: "2025-2026".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_ambiguous_batch_needs_academic_year() {
        let cs = department("Computer Science", "CSE");
        let older = batch_in(cs.department_id, "CSE-A", "2024-2025");
        let newer = batch_in(cs.department_id, "CSE-A", "2025-2026");
        let provisioner = Provisioner::new(
            Arc::new(FakeIdentity::default()),
            Arc::new(FakeDirectory::new(vec![cs], vec![older, newer])),
            ProvisionPolicy::principal(),
        );

        let mut student = row("s@uni.edu", "student", "CSE");
        student.batch = Some("CSE-A".to_string());
        assert!(provisioner.provision(student.clone()).await.is_err());

        student.academic_year = Some("2024-2025".to_string());
        assert!(provisioner.provision(student).await.is_ok());
    }

    #[tokio::test]
    async fn test_batch_id_with_other_academic_year_rejected() {
        let cs = department("Computer Science", "CSE");
        let batch = batch_in(cs.department_id, "CSE-A", "2025-2026");
        let batch_id = batch.batch_id;
        let identity = Arc::new(FakeIdentity::default());
        let directory = Arc::new(FakeDirectory::new(vec![cs], vec![batch]));
        let provisioner =
            Provisioner::new(identity.clone(), directory.clone(), ProvisionPolicy::principal());

        let mut student = row("s@uni.edu", "student", "CSE");
        student.batch_id = Some(batch_id);
        student.academic_year = Some("2024-2025".to_string());
        let result = provisioner.provision(student.clone()).await;
        assert!(
            matches!(result, Err(AppError::Validation { message, .. }) if message.contains("2025-2026"))
        );
        assert!(identity.emails().is_empty());
        assert!(directory.enrollments.lock().unwrap().is_empty());

        student.academic_year = Some("2025-2026".to_string());
        provisioner.provision(student).await.unwrap();
        let enrollments = directory.enrollments.lock().unwrap();
        assert_eq!(enrollments[0].1.academic_year, "2025-2026");
    }

    #[tokio::test]
    async fn test_duplicate_email_never_reaches_identity_provider() {
        let cs = department("Computer Science", "CSE");
        let identity = Arc::new(FakeIdentity::default());
        let provisioner = Provisioner::new(
            identity.clone(),
            Arc::new(FakeDirectory::new(vec![cs], vec![])),
            ProvisionPolicy::principal(),
        );

        provisioner.provision(row("x@uni.edu", "faculty", "CSE")).await.unwrap();
        let second = provisioner.provision(row("X@uni.edu", "faculty", "CSE")).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
        assert_eq!(identity.emails().len(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_lists_fields() {
        let provisioner = Provisioner::new(
            Arc::new(FakeIdentity::default()),
            Arc::new(FakeDirectory::new(vec![], vec![])),
            ProvisionPolicy::principal(),
        );
        let mut report = ProvisionReport::default();
        let mut bad = row("not-an-email", "student", "CSE");
        bad.name = " ".to_string();
        provisioner.provision_all(vec![(7, bad)], &mut report).await;

        assert_eq!(report.failed, 1);
        let error = &report.failures[0].error;
        assert!(error.contains("email"));
        assert!(error.contains("name"));
    }
}
