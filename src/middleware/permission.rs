//! Role allow-lists and the data scope every repository query is filtered by.
//!
//! One rule per role: principals see the institution, HODs their department, faculty the
//! subjects assigned to them and students only their own records.

use uuid::Uuid;

use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::entities::user;
use crate::error::{AppError, AppResult};

pub const PRINCIPAL_ONLY: &[RoleEnum] = &[RoleEnum::Principal];
pub const HOD_ONLY: &[RoleEnum] = &[RoleEnum::Hod];
pub const FACULTY_ONLY: &[RoleEnum] = &[RoleEnum::Faculty];
pub const STUDENT_ONLY: &[RoleEnum] = &[RoleEnum::Student];

/// Roles a HOD may provision or manage inside their department.
pub const HOD_MANAGED_ROLES: &[RoleEnum] = &[RoleEnum::Faculty, RoleEnum::Student];
/// Roles the principal may provision; the principal role itself only moves by transfer.
pub const PRINCIPAL_MANAGED_ROLES: &[RoleEnum] =
    &[RoleEnum::Hod, RoleEnum::Faculty, RoleEnum::Student];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Institution,
    Department(Uuid),
    Faculty {
        user_id: Uuid,
        department_id: Option<Uuid>,
    },
    Own(Uuid),
}

pub fn require_role(user: &user::Model, allowed: &[RoleEnum]) -> AppResult<()> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Role {} is not allowed to access this resource",
            user.role.as_str()
        )))
    }
}

impl Scope {
    pub fn for_user(user: &user::Model) -> AppResult<Self> {
        match user.role {
            RoleEnum::Principal => Ok(Self::Institution),
            RoleEnum::Hod => user.department_id.map(Self::Department).ok_or_else(|| {
                AppError::forbidden("HOD account is not assigned to a department")
            }),
            RoleEnum::Faculty => Ok(Self::Faculty {
                user_id: user.user_id,
                department_id: user.department_id,
            }),
            RoleEnum::Student => Ok(Self::Own(user.user_id)),
        }
    }

    /// Department filter to apply to department-owned records, `None` for no filter.
    pub fn department_filter(&self) -> Option<Uuid> {
        match self {
            Self::Department(department_id) => Some(*department_id),
            _ => None,
        }
    }

    /// Student filter to apply to student-owned records, `None` for no filter.
    pub fn student_filter(&self) -> Option<Uuid> {
        match self {
            Self::Own(student_id) => Some(*student_id),
            _ => None,
        }
    }

    /// Faculty filter to apply to subject-owned records, `None` for no filter.
    pub fn faculty_filter(&self) -> Option<Uuid> {
        match self {
            Self::Faculty { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    /// Checks a record owned by `record_department` is inside a department-level scope.
    pub fn ensure_department(&self, record_department: Option<Uuid>) -> AppResult<()> {
        match self {
            Self::Institution => Ok(()),
            Self::Department(department_id) if record_department == Some(*department_id) => {
                Ok(())
            }
            _ => Err(AppError::forbidden(
                "Resource belongs to a different department",
            )),
        }
    }

    /// Checks a student-owned record is visible to this scope. HODs are checked against the
    /// student's department, which the caller passes in.
    pub fn ensure_student(
        &self,
        student_id: Uuid,
        student_department: Option<Uuid>,
    ) -> AppResult<()> {
        match self {
            Self::Institution => Ok(()),
            Self::Department(_) => self.ensure_department(student_department),
            Self::Own(own_id) if *own_id == student_id => Ok(()),
            Self::Own(_) => Err(AppError::forbidden(
                "Students can only access their own records",
            )),
            Self::Faculty { .. } => Err(AppError::forbidden(
                "Faculty access is limited to their own subjects",
            )),
        }
    }

    /// Checks a subject is inside the scope: department for HODs, assignment for faculty.
    pub fn ensure_subject(
        &self,
        subject_department: Uuid,
        subject_faculty: Option<Uuid>,
    ) -> AppResult<()> {
        match self {
            Self::Institution => Ok(()),
            Self::Department(department_id) if *department_id == subject_department => Ok(()),
            Self::Faculty { user_id, .. } if subject_faculty == Some(*user_id) => Ok(()),
            Self::Faculty { .. } => Err(AppError::forbidden(
                "Subject is not assigned to you",
            )),
            _ => Err(AppError::forbidden(
                "Subject belongs to a different department",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with(role: RoleEnum, department_id: Option<Uuid>) -> user::Model {
        let now = Utc::now().naive_utc();
        user::Model {
            user_id: Uuid::new_v4(),
            firebase_uid: "uid".to_string(),
            email: "someone@uni.edu".to_string(),
            name: "Someone".to_string(),
            role,
            department_id,
            phone: None,
            roll_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_require_role() {
        let hod = user_with(RoleEnum::Hod, Some(Uuid::new_v4()));
        assert!(require_role(&hod, HOD_ONLY).is_ok());
        assert!(matches!(
            require_role(&hod, PRINCIPAL_ONLY),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_scope_per_role() {
        let dept = Uuid::new_v4();
        let principal = user_with(RoleEnum::Principal, None);
        let hod = user_with(RoleEnum::Hod, Some(dept));
        let faculty = user_with(RoleEnum::Faculty, Some(dept));
        let student = user_with(RoleEnum::Student, Some(dept));

        assert_eq!(Scope::for_user(&principal).unwrap(), Scope::Institution);
        assert_eq!(Scope::for_user(&hod).unwrap(), Scope::Department(dept));
        assert_eq!(
            Scope::for_user(&faculty).unwrap().faculty_filter(),
            Some(faculty.user_id)
        );
        assert_eq!(
            Scope::for_user(&student).unwrap().student_filter(),
            Some(student.user_id)
        );
    }

    #[test]
    fn test_hod_without_department_is_forbidden() {
        let hod = user_with(RoleEnum::Hod, None);
        assert!(matches!(Scope::for_user(&hod), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_hod_cannot_reach_other_department() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = Scope::Department(own);

        assert!(scope.ensure_department(Some(own)).is_ok());
        assert!(scope.ensure_department(Some(other)).is_err());
        assert!(scope.ensure_department(None).is_err());
        assert!(scope.ensure_student(Uuid::new_v4(), Some(other)).is_err());
        assert!(scope.ensure_subject(other, None).is_err());
        assert!(scope.ensure_subject(own, None).is_ok());
    }

    #[test]
    fn test_student_only_sees_own_records() {
        let me = Uuid::new_v4();
        let scope = Scope::Own(me);
        assert!(scope.ensure_student(me, None).is_ok());
        assert!(scope.ensure_student(Uuid::new_v4(), None).is_err());
        assert!(scope.ensure_department(None).is_err());
    }

    #[test]
    fn test_faculty_limited_to_assigned_subjects() {
        let me = Uuid::new_v4();
        let dept = Uuid::new_v4();
        let scope = Scope::Faculty {
            user_id: me,
            department_id: Some(dept),
        };
        assert!(scope.ensure_subject(dept, Some(me)).is_ok());
        assert!(scope.ensure_subject(dept, Some(Uuid::new_v4())).is_err());
        assert!(scope.ensure_subject(dept, None).is_err());
    }
}
