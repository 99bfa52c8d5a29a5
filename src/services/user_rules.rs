//! Invariants on user records that span more than one row.
//!
//! Exactly one principal exists at all times: the role is never granted or removed by a
//! plain create/update/delete, only swapped by a principal transfer. A department's HOD must
//! be an HOD of that same department.

use uuid::Uuid;

use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::entities::user;
use crate::error::{AppError, AppResult};

pub fn ensure_not_principal_role(role: RoleEnum) -> AppResult<()> {
    if role == RoleEnum::Principal {
        return Err(AppError::conflict(
            "A principal already exists; use a principal transfer instead",
        ));
    }
    Ok(())
}

pub fn ensure_role_change_allowed(current: &user::Model, new_role: RoleEnum) -> AppResult<()> {
    if current.role == new_role {
        return Ok(());
    }
    if current.role == RoleEnum::Principal {
        return Err(AppError::conflict(
            "The principal cannot be demoted; transfer the principal role first",
        ));
    }
    ensure_not_principal_role(new_role)
}

pub fn ensure_deletable(target: &user::Model, caller_id: Uuid) -> AppResult<()> {
    if target.role == RoleEnum::Principal {
        return Err(AppError::conflict("The principal account cannot be deleted"));
    }
    if target.user_id == caller_id {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }
    Ok(())
}

/// Every role except the principal belongs to a department.
pub fn ensure_department_requirement(role: RoleEnum, department_id: Option<Uuid>) -> AppResult<()> {
    if role != RoleEnum::Principal && department_id.is_none() {
        return Err(AppError::bad_request(format!(
            "A department is required for role {}",
            role.as_str()
        )));
    }
    Ok(())
}

/// Whether departments pointing at `before` as their HOD must be cleared after the update.
pub fn hod_link_broken(before: &user::Model, role: RoleEnum, department_id: Option<Uuid>) -> bool {
    before.role == RoleEnum::Hod && (role != RoleEnum::Hod || department_id != before.department_id)
}

pub fn ensure_valid_hod(candidate: &user::Model, department_id: Uuid) -> AppResult<()> {
    if candidate.role != RoleEnum::Hod {
        return Err(AppError::bad_request(format!(
            "User {} does not have the HOD role",
            candidate.email
        )));
    }
    if candidate.department_id != Some(department_id) {
        return Err(AppError::bad_request(format!(
            "User {} is not a member of this department",
            candidate.email
        )));
    }
    Ok(())
}

/// Validates a principal transfer from `current` to `successor`.
pub fn ensure_transferable(
    current: &user::Model,
    successor: &user::Model,
    former_role: RoleEnum,
    former_department_id: Option<Uuid>,
) -> AppResult<()> {
    if current.role != RoleEnum::Principal {
        return Err(AppError::forbidden("Only the principal can transfer the role"));
    }
    if current.user_id == successor.user_id {
        return Err(AppError::bad_request("The user is already the principal"));
    }
    if former_role == RoleEnum::Principal {
        return Err(AppError::bad_request(
            "The former principal must take a different role",
        ));
    }
    ensure_department_requirement(former_role, former_department_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with(role: RoleEnum, department_id: Option<Uuid>) -> user::Model {
        let now = Utc::now().naive_utc();
        user::Model {
            user_id: Uuid::new_v4(),
            firebase_uid: Uuid::new_v4().to_string(),
            email: "staff@uni.edu".to_string(),
            name: "Staff".to_string(),
            role,
            department_id,
            phone: None,
            roll_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_principal_cannot_be_demoted_or_deleted() {
        let principal = user_with(RoleEnum::Principal, None);
        assert!(matches!(
            ensure_role_change_allowed(&principal, RoleEnum::Faculty),
            Err(AppError::Conflict(_))
        ));
        assert!(ensure_role_change_allowed(&principal, RoleEnum::Principal).is_ok());
        assert!(matches!(
            ensure_deletable(&principal, Uuid::new_v4()),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_second_principal_is_rejected() {
        let faculty = user_with(RoleEnum::Faculty, Some(Uuid::new_v4()));
        assert!(matches!(
            ensure_role_change_allowed(&faculty, RoleEnum::Principal),
            Err(AppError::Conflict(_))
        ));
        assert!(ensure_role_change_allowed(&faculty, RoleEnum::Hod).is_ok());
        assert!(ensure_not_principal_role(RoleEnum::Principal).is_err());
    }

    #[test]
    fn test_self_delete_rejected() {
        let hod = user_with(RoleEnum::Hod, Some(Uuid::new_v4()));
        assert!(ensure_deletable(&hod, hod.user_id).is_err());
        assert!(ensure_deletable(&hod, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_hod_link_broken() {
        let dept = Uuid::new_v4();
        let hod = user_with(RoleEnum::Hod, Some(dept));
        assert!(!hod_link_broken(&hod, RoleEnum::Hod, Some(dept)));
        assert!(hod_link_broken(&hod, RoleEnum::Faculty, Some(dept)));
        assert!(hod_link_broken(&hod, RoleEnum::Hod, Some(Uuid::new_v4())));

        let faculty = user_with(RoleEnum::Faculty, Some(dept));
        assert!(!hod_link_broken(&faculty, RoleEnum::Student, None));
    }

    #[test]
    fn test_hod_must_belong_to_department() {
        let dept = Uuid::new_v4();
        let hod = user_with(RoleEnum::Hod, Some(dept));
        assert!(ensure_valid_hod(&hod, dept).is_ok());
        assert!(ensure_valid_hod(&hod, Uuid::new_v4()).is_err());

        let faculty = user_with(RoleEnum::Faculty, Some(dept));
        assert!(ensure_valid_hod(&faculty, dept).is_err());
    }

    #[test]
    fn test_transfer_rules() {
        let dept = Uuid::new_v4();
        let principal = user_with(RoleEnum::Principal, None);
        let successor = user_with(RoleEnum::Hod, Some(dept));

        assert!(ensure_transferable(&principal, &successor, RoleEnum::Faculty, Some(dept)).is_ok());
        assert!(ensure_transferable(&principal, &successor, RoleEnum::Faculty, None).is_err());
        assert!(
            ensure_transferable(&principal, &successor, RoleEnum::Principal, Some(dept)).is_err()
        );
        assert!(ensure_transferable(&principal, &principal, RoleEnum::Hod, Some(dept)).is_err());
    }

    #[test]
    fn test_department_requirement() {
        assert!(ensure_department_requirement(RoleEnum::Principal, None).is_ok());
        assert!(ensure_department_requirement(RoleEnum::Student, None).is_err());
        assert!(ensure_department_requirement(RoleEnum::Student, Some(Uuid::new_v4())).is_ok());
    }
}
