//! Who a faculty member may record attendance and grades for: the students enrolled in
//! the subject's batch, or the department's students when the subject has no batch.

use std::collections::HashSet;

use uuid::Uuid;

use crate::entities::subject;
use crate::error::{AppError, AppResult};
use crate::middleware::permission::Scope;
use crate::repositories::{SubjectRepository, UserRepository};

/// Loads a subject and checks it is inside `scope`.
pub async fn subject_in_scope(scope: &Scope, subject_id: Uuid) -> AppResult<subject::Model> {
    let subject = SubjectRepository::new()
        .find_by_id(subject_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subject not found"))?;
    scope.ensure_subject(subject.department_id, subject.faculty_id)?;
    Ok(subject)
}

/// One entry per student; the bulk upserts cannot write the same row twice.
pub fn ensure_unique_students(student_ids: &[Uuid]) -> AppResult<()> {
    let mut seen = HashSet::with_capacity(student_ids.len());
    for student_id in student_ids {
        if !seen.insert(*student_id) {
            return Err(AppError::bad_request(format!(
                "Student {} appears more than once",
                student_id
            )));
        }
    }
    Ok(())
}

pub fn ensure_on_roster(student_ids: &[Uuid], roster: &HashSet<Uuid>) -> AppResult<()> {
    let outsiders: Vec<String> = student_ids
        .iter()
        .filter(|id| !roster.contains(id))
        .map(Uuid::to_string)
        .collect();
    if outsiders.is_empty() {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "Students not taking this subject: {}",
            outsiders.join(", ")
        )))
    }
}

pub async fn subject_roster(subject: &subject::Model) -> AppResult<HashSet<Uuid>> {
    let roster = UserRepository::new()
        .find_roster(subject)
        .await?
        .into_iter()
        .map(|student| student.user_id)
        .collect();
    Ok(roster)
}

/// Validates a bulk entry list against the subject's roster.
pub async fn ensure_students_take_subject(
    subject: &subject::Model,
    student_ids: &[Uuid],
) -> AppResult<()> {
    ensure_unique_students(student_ids)?;
    let roster = subject_roster(subject).await?;
    ensure_on_roster(student_ids, &roster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_students_rejected() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(ensure_unique_students(&[a, b]).is_ok());
        assert!(matches!(
            ensure_unique_students(&[a, b, a]),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_students_outside_roster_rejected() {
        let enrolled = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let roster: HashSet<Uuid> = [enrolled].into_iter().collect();

        assert!(ensure_on_roster(&[enrolled], &roster).is_ok());
        let err = ensure_on_roster(&[enrolled, stranger], &roster).unwrap_err();
        assert!(err.to_string().contains(&stranger.to_string()));
    }
}
