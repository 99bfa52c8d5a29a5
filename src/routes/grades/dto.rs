use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::grade;
use crate::entities::sea_orm_active_enums::ExamType;
use crate::error::AppResult;
use crate::utils::pagination::{PageMeta, default_page, default_page_size};
use crate::utils::validation::FieldErrors;

#[derive(Debug, Deserialize, IntoParams)]
pub struct GradeQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub subject_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub exam_type: Option<ExamType>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GradeEntryRequest {
    pub student_id: Uuid,
    #[schema(value_type = String, example = "42.5")]
    pub marks: Decimal,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordGradesRequest {
    pub subject_id: Uuid,
    #[schema(example = "MIDTERM")]
    pub exam_type: ExamType,
    #[schema(value_type = String, example = "50")]
    pub max_marks: Decimal,
    pub grades: Vec<GradeEntryRequest>,
}

impl RecordGradesRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        errors
            .check(!self.grades.is_empty(), "grades", "must not be empty")
            .check(self.max_marks > Decimal::ZERO, "max_marks", "must be greater than 0");
        for (idx, entry) in self.grades.iter().enumerate() {
            if entry.marks < Decimal::ZERO || entry.marks > self.max_marks {
                errors.push(
                    &format!("grades[{}].marks", idx),
                    format!("must be between 0 and {}", self.max_marks),
                );
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GradeResponse {
    pub grade_id: Uuid,
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub exam_type: ExamType,
    #[schema(value_type = String)]
    pub marks: Decimal,
    #[schema(value_type = String)]
    pub max_marks: Decimal,
    pub remarks: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl From<grade::Model> for GradeResponse {
    fn from(grade: grade::Model) -> Self {
        Self {
            grade_id: grade.grade_id,
            student_id: grade.student_id,
            subject_id: grade.subject_id,
            exam_type: grade.exam_type,
            marks: grade.marks,
            max_marks: grade.max_marks,
            remarks: grade.remarks,
            updated_at: grade.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GradeListResponse {
    pub grades: Vec<GradeResponse>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordedGradesResponse {
    pub subject_id: Uuid,
    pub exam_type: ExamType,
    pub grades: Vec<GradeResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn request(max_marks: i64, marks: &[i64]) -> RecordGradesRequest {
        RecordGradesRequest {
            subject_id: Uuid::new_v4(),
            exam_type: ExamType::Quiz,
            max_marks: Decimal::from(max_marks),
            grades: marks
                .iter()
                .map(|m| GradeEntryRequest {
                    student_id: Uuid::new_v4(),
                    marks: Decimal::from(*m),
                    remarks: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_marks_within_max() {
        assert!(request(20, &[0, 15, 20]).validate().is_ok());
    }

    #[test]
    fn test_marks_above_max_rejected() {
        match request(20, &[15, 21]).validate() {
            Err(AppError::Validation { details: Some(details), .. }) => {
                assert_eq!(details[0]["field"], "grades[1].marks");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_and_zero_max_rejected() {
        assert!(request(0, &[]).validate().is_err());
    }
}
