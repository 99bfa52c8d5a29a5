use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::batch;
use crate::error::AppResult;
use crate::utils::pagination::{PageMeta, default_page, default_page_size};
use crate::utils::validation::{FieldErrors, is_valid_academic_year};

const YEARS: std::ops::RangeInclusive<i32> = 1..=6;
const SEMESTERS: std::ops::RangeInclusive<i32> = 1..=12;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBatchRequest {
    #[schema(example = "CSE-2025-A")]
    pub name: String,
    /// Required for the principal; HODs always create in their own department
    pub department_id: Option<Uuid>,
    #[schema(example = 1)]
    pub year: i32,
    #[schema(example = 1)]
    pub semester: i32,
    #[schema(example = "2025-2026")]
    pub academic_year: String,
}

impl CreateBatchRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        errors
            .required("name", &self.name)
            .check(YEARS.contains(&self.year), "year", "must be between 1 and 6")
            .check(SEMESTERS.contains(&self.semester), "semester", "must be between 1 and 12")
            .check(
                is_valid_academic_year(&self.academic_year),
                "academic_year",
                "must look like 2025-2026",
            );
        errors.into_result()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBatchRequest {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<i32>,
    pub academic_year: Option<String>,
}

impl UpdateBatchRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.required("name", name);
        }
        if let Some(year) = self.year {
            errors.check(YEARS.contains(&year), "year", "must be between 1 and 6");
        }
        if let Some(semester) = self.semester {
            errors.check(SEMESTERS.contains(&semester), "semester", "must be between 1 and 12");
        }
        if let Some(academic_year) = &self.academic_year {
            errors.check(
                is_valid_academic_year(academic_year),
                "academic_year",
                "must look like 2025-2026",
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BatchQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub department_id: Option<Uuid>,
    pub academic_year: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub batch_id: Uuid,
    pub name: String,
    pub department_id: Uuid,
    pub year: i32,
    pub semester: i32,
    pub academic_year: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<batch::Model> for BatchResponse {
    fn from(batch: batch::Model) -> Self {
        Self {
            batch_id: batch.batch_id,
            name: batch.name,
            department_id: batch.department_id,
            year: batch.year,
            semester: batch.semester,
            academic_year: batch.academic_year,
            created_at: batch.created_at,
            updated_at: batch.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchListResponse {
    pub batches: Vec<BatchResponse>,
    pub pagination: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn request(year: i32, semester: i32, academic_year: &str) -> CreateBatchRequest {
        CreateBatchRequest {
            name: "CSE-A".to_string(),
            department_id: None,
            year,
            semester,
            academic_year: academic_year.to_string(),
        }
    }

    #[test]
    fn test_create_batch_validation() {
        assert!(request(1, 2, "2025-2026").validate().is_ok());

        let err = request(7, 0, "2025").validate().unwrap_err();
        match err {
            AppError::Validation { details: Some(details), .. } => {
                let fields: Vec<&str> = details
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|d| d["field"].as_str().unwrap())
                    .collect();
                assert_eq!(fields, vec!["year", "semester", "academic_year"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
