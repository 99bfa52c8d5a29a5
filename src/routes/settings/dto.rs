use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::college_settings;
use crate::error::AppResult;
use crate::utils::validation::{FieldErrors, is_valid_academic_year, is_valid_email};

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub college_name: String,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    pub current_academic_year: String,
    pub updated_at: NaiveDateTime,
}

impl From<college_settings::Model> for SettingsResponse {
    fn from(settings: college_settings::Model) -> Self {
        Self {
            college_name: settings.college_name,
            address: settings.address,
            contact_email: settings.contact_email,
            contact_phone: settings.contact_phone,
            website: settings.website,
            current_academic_year: settings.current_academic_year,
            updated_at: settings.updated_at,
        }
    }
}

/// Omitted fields are left unchanged; an empty string clears an optional field.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub college_name: Option<String>,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    #[schema(example = "2024-2025")]
    pub current_academic_year: Option<String>,
}

impl UpdateSettingsRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(college_name) = &self.college_name {
            errors.required("college_name", college_name);
        }
        if let Some(email) = self.contact_email.as_deref().filter(|e| !e.trim().is_empty()) {
            errors.check(is_valid_email(email), "contact_email", "is not a valid email");
        }
        if let Some(year) = &self.current_academic_year {
            errors.check(
                is_valid_academic_year(year),
                "current_academic_year",
                "must look like 2024-2025",
            );
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> UpdateSettingsRequest {
        UpdateSettingsRequest {
            college_name: None,
            address: None,
            contact_email: None,
            contact_phone: None,
            website: None,
            current_academic_year: None,
        }
    }

    #[test]
    fn test_clearing_email_is_allowed() {
        let request = UpdateSettingsRequest {
            contact_email: Some(String::new()),
            ..empty()
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_bad_academic_year_rejected() {
        let request = UpdateSettingsRequest {
            current_academic_year: Some("2024-2026".to_string()),
            ..empty()
        };
        assert!(request.validate().is_err());
    }
}
