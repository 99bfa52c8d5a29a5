use crate::error::{AppError, AppResult, FieldError};

/// Collects field-level failures and turns them into a single 400.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.push(field, message);
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, "is required")
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::fields("Validation failed", self.errors))
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Academic years look like `2024-2025`: two consecutive years.
pub fn is_valid_academic_year(value: &str) -> bool {
    let Some((start, end)) = value.trim().split_once('-') else {
        return false;
    };
    match (start.parse::<i32>(), end.parse::<i32>()) {
        (Ok(start), Ok(end)) => start.to_string().len() == 4 && end == start + 1,
        _ => false,
    }
}

/// Trims and drops empty optional strings.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collects_all_failures() {
        let mut errors = FieldErrors::new();
        errors
            .required("name", "  ")
            .check(is_valid_email("bad"), "email", "must be a valid email")
            .required("code", "CS");

        match errors.into_result() {
            Err(AppError::Validation {
                details: Some(details),
                ..
            }) => {
                assert_eq!(details.as_array().map(|d| d.len()), Some(2));
                assert_eq!(details[0]["field"], "name");
                assert_eq!(details[1]["field"], "email");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_field_errors_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("dean@uni.edu"));
        assert!(!is_valid_email("dean@uni"));
        assert!(!is_valid_email("@uni.edu"));
        assert!(!is_valid_email("de an@uni.edu"));
    }

    #[test]
    fn test_academic_year() {
        assert!(is_valid_academic_year("2024-2025"));
        assert!(!is_valid_academic_year("2024-2026"));
        assert!(!is_valid_academic_year("24-25"));
        assert!(!is_valid_academic_year("2024"));
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(normalize_optional(Some(" 555 ".into())), Some("555".into()));
    }
}
