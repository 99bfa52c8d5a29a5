use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::notice;
use crate::entities::sea_orm_active_enums::NoticeAudience;
use crate::error::AppResult;
use crate::routes::dto::nullable;
use crate::utils::pagination::{PageMeta, default_page, default_page_size};
use crate::utils::validation::FieldErrors;

#[derive(Debug, Deserialize, IntoParams)]
pub struct NoticeQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Principal only: restrict to one department's notices
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNoticeRequest {
    #[schema(example = "Mid-semester exams")]
    pub title: String,
    pub content: String,
    #[serde(default = "default_audience")]
    #[schema(example = "ALL")]
    pub audience: NoticeAudience,
    /// Omit for an institution-wide notice. Ignored for HODs.
    pub department_id: Option<Uuid>,
}

fn default_audience() -> NoticeAudience {
    NoticeAudience::All
}

impl CreateNoticeRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        errors
            .required("title", &self.title)
            .required("content", &self.content);
        errors.into_result()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateNoticeRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub audience: Option<NoticeAudience>,
    /// `null` makes the notice institution-wide
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Uuid>)]
    pub department_id: Option<Option<Uuid>>,
}

impl UpdateNoticeRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            errors.required("title", title);
        }
        if let Some(content) = &self.content {
            errors.required("content", content);
        }
        errors.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoticeResponse {
    pub notice_id: Uuid,
    pub title: String,
    pub content: String,
    pub audience: NoticeAudience,
    pub department_id: Option<Uuid>,
    pub author_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<notice::Model> for NoticeResponse {
    fn from(notice: notice::Model) -> Self {
        Self {
            notice_id: notice.notice_id,
            title: notice.title,
            content: notice.content,
            audience: notice.audience,
            department_id: notice.department_id,
            author_id: notice.author_id,
            created_at: notice.created_at,
            updated_at: notice.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoticeListResponse {
    pub notices: Vec<NoticeResponse>,
    pub pagination: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_defaults_to_all() {
        let request: CreateNoticeRequest =
            serde_json::from_str(r#"{"title":"Holiday","content":"Closed on Friday"}"#).unwrap();
        assert_eq!(request.audience, NoticeAudience::All);
        assert!(request.department_id.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_update_can_clear_department() {
        let request: UpdateNoticeRequest =
            serde_json::from_str(r#"{"department_id":null}"#).unwrap();
        assert_eq!(request.department_id, Some(None));
    }
}
