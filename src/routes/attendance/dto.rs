use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::attendance;
use crate::entities::sea_orm_active_enums::AttendanceStatus;
use crate::services::attendance_summary::SubjectAttendanceSummary;
use crate::utils::pagination::{PageMeta, default_page, default_page_size};

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceQueryParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub subject_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    /// Inclusive lower bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubjectDayQuery {
    pub subject_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttendanceEntry {
    pub student_id: Uuid,
    #[schema(example = "PRESENT")]
    pub status: AttendanceStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAttendanceRequest {
    pub subject_id: Uuid,
    #[schema(example = "2025-09-01")]
    pub date: NaiveDate,
    pub records: Vec<AttendanceEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceResponse {
    pub attendance_id: Uuid,
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_by: Uuid,
    pub updated_at: NaiveDateTime,
}

impl From<attendance::Model> for AttendanceResponse {
    fn from(record: attendance::Model) -> Self {
        Self {
            attendance_id: record.attendance_id,
            student_id: record.student_id,
            subject_id: record.subject_id,
            date: record.date,
            status: record.status,
            marked_by: record.marked_by,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub records: Vec<AttendanceResponse>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubjectDayAttendanceResponse {
    pub subject_id: Uuid,
    pub date: NaiveDate,
    pub records: Vec<AttendanceResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAttendanceResponse {
    pub summary: Vec<SubjectAttendanceSummary>,
    pub records: Vec<AttendanceResponse>,
}
