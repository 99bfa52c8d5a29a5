//! `SeaORM` active enums backed by postgres enum types

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "role_enum")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleEnum {
    #[sea_orm(string_value = "principal")]
    Principal,
    #[sea_orm(string_value = "hod")]
    Hod,
    #[sea_orm(string_value = "faculty")]
    Faculty,
    #[sea_orm(string_value = "student")]
    Student,
}

impl RoleEnum {
    /// Case-insensitive parse used by bulk imports ("hod", "HOD", "Faculty", ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "principal" => Some(Self::Principal),
            "hod" => Some(Self::Hod),
            "faculty" => Some(Self::Faculty),
            "student" => Some(Self::Student),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Principal => "PRINCIPAL",
            Self::Hod => "HOD",
            Self::Faculty => "FACULTY",
            Self::Student => "STUDENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "absent")]
    Absent,
    #[sea_orm(string_value = "late")]
    Late,
    #[sea_orm(string_value = "excused")]
    Excused,
}

impl AttendanceStatus {
    /// Late counts as attended; excused days are left out of the percentage.
    pub fn counts_as_present(&self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "exam_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamType {
    #[sea_orm(string_value = "midterm")]
    Midterm,
    #[sea_orm(string_value = "final")]
    Final,
    #[sea_orm(string_value = "quiz")]
    Quiz,
    #[sea_orm(string_value = "assignment")]
    Assignment,
    #[sea_orm(string_value = "practical")]
    Practical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "fee_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "partially_paid")]
    PartiallyPaid,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "overdue")]
    Overdue,
    #[sea_orm(string_value = "waived")]
    Waived,
}

impl FeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PartiallyPaid => "PARTIALLY_PAID",
            Self::Paid => "PAID",
            Self::Overdue => "OVERDUE",
            Self::Waived => "WAIVED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "notice_audience")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeAudience {
    #[sea_orm(string_value = "all")]
    All,
    #[sea_orm(string_value = "faculty")]
    Faculty,
    #[sea_orm(string_value = "students")]
    Students,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "complaint_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}
