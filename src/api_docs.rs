use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::entities::sea_orm_active_enums::{
    AttendanceStatus, ComplaintStatus, ExamType, FeeStatus, NoticeAudience, RoleEnum,
};
use crate::error::{ErrorResponse, FieldError};
use crate::routes::{
    assignments, attendance, auth, batches, complaints, departments, dto, enrollments, fees,
    grades, health, notices, settings, stats, subjects, users,
};
use crate::services::attendance_summary::SubjectAttendanceSummary;
use crate::services::provisioning::{
    ProvisionFailure, ProvisionReport, ProvisionRow, ProvisionSuccess,
};
use crate::utils::pagination::PageMeta;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "University Portal API",
        description = "Role-based portal for principals, heads of department, faculty and students"
    ),
    paths(
        health::route::health,
        auth::route::get_me,
        auth::route::update_me,
        users::route::get_all_users,
        users::route::create_user,
        users::route::create_users_bulk,
        users::route::upload_users_bulk,
        users::route::get_user_by_id,
        users::route::update_user,
        users::route::delete_user,
        users::route::transfer_principal,
        users::route::get_department_faculty,
        users::route::get_department_students,
        users::route::hod_get_user_by_id,
        users::route::hod_create_users_bulk,
        departments::route::create_department,
        departments::route::get_all_departments,
        departments::route::get_department,
        departments::route::update_department,
        departments::route::delete_department,
        batches::route::get_all_batches,
        batches::route::create_batch,
        batches::route::get_batch,
        batches::route::update_batch,
        batches::route::delete_batch,
        batches::route::hod_get_batches,
        batches::route::hod_create_batch,
        batches::route::hod_update_batch,
        subjects::route::get_all_subjects,
        subjects::route::create_subject,
        subjects::route::get_subject,
        subjects::route::update_subject,
        subjects::route::delete_subject,
        subjects::route::hod_get_subjects,
        subjects::route::hod_create_subject,
        subjects::route::hod_update_subject,
        subjects::route::faculty_get_subjects,
        subjects::route::faculty_get_subject_students,
        subjects::route::student_get_subjects,
        enrollments::route::get_all_enrollments,
        enrollments::route::create_enrollment,
        enrollments::route::delete_enrollment,
        enrollments::route::hod_get_enrollments,
        enrollments::route::hod_create_enrollment,
        attendance::route::hod_get_attendance,
        attendance::route::faculty_get_attendance,
        attendance::route::faculty_mark_attendance,
        attendance::route::student_get_attendance,
        grades::route::hod_get_grades,
        grades::route::faculty_get_grades,
        grades::route::faculty_record_grades,
        grades::route::student_get_grades,
        assignments::route::faculty_get_assignments,
        assignments::route::faculty_create_assignment,
        assignments::route::faculty_update_assignment,
        assignments::route::faculty_delete_assignment,
        assignments::route::faculty_get_submissions,
        assignments::route::faculty_grade_submission,
        assignments::route::student_get_assignments,
        assignments::route::student_submit_assignment,
        fees::route::get_all_fees,
        fees::route::create_fee,
        fees::route::create_batch_fees,
        fees::route::mark_overdue_fees,
        fees::route::export_fees,
        fees::route::get_fee,
        fees::route::update_fee,
        fees::route::delete_fee,
        fees::route::update_fee_status,
        fees::route::hod_get_fees,
        fees::route::student_get_fees,
        complaints::route::get_all_complaints,
        complaints::route::resolve_complaint,
        complaints::route::hod_get_complaints,
        complaints::route::hod_resolve_complaint,
        complaints::route::student_get_complaints,
        complaints::route::student_create_complaint,
        notices::route::get_notices,
        notices::route::get_all_notices,
        notices::route::create_notice,
        notices::route::update_notice,
        notices::route::delete_notice,
        notices::route::hod_get_notices,
        notices::route::hod_create_notice,
        settings::route::get_settings,
        settings::route::update_settings,
        stats::route::get_admin_stats,
        stats::route::get_hod_stats,
    ),
    components(
        schemas(
            ErrorResponse,
            FieldError,
            PageMeta,
            dto::MessageResponse,
            RoleEnum,
            AttendanceStatus,
            ExamType,
            FeeStatus,
            NoticeAudience,
            ComplaintStatus,
            health::route::HealthResponse,
            auth::dto::DepartmentSummary,
            auth::dto::ProfileResponse,
            auth::dto::UpdateProfileRequest,
            users::dto::UserResponse,
            users::dto::UserListResponse,
            users::dto::CreatedUserResponse,
            users::dto::BulkCreateUsersRequest,
            users::dto::UpdateUserRequest,
            users::dto::TransferPrincipalRequest,
            users::dto::TransferPrincipalResponse,
            ProvisionRow,
            ProvisionSuccess,
            ProvisionFailure,
            ProvisionReport,
            departments::dto::CreateDepartmentRequest,
            departments::dto::UpdateDepartmentRequest,
            departments::dto::DepartmentResponse,
            departments::dto::DepartmentListResponse,
            batches::dto::CreateBatchRequest,
            batches::dto::UpdateBatchRequest,
            batches::dto::BatchResponse,
            batches::dto::BatchListResponse,
            subjects::dto::CreateSubjectRequest,
            subjects::dto::UpdateSubjectRequest,
            subjects::dto::SubjectResponse,
            subjects::dto::SubjectListResponse,
            subjects::dto::StudentSubjectsResponse,
            subjects::dto::SubjectStudentsResponse,
            enrollments::dto::CreateEnrollmentRequest,
            enrollments::dto::EnrollmentResponse,
            enrollments::dto::EnrollmentListResponse,
            attendance::dto::AttendanceEntry,
            attendance::dto::MarkAttendanceRequest,
            attendance::dto::AttendanceResponse,
            attendance::dto::AttendanceListResponse,
            attendance::dto::SubjectDayAttendanceResponse,
            attendance::dto::StudentAttendanceResponse,
            SubjectAttendanceSummary,
            grades::dto::GradeEntryRequest,
            grades::dto::RecordGradesRequest,
            grades::dto::GradeResponse,
            grades::dto::GradeListResponse,
            grades::dto::RecordedGradesResponse,
            assignments::dto::CreateAssignmentRequest,
            assignments::dto::UpdateAssignmentRequest,
            assignments::dto::SubmitAssignmentRequest,
            assignments::dto::GradeSubmissionRequest,
            assignments::dto::AssignmentResponse,
            assignments::dto::AssignmentListResponse,
            assignments::dto::SubmissionResponse,
            assignments::dto::SubmissionListResponse,
            assignments::dto::StudentAssignmentResponse,
            assignments::dto::StudentAssignmentListResponse,
            fees::dto::CreateFeeRequest,
            fees::dto::CreateBatchFeesRequest,
            fees::dto::UpdateFeeRequest,
            fees::dto::UpdateFeeStatusRequest,
            fees::dto::FeeResponse,
            fees::dto::FeeListResponse,
            fees::dto::BatchFeesResponse,
            fees::dto::MarkOverdueResponse,
            complaints::dto::CreateComplaintRequest,
            complaints::dto::ResolveComplaintRequest,
            complaints::dto::ComplaintResponse,
            complaints::dto::ComplaintListResponse,
            notices::dto::CreateNoticeRequest,
            notices::dto::UpdateNoticeRequest,
            notices::dto::NoticeResponse,
            notices::dto::NoticeListResponse,
            settings::dto::SettingsResponse,
            settings::dto::UpdateSettingsRequest,
            stats::dto::RoleCounts,
            stats::dto::FeeSummary,
            stats::dto::AdminStatsResponse,
            stats::dto::HodStatsResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Auth", description = "The caller's own profile"),
        (name = "Notices", description = "Notices visible to any role"),
        (name = "Admin", description = "Principal portal"),
        (name = "HOD", description = "Head of department portal"),
        (name = "Faculty", description = "Faculty portal"),
        (name = "Student", description = "Student portal")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Firebase ID token"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_portal_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/auth/me",
            "/api/admin/fees/{fee_id}/status",
            "/api/hod/stats",
            "/api/faculty/attendance",
            "/api/student/assignments/{id}/submit",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
