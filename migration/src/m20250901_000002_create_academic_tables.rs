use crate::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(AttendanceStatus::Table)
                    .values([
                        AttendanceStatus::Present,
                        AttendanceStatus::Absent,
                        AttendanceStatus::Late,
                        AttendanceStatus::Excused,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(ExamType::Table)
                    .values([
                        ExamType::Midterm,
                        ExamType::Final,
                        ExamType::Quiz,
                        ExamType::Assignment,
                        ExamType::Practical,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Batch::Table)
                    .if_not_exists()
                    .col(uuid_pk(Batch::BatchId))
                    .col(ColumnDef::new(Batch::Name).string().not_null())
                    .col(ColumnDef::new(Batch::DepartmentId).uuid().not_null())
                    .col(ColumnDef::new(Batch::Year).integer().not_null())
                    .col(ColumnDef::new(Batch::Semester).integer().not_null())
                    .col(ColumnDef::new(Batch::AcademicYear).string().not_null())
                    .col(timestamp_now(Batch::CreatedAt))
                    .col(timestamp_now(Batch::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_batch_department")
                            .from_tbl(Batch::Table)
                            .from_col(Batch::DepartmentId)
                            .to_tbl(Department::Table)
                            .to_col(Department::DepartmentId)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_batch_department_name_year")
                    .table(Batch::Table)
                    .col(Batch::DepartmentId)
                    .col(Batch::Name)
                    .col(Batch::AcademicYear)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subject::Table)
                    .if_not_exists()
                    .col(uuid_pk(Subject::SubjectId))
                    .col(ColumnDef::new(Subject::Name).string().not_null())
                    .col(ColumnDef::new(Subject::Code).string().not_null().unique_key())
                    .col(ColumnDef::new(Subject::Credits).integer().not_null())
                    .col(ColumnDef::new(Subject::Semester).integer().not_null())
                    .col(ColumnDef::new(Subject::DepartmentId).uuid().not_null())
                    .col(ColumnDef::new(Subject::FacultyId).uuid().null())
                    .col(ColumnDef::new(Subject::BatchId).uuid().null())
                    .col(timestamp_now(Subject::CreatedAt))
                    .col(timestamp_now(Subject::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_department")
                            .from_tbl(Subject::Table)
                            .from_col(Subject::DepartmentId)
                            .to_tbl(Department::Table)
                            .to_col(Department::DepartmentId)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_faculty")
                            .from_tbl(Subject::Table)
                            .from_col(Subject::FacultyId)
                            .to_tbl(User::Table)
                            .to_col(User::UserId)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_batch")
                            .from_tbl(Subject::Table)
                            .from_col(Subject::BatchId)
                            .to_tbl(Batch::Table)
                            .to_col(Batch::BatchId)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Enrollment::Table)
                    .if_not_exists()
                    .col(uuid_pk(Enrollment::EnrollmentId))
                    .col(ColumnDef::new(Enrollment::StudentId).uuid().not_null())
                    .col(ColumnDef::new(Enrollment::BatchId).uuid().not_null())
                    .col(ColumnDef::new(Enrollment::AcademicYear).string().not_null())
                    .col(timestamp_now(Enrollment::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_student")
                            .from_tbl(Enrollment::Table)
                            .from_col(Enrollment::StudentId)
                            .to_tbl(User::Table)
                            .to_col(User::UserId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_batch")
                            .from_tbl(Enrollment::Table)
                            .from_col(Enrollment::BatchId)
                            .to_tbl(Batch::Table)
                            .to_col(Batch::BatchId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_enrollment_student_year")
                    .table(Enrollment::Table)
                    .col(Enrollment::StudentId)
                    .col(Enrollment::AcademicYear)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Assignment::Table)
                    .if_not_exists()
                    .col(uuid_pk(Assignment::AssignmentId))
                    .col(ColumnDef::new(Assignment::SubjectId).uuid().not_null())
                    .col(ColumnDef::new(Assignment::FacultyId).uuid().not_null())
                    .col(ColumnDef::new(Assignment::Title).string().not_null())
                    .col(ColumnDef::new(Assignment::Description).text().null())
                    .col(ColumnDef::new(Assignment::DueDate).timestamp().not_null())
                    .col(ColumnDef::new(Assignment::MaxMarks).integer().not_null())
                    .col(timestamp_now(Assignment::CreatedAt))
                    .col(timestamp_now(Assignment::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignment_subject")
                            .from_tbl(Assignment::Table)
                            .from_col(Assignment::SubjectId)
                            .to_tbl(Subject::Table)
                            .to_col(Subject::SubjectId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignment_faculty")
                            .from_tbl(Assignment::Table)
                            .from_col(Assignment::FacultyId)
                            .to_tbl(User::Table)
                            .to_col(User::UserId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Submission::Table)
                    .if_not_exists()
                    .col(uuid_pk(Submission::SubmissionId))
                    .col(ColumnDef::new(Submission::AssignmentId).uuid().not_null())
                    .col(ColumnDef::new(Submission::StudentId).uuid().not_null())
                    .col(ColumnDef::new(Submission::Content).text().not_null())
                    .col(ColumnDef::new(Submission::SubmittedAt).timestamp().not_null())
                    .col(ColumnDef::new(Submission::Marks).integer().null())
                    .col(ColumnDef::new(Submission::Feedback).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_submission_assignment")
                            .from_tbl(Submission::Table)
                            .from_col(Submission::AssignmentId)
                            .to_tbl(Assignment::Table)
                            .to_col(Assignment::AssignmentId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_submission_student")
                            .from_tbl(Submission::Table)
                            .from_col(Submission::StudentId)
                            .to_tbl(User::Table)
                            .to_col(User::UserId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_submission_assignment_student")
                    .table(Submission::Table)
                    .col(Submission::AssignmentId)
                    .col(Submission::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Attendance::Table)
                    .if_not_exists()
                    .col(uuid_pk(Attendance::AttendanceId))
                    .col(ColumnDef::new(Attendance::StudentId).uuid().not_null())
                    .col(ColumnDef::new(Attendance::SubjectId).uuid().not_null())
                    .col(ColumnDef::new(Attendance::Date).date().not_null())
                    .col(
                        ColumnDef::new(Attendance::Status)
                            .enumeration(
                                AttendanceStatus::Table,
                                [
                                    AttendanceStatus::Present,
                                    AttendanceStatus::Absent,
                                    AttendanceStatus::Late,
                                    AttendanceStatus::Excused,
                                ],
                            )
                            .not_null(),
                    )
                    .col(ColumnDef::new(Attendance::MarkedBy).uuid().not_null())
                    .col(timestamp_now(Attendance::CreatedAt))
                    .col(timestamp_now(Attendance::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_student")
                            .from_tbl(Attendance::Table)
                            .from_col(Attendance::StudentId)
                            .to_tbl(User::Table)
                            .to_col(User::UserId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_subject")
                            .from_tbl(Attendance::Table)
                            .from_col(Attendance::SubjectId)
                            .to_tbl(Subject::Table)
                            .to_col(Subject::SubjectId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_attendance_student_subject_date")
                    .table(Attendance::Table)
                    .col(Attendance::StudentId)
                    .col(Attendance::SubjectId)
                    .col(Attendance::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Grade::Table)
                    .if_not_exists()
                    .col(uuid_pk(Grade::GradeId))
                    .col(ColumnDef::new(Grade::StudentId).uuid().not_null())
                    .col(ColumnDef::new(Grade::SubjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(Grade::ExamType)
                            .enumeration(
                                ExamType::Table,
                                [
                                    ExamType::Midterm,
                                    ExamType::Final,
                                    ExamType::Quiz,
                                    ExamType::Assignment,
                                    ExamType::Practical,
                                ],
                            )
                            .not_null(),
                    )
                    .col(ColumnDef::new(Grade::Marks).decimal_len(6, 2).not_null())
                    .col(ColumnDef::new(Grade::MaxMarks).decimal_len(6, 2).not_null())
                    .col(ColumnDef::new(Grade::Remarks).text().null())
                    .col(timestamp_now(Grade::CreatedAt))
                    .col(timestamp_now(Grade::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grade_student")
                            .from_tbl(Grade::Table)
                            .from_col(Grade::StudentId)
                            .to_tbl(User::Table)
                            .to_col(User::UserId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grade_subject")
                            .from_tbl(Grade::Table)
                            .from_col(Grade::SubjectId)
                            .to_tbl(Subject::Table)
                            .to_col(Subject::SubjectId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_grade_student_subject_exam")
                    .table(Grade::Table)
                    .col(Grade::StudentId)
                    .col(Grade::SubjectId)
                    .col(Grade::ExamType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Grade::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Attendance::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Submission::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Assignment::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Enrollment::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Subject::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Batch::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ExamType::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(AttendanceStatus::Table).to_owned())
            .await?;

        Ok(())
    }
}

fn uuid_pk<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .uuid()
        .not_null()
        .primary_key()
        .extra("DEFAULT gen_random_uuid()".to_string())
        .to_owned()
}

fn timestamp_now<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .extra("DEFAULT CURRENT_TIMESTAMP".to_string())
        .to_owned()
}

#[derive(DeriveIden)]
enum Department {
    Table,
    DepartmentId,
}

#[derive(DeriveIden)]
enum User {
    Table,
    UserId,
}

#[derive(DeriveIden)]
enum Batch {
    Table,
    BatchId,
    Name,
    DepartmentId,
    Year,
    Semester,
    AcademicYear,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Subject {
    Table,
    SubjectId,
    Name,
    Code,
    Credits,
    Semester,
    DepartmentId,
    FacultyId,
    BatchId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Enrollment {
    Table,
    EnrollmentId,
    StudentId,
    BatchId,
    AcademicYear,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Assignment {
    Table,
    AssignmentId,
    SubjectId,
    FacultyId,
    Title,
    Description,
    DueDate,
    MaxMarks,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Submission {
    Table,
    SubmissionId,
    AssignmentId,
    StudentId,
    Content,
    SubmittedAt,
    Marks,
    Feedback,
}

#[derive(DeriveIden)]
enum Attendance {
    Table,
    AttendanceId,
    StudentId,
    SubjectId,
    Date,
    Status,
    MarkedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Grade {
    Table,
    GradeId,
    StudentId,
    SubjectId,
    ExamType,
    Marks,
    MaxMarks,
    Remarks,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AttendanceStatus {
    Table,
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(DeriveIden)]
enum ExamType {
    Table,
    Midterm,
    Final,
    Quiz,
    Assignment,
    Practical,
}
