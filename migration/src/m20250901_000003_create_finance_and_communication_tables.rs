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
                    .as_enum(FeeStatus::Table)
                    .values([
                        FeeStatus::Pending,
                        FeeStatus::PartiallyPaid,
                        FeeStatus::Paid,
                        FeeStatus::Overdue,
                        FeeStatus::Waived,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(NoticeAudience::Table)
                    .values([
                        NoticeAudience::All,
                        NoticeAudience::Faculty,
                        NoticeAudience::Students,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(ComplaintStatus::Table)
                    .values([
                        ComplaintStatus::Pending,
                        ComplaintStatus::Resolved,
                        ComplaintStatus::Rejected,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Fee::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Fee::FeeId)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()".to_string()),
                    )
                    .col(ColumnDef::new(Fee::StudentId).uuid().not_null())
                    .col(ColumnDef::new(Fee::Description).string().not_null())
                    .col(ColumnDef::new(Fee::Amount).decimal_len(12, 2).not_null())
                    .col(
                        ColumnDef::new(Fee::AmountPaid)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Fee::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(Fee::Status)
                            .enumeration(
                                FeeStatus::Table,
                                [
                                    FeeStatus::Pending,
                                    FeeStatus::PartiallyPaid,
                                    FeeStatus::Paid,
                                    FeeStatus::Overdue,
                                    FeeStatus::Waived,
                                ],
                            )
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Fee::PaidAt).timestamp().null())
                    .col(
                        ColumnDef::new(Fee::CreatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .col(
                        ColumnDef::new(Fee::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .check(Expr::col(Fee::AmountPaid).gte(0))
                    .check(Expr::col(Fee::AmountPaid).lte(Expr::col(Fee::Amount)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fee_student")
                            .from_tbl(Fee::Table)
                            .from_col(Fee::StudentId)
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
                    .name("idx_fee_status")
                    .table(Fee::Table)
                    .col(Fee::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notice::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notice::NoticeId)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()".to_string()),
                    )
                    .col(ColumnDef::new(Notice::Title).string().not_null())
                    .col(ColumnDef::new(Notice::Content).text().not_null())
                    .col(
                        ColumnDef::new(Notice::Audience)
                            .enumeration(
                                NoticeAudience::Table,
                                [
                                    NoticeAudience::All,
                                    NoticeAudience::Faculty,
                                    NoticeAudience::Students,
                                ],
                            )
                            .not_null()
                            .default("all"),
                    )
                    .col(ColumnDef::new(Notice::DepartmentId).uuid().null())
                    .col(ColumnDef::new(Notice::AuthorId).uuid().not_null())
                    .col(
                        ColumnDef::new(Notice::CreatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .col(
                        ColumnDef::new(Notice::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notice_department")
                            .from_tbl(Notice::Table)
                            .from_col(Notice::DepartmentId)
                            .to_tbl(Department::Table)
                            .to_col(Department::DepartmentId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notice_author")
                            .from_tbl(Notice::Table)
                            .from_col(Notice::AuthorId)
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
                    .table(Complaint::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Complaint::ComplaintId)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()".to_string()),
                    )
                    .col(ColumnDef::new(Complaint::StudentId).uuid().not_null())
                    .col(ColumnDef::new(Complaint::DepartmentId).uuid().null())
                    .col(ColumnDef::new(Complaint::Subject).string().not_null())
                    .col(ColumnDef::new(Complaint::Description).text().not_null())
                    .col(
                        ColumnDef::new(Complaint::Status)
                            .enumeration(
                                ComplaintStatus::Table,
                                [
                                    ComplaintStatus::Pending,
                                    ComplaintStatus::Resolved,
                                    ComplaintStatus::Rejected,
                                ],
                            )
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Complaint::Response).text().null())
                    .col(ColumnDef::new(Complaint::ResolvedBy).uuid().null())
                    .col(
                        ColumnDef::new(Complaint::CreatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .col(
                        ColumnDef::new(Complaint::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_complaint_student")
                            .from_tbl(Complaint::Table)
                            .from_col(Complaint::StudentId)
                            .to_tbl(User::Table)
                            .to_col(User::UserId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_complaint_department")
                            .from_tbl(Complaint::Table)
                            .from_col(Complaint::DepartmentId)
                            .to_tbl(Department::Table)
                            .to_col(Department::DepartmentId)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_complaint_status")
                    .table(Complaint::Table)
                    .col(Complaint::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Complaint::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Notice::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Fee::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ComplaintStatus::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(NoticeAudience::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(FeeStatus::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    UserId,
}

#[derive(DeriveIden)]
enum Department {
    Table,
    DepartmentId,
}

#[derive(DeriveIden)]
enum Fee {
    Table,
    FeeId,
    StudentId,
    Description,
    Amount,
    AmountPaid,
    DueDate,
    Status,
    PaidAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Notice {
    Table,
    NoticeId,
    Title,
    Content,
    Audience,
    DepartmentId,
    AuthorId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Complaint {
    Table,
    ComplaintId,
    StudentId,
    DepartmentId,
    Subject,
    Description,
    Status,
    Response,
    ResolvedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FeeStatus {
    Table,
    Pending,
    PartiallyPaid,
    Paid,
    Overdue,
    Waived,
}

#[derive(DeriveIden)]
enum NoticeAudience {
    Table,
    All,
    Faculty,
    Students,
}

#[derive(DeriveIden)]
enum ComplaintStatus {
    Table,
    Pending,
    Resolved,
    Rejected,
}
