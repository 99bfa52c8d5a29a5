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
                    .as_enum(RoleEnum::Table)
                    .values([
                        RoleEnum::Principal,
                        RoleEnum::Hod,
                        RoleEnum::Faculty,
                        RoleEnum::Student,
                    ])
                    .to_owned(),
            )
            .await?;

        // hod_id gets its foreign key once the user table exists
        manager
            .create_table(
                Table::create()
                    .table(Department::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Department::DepartmentId)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()".to_string()),
                    )
                    .col(ColumnDef::new(Department::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Department::Code).string().not_null().unique_key())
                    .col(ColumnDef::new(Department::Description).text().null())
                    .col(ColumnDef::new(Department::HodId).uuid().null())
                    .col(
                        ColumnDef::new(Department::CreatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .col(
                        ColumnDef::new(Department::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::UserId)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()".to_string()),
                    )
                    .col(ColumnDef::new(User::FirebaseUid).string().not_null().unique_key())
                    .col(ColumnDef::new(User::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(User::Name).string().not_null())
                    .col(
                        ColumnDef::new(User::Role)
                            .enumeration(
                                RoleEnum::Table,
                                [
                                    RoleEnum::Principal,
                                    RoleEnum::Hod,
                                    RoleEnum::Faculty,
                                    RoleEnum::Student,
                                ],
                            )
                            .not_null(),
                    )
                    .col(ColumnDef::new(User::DepartmentId).uuid().null())
                    .col(ColumnDef::new(User::Phone).string().null())
                    .col(ColumnDef::new(User::RollNumber).string().null().unique_key())
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .col(
                        ColumnDef::new(User::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_department")
                            .from_tbl(User::Table)
                            .from_col(User::DepartmentId)
                            .to_tbl(Department::Table)
                            .to_col(Department::DepartmentId)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_department_hod")
                    .from_tbl(Department::Table)
                    .from_col(Department::HodId)
                    .to_tbl(User::Table)
                    .to_col(User::UserId)
                    .on_delete(ForeignKeyAction::SetNull)
                    .on_update(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_role")
                    .table(User::Table)
                    .col(User::Role)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_department_id")
                    .table(User::Table)
                    .col(User::DepartmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CollegeSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CollegeSettings::SettingsId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CollegeSettings::CollegeName).string().not_null())
                    .col(ColumnDef::new(CollegeSettings::Address).text().null())
                    .col(ColumnDef::new(CollegeSettings::ContactEmail).string().null())
                    .col(ColumnDef::new(CollegeSettings::ContactPhone).string().null())
                    .col(ColumnDef::new(CollegeSettings::Website).string().null())
                    .col(
                        ColumnDef::new(CollegeSettings::CurrentAcademicYear)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CollegeSettings::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CollegeSettings::Table).to_owned())
            .await?;

        manager
            .drop_foreign_key(
                ForeignKey::drop()
                    .name("fk_department_hod")
                    .table(Department::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Department::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(RoleEnum::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Department {
    Table,
    DepartmentId,
    Name,
    Code,
    Description,
    HodId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User {
    Table,
    UserId,
    FirebaseUid,
    Email,
    Name,
    Role,
    DepartmentId,
    Phone,
    RollNumber,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CollegeSettings {
    Table,
    SettingsId,
    CollegeName,
    Address,
    ContactEmail,
    ContactPhone,
    Website,
    CurrentAcademicYear,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RoleEnum {
    Table,
    Principal,
    Hod,
    Faculty,
    Student,
}
