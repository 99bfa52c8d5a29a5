pub use sea_orm_migration::prelude::*;

mod m20250901_000001_create_core_tables;
mod m20250901_000002_create_academic_tables;
mod m20250901_000003_create_finance_and_communication_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_core_tables::Migration),
            Box::new(m20250901_000002_create_academic_tables::Migration),
            Box::new(m20250901_000003_create_finance_and_communication_tables::Migration),
        ]
    }
}
