pub use sea_orm_migration::prelude::*;

mod m20250301_000001_marketing_pipeline;
mod m20250301_000002_management_pipeline;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_marketing_pipeline::Migration),
            Box::new(m20250301_000002_management_pipeline::Migration),
        ]
    }
}
