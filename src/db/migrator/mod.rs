use sea_orm_migration::prelude::*;

mod m20250101_initial;
mod m20250115_add_activity_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_initial::Migration),
            Box::new(m20250115_add_activity_logs::Migration),
        ]
    }
}
