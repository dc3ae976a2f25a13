//! Migrator registering entity-specific migrations in dependency order.
pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_author;
mod m20250301_000002_create_post;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_author::Migration),
            // `post` references `author`, keep it after
            Box::new(m20250301_000002_create_post::Migration),
        ]
    }
}
