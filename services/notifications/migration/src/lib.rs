use sea_orm_migration::prelude::*;

mod m20260101_000001_create_documents;
mod m20260101_000002_create_queue_messages;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_documents::Migration),
            Box::new(m20260101_000002_create_queue_messages::Migration),
        ]
    }
}
