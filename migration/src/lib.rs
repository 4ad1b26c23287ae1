pub use sea_orm_migration::prelude::*;

mod m20260110_000001_create_sync_schema;
mod m20260110_000002_seed_plate_maps;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_000001_create_sync_schema::Migration),
            Box::new(m20260110_000002_seed_plate_maps::Migration),
        ]
    }
}
