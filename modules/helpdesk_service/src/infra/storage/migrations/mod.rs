//! Database migrations for the helpdesk service
//!
//! Ids of uuid-keyed tables are stored as text. Timestamps carry no database
//! default; the executor stamps them on write.

use sea_orm_migration::prelude::*;

mod m20250301_000001_create_profiles;
mod m20250301_000002_create_tickets;
mod m20250301_000003_create_chats;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_profiles::Migration),
            Box::new(m20250301_000002_create_tickets::Migration),
            Box::new(m20250301_000003_create_chats::Migration),
        ]
    }
}
