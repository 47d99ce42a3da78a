//! Database migrations for the Meetings service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_090000_create_users;
mod m2025_01_06_090100_create_meetings;
mod m2025_01_06_090200_create_tasks;
mod m2025_01_20_140000_create_events;
mod m2025_01_20_140100_create_invitations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_090000_create_users::Migration),
            Box::new(m2025_01_06_090100_create_meetings::Migration),
            Box::new(m2025_01_06_090200_create_tasks::Migration),
            Box::new(m2025_01_20_140000_create_events::Migration),
            Box::new(m2025_01_20_140100_create_invitations::Migration),
        ]
    }
}
