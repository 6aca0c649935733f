pub mod db;
pub mod migrations;

pub use db::{describe_driver_error, Database};
pub use migrations::{
    AppliedMigration, HistoryRecord, HistoryStore, MigrationExecutor, MigrationStatus, Migrator,
    Outcome,
};
