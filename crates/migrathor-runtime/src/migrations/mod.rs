mod executor;
mod history;
mod migrator;
mod transaction;

pub use executor::{AppliedMigration, MigrationExecutor, Outcome};
pub use history::{HistoryRecord, HistoryStore};
pub use migrator::{MigrationStatus, Migrator};
pub use transaction::{transaction, TxFuture};
