//! Migration files on disk: discovery, pending-set computation and naming.

mod file;
mod formatter;
mod reconcile;
mod scanner;

pub use file::{MigrationFile, TransactionMode, NO_TRANSACTION_MARKER};
pub use formatter::{FilenameFormatter, TimestampFormatter, DEFAULT_TIMESTAMP_FORMAT};
pub use reconcile::{pending, NameMatching};
pub use scanner::list_available;
