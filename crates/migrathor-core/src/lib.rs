pub mod config;
pub mod context;
pub mod error;
pub mod log;
pub mod migration;

pub use config::{DatabaseConfig, MigrathorConfig, MigratorConfig};
pub use context::Context;
pub use error::{ApplyError, MigrationError, Result};
pub use log::{LogSink, MemorySink, NullSink, TracingSink};
pub use migration::{
    FilenameFormatter, MigrationFile, NameMatching, TimestampFormatter, TransactionMode,
    NO_TRANSACTION_MARKER,
};
