//! migrathor - forward-only SQL migrations for PostgreSQL
//!
//! Applies a directory of `.sql` files exactly once each, in filename order,
//! and records every applied file in a history table.
//!
//! ```ignore
//! use migrathor::prelude::*;
//!
//! let config = MigrathorConfig::from_file("migrathor.toml")?;
//! let db = Database::from_config(&config.database).await?;
//! let migrator = Migrator::new(config.migrator_config()?)?;
//!
//! let ctx = Context::with_timeout(config.migrations.apply_timeout());
//! let applied = migrator.apply(&ctx, db.pool()).await?;
//! ```

#[doc(hidden)]
pub use migrathor_core;
#[doc(hidden)]
pub use migrathor_runtime;

pub use migrathor_core::{
    ApplyError, Context, DatabaseConfig, FilenameFormatter, LogSink, MemorySink, MigrathorConfig,
    MigrationError, MigratorConfig, NameMatching, NullSink, TimestampFormatter, TracingSink,
};
pub use migrathor_runtime::{
    describe_driver_error, Database, HistoryRecord, MigrationStatus, Migrator,
};

/// Everything needed to configure and run a migrator.
pub mod prelude {
    pub use migrathor_core::{
        ApplyError, Context, MigrathorConfig, MigrationError, MigratorConfig, NameMatching,
        Result,
    };
    pub use migrathor_runtime::{Database, MigrationStatus, Migrator};
}
