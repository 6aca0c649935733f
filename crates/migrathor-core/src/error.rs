use thiserror::Error;

/// Core error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The migrations directory or a migration file could not be read or written.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Any error raised by the database layer. The original driver error is
    /// kept as the source.
    #[error("{info}: {source}")]
    Driver {
        info: String,
        #[source]
        source: sqlx::Error,
    },

    /// The history table already holds a row for this migration.
    #[error("migration {name:?} is already recorded in the history table: {source}")]
    DuplicateKey {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MigrationError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        MigrationError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn driver(info: impl Into<String>, source: sqlx::Error) -> Self {
        MigrationError::Driver {
            info: info.into(),
            source,
        }
    }

    /// Returns the underlying driver error, if this error came from the database.
    pub fn driver_error(&self) -> Option<&sqlx::Error> {
        match self {
            MigrationError::Driver { source, .. } | MigrationError::DuplicateKey { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Whether the context stopped the operation rather than the database.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            MigrationError::Cancelled(_) | MigrationError::DeadlineExceeded(_)
        )
    }
}

/// Result type alias using MigrationError.
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Failure of an `apply` run.
///
/// Carries the migrations that were applied before the failure so callers can
/// report partial progress. Everything in `applied` is committed.
#[derive(Error, Debug)]
#[error("{}{source}", failed_prefix(.failed))]
pub struct ApplyError {
    /// Migrations applied during this run before the failure, in order.
    pub applied: Vec<String>,
    /// The migration that failed, `None` when the run failed during discovery.
    pub failed: Option<String>,
    #[source]
    pub source: MigrationError,
}

impl ApplyError {
    /// Failure before any migration was attempted.
    pub fn discovery(source: MigrationError) -> Self {
        Self {
            applied: Vec::new(),
            failed: None,
            source,
        }
    }

    pub fn driver_error(&self) -> Option<&sqlx::Error> {
        self.source.driver_error()
    }
}

fn failed_prefix(failed: &Option<String>) -> String {
    match failed {
        Some(name) => format!("migration {}: ", name),
        None => String::new(),
    }
}
