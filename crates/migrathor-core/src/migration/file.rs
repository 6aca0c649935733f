use std::path::{Path, PathBuf};

use crate::error::{MigrationError, Result};

/// First-line directive that disables transactional wrapping for one file.
pub const NO_TRANSACTION_MARKER: &str = "-- migrathor:no_transaction";

/// How a migration file is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Content and history insert commit or roll back together.
    Transactional,
    /// Content and history insert run as two independent statements.
    NoTransaction,
}

impl TransactionMode {
    /// Inspects the first non-blank line of `sql` for the opt-out marker.
    ///
    /// The marker only counts when it is the whole first line. The same text
    /// anywhere else has no effect.
    pub fn detect(sql: &str) -> Self {
        let first_line = sql.trim_start().lines().next().unwrap_or_default().trim();
        if first_line == NO_TRANSACTION_MARKER {
            TransactionMode::NoTransaction
        } else {
            TransactionMode::Transactional
        }
    }

    pub fn is_transactional(self) -> bool {
        self == TransactionMode::Transactional
    }
}

/// A migration file loaded from the migrations directory.
#[derive(Debug, Clone)]
pub struct MigrationFile {
    /// Filename, which is also the identity recorded in the history table.
    pub name: String,
    /// Full path the content was read from.
    pub path: PathBuf,
    /// Raw SQL content.
    pub sql: String,
}

impl MigrationFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            sql: sql.into(),
        }
    }

    /// Reads `name` from `dir`.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(name);
        let sql = std::fs::read_to_string(&path).map_err(|e| {
            MigrationError::io(
                format!("failed to read file contents of {:?}", path.display().to_string()),
                e,
            )
        })?;

        Ok(Self::new(name, path, sql))
    }

    pub fn mode(&self) -> TransactionMode {
        TransactionMode::detect(&self.sql)
    }
}
