use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::error::{MigrationError, Result};
use crate::log::{LogSink, TracingSink};
use crate::migration::{FilenameFormatter, NameMatching, TimestampFormatter};

/// Default name of the history table.
pub const DEFAULT_HISTORY_TABLE: &str = "migrations";

/// Default migrations directory.
pub const DEFAULT_MIGRATIONS_PATH: &str = "migrations";

// Lowercase only, so the name matches what `pg_tables` reports for an
// unquoted identifier.
static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("valid regex"));

/// Settings for a `Migrator`.
///
/// | field | default |
/// |---|---|
/// | `path` | `migrations` |
/// | `history_table` | `migrations` |
/// | `formatter` | [`TimestampFormatter`] (`%Y_%m_%d_%H%M%S`) |
/// | `sink` | [`TracingSink`] |
/// | `matching` | [`NameMatching::CaseInsensitive`] |
#[derive(Clone)]
pub struct MigratorConfig {
    /// Directory holding the `.sql` files. An empty path means `.`.
    pub path: PathBuf,
    /// Name of the table recording applied migrations.
    pub history_table: String,
    /// Filename policy for newly created migrations.
    pub formatter: Arc<dyn FilenameFormatter>,
    /// Receiver of operator-facing messages.
    pub sink: Arc<dyn LogSink>,
    /// How available files are matched against history entries.
    pub matching: NameMatching,
}

impl MigratorConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut path = path.into();
        if path.as_os_str().is_empty() {
            path = PathBuf::from(".");
        }
        Self {
            path,
            ..Self::default()
        }
    }

    pub fn with_history_table(mut self, table: impl Into<String>) -> Self {
        self.history_table = table.into();
        self
    }

    pub fn with_formatter(mut self, formatter: impl FilenameFormatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn with_matching(mut self, matching: NameMatching) -> Self {
        self.matching = matching;
        self
    }

    /// Checks that the history table name can be spliced into SQL safely.
    pub fn validate(&self) -> Result<()> {
        if !TABLE_NAME.is_match(&self.history_table) {
            return Err(MigrationError::Config(format!(
                "invalid history table name {:?}: expected a lowercase identifier",
                self.history_table
            )));
        }
        Ok(())
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MIGRATIONS_PATH),
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
            formatter: Arc::new(TimestampFormatter::default()),
            sink: Arc::new(TracingSink),
            matching: NameMatching::default(),
        }
    }
}

impl fmt::Debug for MigratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigratorConfig")
            .field("path", &self.path)
            .field("history_table", &self.history_table)
            .field("matching", &self.matching)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemorySink;

    #[test]
    fn test_defaults() {
        let config = MigratorConfig::default();
        assert_eq!(config.path, PathBuf::from("migrations"));
        assert_eq!(config.history_table, "migrations");
        assert_eq!(config.matching, NameMatching::CaseInsensitive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_path_is_current_dir() {
        let config = MigratorConfig::new("");
        assert_eq!(config.path, PathBuf::from("."));
    }

    #[test]
    fn test_builder_overrides() {
        let sink = MemorySink::new();
        let config = MigratorConfig::new("db/migrations")
            .with_history_table("schema_history")
            .with_formatter(|name: &str| format!("{}.sql", name))
            .with_sink(sink.clone())
            .with_matching(NameMatching::CaseSensitive);

        assert_eq!(config.path, PathBuf::from("db/migrations"));
        assert_eq!(config.history_table, "schema_history");
        assert_eq!(config.formatter.format("init"), "init.sql");
        assert_eq!(config.matching, NameMatching::CaseSensitive);

        config.sink.log(&"hello");
        assert_eq!(sink.messages(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_validate_rejects_unsafe_table_names() {
        for name in ["", "1migrations", "Migrations", "mig; DROP TABLE x", "public.migrations"] {
            let config = MigratorConfig::default().with_history_table(name);
            assert!(config.validate().is_err(), "{:?} should be rejected", name);
        }
        let config = MigratorConfig::default().with_history_table("_schema_history_2");
        assert!(config.validate().is_ok());
    }
}
