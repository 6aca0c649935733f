mod database;
mod migrator;

pub use database::DatabaseConfig;
pub use migrator::{MigratorConfig, DEFAULT_HISTORY_TABLE, DEFAULT_MIGRATIONS_PATH};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MigrationError, Result};
use crate::migration::{NameMatching, TimestampFormatter, DEFAULT_TIMESTAMP_FORMAT};

/// Root configuration, usually loaded from `migrathor.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrathorConfig {
    /// Migration discovery and history settings.
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl MigrathorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MigrationError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let content = substitute_env_vars(content);

        toml::from_str(&content)
            .map_err(|e| MigrationError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Build the migrator settings described by this file.
    pub fn migrator_config(&self) -> Result<MigratorConfig> {
        let formatter = TimestampFormatter::parse(&self.migrations.timestamp_format)?;
        let config = MigratorConfig::new(&self.migrations.path)
            .with_history_table(&self.migrations.table)
            .with_formatter(formatter)
            .with_matching(self.migrations.matching);
        config.validate()?;
        Ok(config)
    }
}

/// `[migrations]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationsConfig {
    /// Directory holding the migration files.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// History table name.
    #[serde(default = "default_table")]
    pub table: String,

    /// chrono layout for the timestamp prefix of new migration files.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// How files are matched against history entries.
    #[serde(default)]
    pub matching: NameMatching,

    /// Upper bound for a whole `migrate` run in seconds.
    #[serde(default = "default_apply_timeout")]
    pub apply_timeout_secs: u64,
}

impl MigrationsConfig {
    pub fn apply_timeout(&self) -> Duration {
        Duration::from_secs(self.apply_timeout_secs)
    }
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            table: default_table(),
            timestamp_format: default_timestamp_format(),
            matching: NameMatching::default(),
            apply_timeout_secs: default_apply_timeout(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_MIGRATIONS_PATH)
}

fn default_table() -> String {
    DEFAULT_HISTORY_TABLE.to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_apply_timeout() -> u64 {
    300 // 5 minutes
}

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid regex");

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
