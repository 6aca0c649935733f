use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;

use migrathor_core::MigrathorConfig;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "migrathor.toml";

/// Flags shared by every command.
///
/// Each flag overrides the matching key of the configuration file and falls
/// back to a `MIGRATHOR_*` environment variable.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Configuration file path [default: migrathor.toml, if present].
    #[arg(short, long, env = "MIGRATHOR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Migrations directory.
    #[arg(long, env = "MIGRATHOR_PATH", global = true)]
    pub path: Option<PathBuf>,

    /// History table name.
    #[arg(long, env = "MIGRATHOR_TABLE", global = true)]
    pub table: Option<String>,

    /// Full connection URL. Wins over the individual connection flags.
    #[arg(long, env = "MIGRATHOR_URL", global = true, hide_env_values = true)]
    pub url: Option<String>,

    /// Database server host.
    #[arg(long, env = "MIGRATHOR_HOST", global = true)]
    pub host: Option<String>,

    /// Database server port.
    #[arg(long, env = "MIGRATHOR_PORT", global = true)]
    pub port: Option<u16>,

    /// Database name.
    #[arg(long = "name", id = "db_name", env = "MIGRATHOR_NAME", global = true)]
    pub db_name: Option<String>,

    /// Database user.
    #[arg(long, env = "MIGRATHOR_USER", global = true)]
    pub user: Option<String>,

    /// Database password.
    #[arg(long = "pass", env = "MIGRATHOR_PASS", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// SSL mode (disable, allow, prefer, require, verify-ca, verify-full).
    #[arg(long, env = "MIGRATHOR_SSLMODE", global = true)]
    pub sslmode: Option<String>,

    /// PEM encoded client certificate file.
    #[arg(long, env = "MIGRATHOR_SSLCERT", global = true)]
    pub sslcert: Option<String>,

    /// PEM encoded client key file.
    #[arg(long, env = "MIGRATHOR_SSLKEY", global = true)]
    pub sslkey: Option<String>,

    /// PEM encoded root certificate file.
    #[arg(long, env = "MIGRATHOR_SSLROOTCERT", global = true)]
    pub sslrootcert: Option<String>,

    /// Upper bound for a whole run, in seconds.
    #[arg(long, env = "MIGRATHOR_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Loads the configuration file and applies the flags on top of it.
    ///
    /// A missing default file means built-in defaults; a missing file given
    /// explicitly is an error.
    pub fn load_config(&self) -> Result<MigrathorConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                read_config(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => MigrathorConfig::default(),
        };

        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut MigrathorConfig) {
        let migrations = &mut config.migrations;
        if let Some(path) = &self.path {
            migrations.path = path.clone();
        }
        if let Some(table) = &self.table {
            migrations.table = table.clone();
        }
        if let Some(timeout) = self.timeout {
            migrations.apply_timeout_secs = timeout;
        }

        let db = &mut config.database;
        if let Some(url) = &self.url {
            db.url = Some(url.clone());
        }
        if let Some(host) = &self.host {
            db.host = host.clone();
        }
        if let Some(port) = self.port {
            db.port = port;
        }
        if let Some(name) = &self.db_name {
            db.name = name.clone();
        }
        if let Some(user) = &self.user {
            db.user = user.clone();
        }
        if let Some(password) = &self.password {
            db.password = password.clone();
        }
        if let Some(sslmode) = &self.sslmode {
            db.sslmode = sslmode.clone();
        }
        if self.sslcert.is_some() {
            db.sslcert = self.sslcert.clone();
        }
        if self.sslkey.is_some() {
            db.sslkey = self.sslkey.clone();
        }
        if self.sslrootcert.is_some() {
            db.sslrootcert = self.sslrootcert.clone();
        }
    }

    /// Installs the tracing subscriber. `RUST_LOG` wins over `--verbose`.
    pub fn init_tracing(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                std::env::var("RUST_LOG").unwrap_or_else(|_| self.log_level().to_string()),
            )
            .with_writer(std::io::stderr)
            .try_init();
    }

    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

fn read_config(path: &Path) -> Result<MigrathorConfig> {
    MigrathorConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("migrathor.toml");
        std::fs::write(
            &file,
            r#"
[migrations]
path = "db/migrations"
table = "schema_history"

[database]
host = "db.internal"
port = 6543
name = "shop"
"#,
        )
        .unwrap();

        let args = GlobalArgs {
            config: Some(file),
            table: Some("other_history".into()),
            port: Some(5433),
            timeout: Some(30),
            ..Default::default()
        };

        let config = args.load_config().unwrap();
        assert_eq!(config.migrations.path, PathBuf::from("db/migrations"));
        assert_eq!(config.migrations.table, "other_history");
        assert_eq!(config.migrations.apply_timeout_secs, 30);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 5433);
        assert_eq!(config.database.name, "shop");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = GlobalArgs {
            config: Some(dir.path().join("absent.toml")),
            ..Default::default()
        };

        let err = args.load_config().unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(GlobalArgs::default().log_level(), "info");
        let verbose = GlobalArgs {
            verbose: true,
            ..Default::default()
        };
        assert_eq!(verbose.log_level(), "debug");
    }

    #[test]
    fn test_ssl_flags() {
        let args = GlobalArgs {
            config: Some(PathBuf::from("/nonexistent/migrathor.toml")),
            ..Default::default()
        };
        assert!(args.load_config().is_err());

        let mut config = MigrathorConfig::default();
        let args = GlobalArgs {
            sslmode: Some("verify-full".into()),
            sslrootcert: Some("/etc/ssl/root.pem".into()),
            ..Default::default()
        };
        args.apply_overrides(&mut config);
        assert_eq!(config.database.sslmode, "verify-full");
        assert_eq!(config.database.sslrootcert.as_deref(), Some("/etc/ssl/root.pem"));
        assert_eq!(config.database.sslcert, None);
    }
}
