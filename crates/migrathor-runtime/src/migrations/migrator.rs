//! Entry point for applying a directory of migrations.

use sqlx::PgPool;
use tracing::debug;

use migrathor_core::error::{ApplyError, MigrationError, Result};
use migrathor_core::migration::{list_available, pending};
use migrathor_core::{Context, MigratorConfig};

use super::executor::MigrationExecutor;
use super::history::{HistoryRecord, HistoryStore};

/// Applied and pending migrations at a point in time.
#[derive(Debug, Clone, Default)]
pub struct MigrationStatus {
    /// History rows in application order.
    pub applied: Vec<HistoryRecord>,
    /// Migrations that `apply` would run, in execution order.
    pub pending: Vec<String>,
}

/// Applies SQL migrations from a directory exactly once each.
///
/// ```ignore
/// let migrator = Migrator::new(MigratorConfig::new("db/migrations"))?;
/// let ctx = Context::with_timeout(Duration::from_secs(300));
/// let applied = migrator.apply(&ctx, &pool).await?;
/// ```
pub struct Migrator {
    config: MigratorConfig,
    history: HistoryStore,
}

impl Migrator {
    pub fn new(config: MigratorConfig) -> Result<Self> {
        config.validate()?;
        let history = HistoryStore::new(&config.history_table);
        Ok(Self { config, history })
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Applies every pending migration in lexicographic filename order.
    ///
    /// Creates the history table on first use. Stops at the first failing
    /// migration; the error carries the migrations applied before it.
    pub async fn apply(
        &self,
        ctx: &Context,
        pool: &PgPool,
    ) -> std::result::Result<Vec<String>, ApplyError> {
        let existed = self
            .history
            .ensure_initialized(ctx, pool, self.config.sink.as_ref())
            .await
            .map_err(ApplyError::discovery)?;
        if !existed {
            self.config.sink.log(&"History table created successfully.");
        }

        let pending = self.pending(ctx, pool).await.map_err(ApplyError::discovery)?;
        if pending.is_empty() {
            debug!("No pending migrations");
            return Ok(Vec::new());
        }

        MigrationExecutor::new(self.history.clone(), self.config.sink.clone())
            .apply_all(ctx, pool, &self.config.path, &pending)
            .await
    }

    /// Reports applied and pending migrations without changing anything.
    ///
    /// A missing history table counts as an empty history.
    pub async fn status(&self, ctx: &Context, pool: &PgPool) -> Result<MigrationStatus> {
        let applied = if self.history.exists(ctx, pool).await? {
            self.history.list_records(ctx, pool).await?
        } else {
            Vec::new()
        };

        let available = list_available(&self.config.path)?;
        let names: Vec<&str> = applied.iter().map(|r| r.migration.as_str()).collect();
        let pending = pending(&available, &names, self.config.matching);

        Ok(MigrationStatus { applied, pending })
    }

    /// Creates an empty migration file and returns its filename.
    ///
    /// ```text
    /// create("create_user_table")
    ///   writes:  migrations/2019_02_25_150455_create_user_table.sql
    ///   returns: 2019_02_25_150455_create_user_table.sql
    /// ```
    ///
    /// The migrations directory is created if it doesn't exist.
    pub fn create(&self, name: &str) -> Result<String> {
        let file = self.config.formatter.format(name);
        let dir = &self.config.path;

        std::fs::create_dir_all(dir).map_err(|e| {
            MigrationError::io(
                format!(
                    "failed to create migrations directory {:?}",
                    dir.display().to_string()
                ),
                e,
            )
        })?;

        let path = dir.join(&file);
        let header = format!(
            "/**\n* Name: {}\n* Date: {}\n*/\n\n",
            name,
            chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        );

        std::fs::write(&path, header).map_err(|e| {
            MigrationError::io(
                format!(
                    "failed to create migration at {:?}",
                    path.display().to_string()
                ),
                e,
            )
        })?;

        debug!("Created migration {}", path.display());
        Ok(file)
    }

    async fn pending(&self, ctx: &Context, pool: &PgPool) -> Result<Vec<String>> {
        let available = list_available(&self.config.path)?;
        let applied = self.history.list_applied(ctx, pool).await?;
        debug!("Already applied migrations: {:?}", applied);

        Ok(pending(&available, &applied, self.config.matching))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrathor_core::MemorySink;
    use tempfile::TempDir;

    #[test]
    fn test_new_rejects_bad_table() {
        let config = MigratorConfig::default().with_history_table("drop table");
        assert!(matches!(
            Migrator::new(config),
            Err(MigrationError::Config(_))
        ));
    }

    #[test]
    fn test_create_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("migrations");
        let migrator = Migrator::new(
            MigratorConfig::new(&path).with_formatter(|name: &str| format!("0001_{}.sql", name)),
        )
        .unwrap();

        let file = migrator.create("stuff").unwrap();
        assert_eq!(file, "0001_stuff.sql");

        let meta = std::fs::metadata(path.join(&file)).unwrap();
        assert!(meta.is_file());

        let content = std::fs::read_to_string(path.join(&file)).unwrap();
        assert!(content.starts_with("/**\n* Name: stuff\n* Date: "));
        assert!(content.ends_with("*/\n\n"));
    }

    #[test]
    fn test_create_default_formatter() {
        let dir = TempDir::new().unwrap();
        let migrator = Migrator::new(
            MigratorConfig::new(dir.path()).with_sink(MemorySink::new()),
        )
        .unwrap();

        let file = migrator.create("Add_Users").unwrap();
        assert!(file.ends_with("_add_users.sql"), "unexpected filename {}", file);
        assert!(dir.path().join(&file).is_file());
    }
}
