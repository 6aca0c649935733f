//! History table access.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use tracing::debug;

use migrathor_core::error::{MigrationError, Result};
use migrathor_core::{Context, LogSink};

use super::transaction::transaction;

/// A row of the history table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRecord {
    pub id: i32,
    /// Migration filename.
    pub migration: String,
    pub applied_at: DateTime<Utc>,
    /// Time spent executing the migration content, in seconds.
    pub execution_time: f32,
}

impl HistoryRecord {
    pub fn execution_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.execution_time).unwrap_or_default()
    }
}

/// Reads and writes the ledger of applied migrations.
///
/// The table name is spliced into the statements, so it must have passed
/// `MigratorConfig::validate` before it gets here.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    table: String,
}

impl HistoryStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether the history table exists in the current schema.
    pub async fn exists(&self, ctx: &Context, pool: &PgPool) -> Result<bool> {
        let cmd = r#"
SELECT EXISTS (
    SELECT 1
    FROM pg_tables
    WHERE schemaname = current_schema()
    AND tablename = $1
)"#;

        ctx.run("check history table", async {
            match sqlx::query_scalar::<_, bool>(cmd)
                .bind(&self.table)
                .fetch_one(pool)
                .await
            {
                Ok(exists) => Ok(exists),
                Err(sqlx::Error::RowNotFound) => Ok(false),
                Err(e) => Err(MigrationError::driver(
                    "failed to verify existence of history table",
                    e,
                )),
            }
        })
        .await
    }

    /// Creates the history table unless it already exists.
    ///
    /// Returns whether the table was already there.
    pub async fn ensure_initialized(
        &self,
        ctx: &Context,
        pool: &PgPool,
        sink: &dyn LogSink,
    ) -> Result<bool> {
        if self.exists(ctx, pool).await? {
            return Ok(true);
        }

        let cmd = format!(
            r#"
CREATE TABLE IF NOT EXISTS {} (
    id integer PRIMARY KEY GENERATED ALWAYS AS IDENTITY,
    migration TEXT NOT NULL UNIQUE,
    applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    execution_time REAL NOT NULL
)"#,
            self.table
        );

        let scope = ctx.clone();
        transaction(ctx, pool, sink, move |conn| {
            Box::pin(async move {
                scope.run("create history table", async {
                    sqlx::query(&cmd)
                        .execute(&mut *conn)
                        .await
                        .map_err(|e| MigrationError::driver("failed to create history table", e))
                })
                .await?;
                Ok(())
            })
        })
        .await?;

        debug!("Created history table {}", self.table);
        Ok(false)
    }

    /// Names of applied migrations in the order they were applied.
    pub async fn list_applied(&self, ctx: &Context, pool: &PgPool) -> Result<Vec<String>> {
        let cmd = format!("SELECT migration FROM {} ORDER BY id ASC", self.table);

        ctx.run("list applied migrations", async {
            sqlx::query_scalar::<_, String>(&cmd)
                .fetch_all(pool)
                .await
                .map_err(|e| MigrationError::driver("failed to query applied migrations", e))
        })
        .await
    }

    /// Full history rows in the order they were applied.
    pub async fn list_records(&self, ctx: &Context, pool: &PgPool) -> Result<Vec<HistoryRecord>> {
        let cmd = format!(
            "SELECT id, migration, applied_at, execution_time FROM {} ORDER BY id ASC",
            self.table
        );

        ctx.run("list history records", async {
            sqlx::query_as::<_, HistoryRecord>(&cmd)
                .fetch_all(pool)
                .await
                .map_err(|e| MigrationError::driver("failed to query history records", e))
        })
        .await
    }

    /// Records `name` as applied.
    ///
    /// Runs on whatever `executor` is given: an open transaction for
    /// transactional migrations, the pool otherwise. A name that is already
    /// recorded fails with `MigrationError::DuplicateKey`.
    pub async fn record_applied<'c, E>(
        &self,
        ctx: &Context,
        executor: E,
        name: &str,
        duration: Duration,
    ) -> Result<()>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let cmd = format!(
            "INSERT INTO {} (migration, execution_time) VALUES ($1, $2)",
            self.table
        );

        ctx.run("record applied migration", async {
            sqlx::query(&cmd)
                .bind(name)
                .bind(duration.as_secs_f32())
                .execute(executor)
                .await
                .map_err(|e| {
                    let duplicate =
                        matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
                    if duplicate {
                        MigrationError::DuplicateKey {
                            name: name.to_string(),
                            source: e,
                        }
                    } else {
                        MigrationError::driver(
                            format!("failed to execute SQL statement {:?}", cmd),
                            e,
                        )
                    }
                })?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_duration() {
        let record = HistoryRecord {
            id: 1,
            migration: "a.sql".into(),
            applied_at: Utc::now(),
            execution_time: 1.5,
        };
        assert_eq!(record.execution_duration(), Duration::from_millis(1500));

        let broken = HistoryRecord {
            execution_time: -1.0,
            ..record
        };
        assert_eq!(broken.execution_duration(), Duration::ZERO);
    }

    #[test]
    fn test_store_table() {
        assert_eq!(HistoryStore::new("schema_history").table(), "schema_history");
    }
}
