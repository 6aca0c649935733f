use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::{Connection, PgConnection, PgPool};
use tracing::{debug, info, warn};

use migrathor_core::error::{ApplyError, MigrationError, Result};
use migrathor_core::{Context, LogSink, MigrationFile, TransactionMode};

use super::history::HistoryStore;
use super::transaction::transaction;

/// Upper bound for delivering a cancel request for an interrupted file.
const CANCEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Final state of one successfully applied migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Content and history row were committed together.
    Committed,
    /// Content and history row were executed without a transaction.
    Applied,
}

/// A migration applied during this run.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub name: String,
    pub outcome: Outcome,
    /// Time spent executing the migration content.
    pub execution_time: Duration,
}

/// Executes migration files and records them in the history table.
pub struct MigrationExecutor {
    history: HistoryStore,
    sink: Arc<dyn LogSink>,
}

impl MigrationExecutor {
    pub fn new(history: HistoryStore, sink: Arc<dyn LogSink>) -> Self {
        Self { history, sink }
    }

    /// Applies `pending` from `dir` in the given order.
    ///
    /// Stops at the first failure. The error carries the names applied before
    /// it; those stay committed.
    pub async fn apply_all(
        &self,
        ctx: &Context,
        pool: &PgPool,
        dir: &Path,
        pending: &[String],
    ) -> std::result::Result<Vec<String>, ApplyError> {
        let mut applied = Vec::with_capacity(pending.len());

        for name in pending {
            let result = match MigrationFile::load(dir, name) {
                Ok(file) => self.apply(ctx, pool, &file).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(done) => applied.push(done.name),
                Err(source) => {
                    return Err(ApplyError {
                        applied,
                        failed: Some(name.clone()),
                        source,
                    })
                }
            }
        }

        Ok(applied)
    }

    /// Applies a single migration, honoring its transaction marker.
    pub async fn apply(
        &self,
        ctx: &Context,
        pool: &PgPool,
        file: &MigrationFile,
    ) -> Result<AppliedMigration> {
        info!("Applying migration: {}", file.name);

        let (outcome, execution_time) = match file.mode() {
            TransactionMode::Transactional => {
                let elapsed = self.apply_in_transaction(ctx, pool, file).await?;
                (Outcome::Committed, elapsed)
            }
            TransactionMode::NoTransaction => {
                warn!(
                    "Migration {} opted out of transactions; a failure may leave it partially applied",
                    file.name
                );
                let elapsed = self.apply_without_transaction(ctx, pool, file).await?;
                (Outcome::Applied, elapsed)
            }
        };

        info!(
            "Migration applied: {} ({:.3}s)",
            file.name,
            execution_time.as_secs_f64()
        );

        Ok(AppliedMigration {
            name: file.name.clone(),
            outcome,
            execution_time,
        })
    }

    async fn apply_in_transaction(
        &self,
        ctx: &Context,
        pool: &PgPool,
        file: &MigrationFile,
    ) -> Result<Duration> {
        let scope = ctx.clone();
        let history = self.history.clone();
        let file = file.clone();
        let cancel_pool = pool.clone();
        let sink = self.sink.clone();

        transaction(ctx, pool, self.sink.as_ref(), move |conn| {
            Box::pin(async move {
                let elapsed =
                    execute_script(&scope, &cancel_pool, &mut *conn, &file, sink.as_ref()).await?;
                history
                    .record_applied(&scope, &mut *conn, &file.name, elapsed)
                    .await?;
                Ok(elapsed)
            })
        })
        .await
    }

    async fn apply_without_transaction(
        &self,
        ctx: &Context,
        pool: &PgPool,
        file: &MigrationFile,
    ) -> Result<Duration> {
        let mut conn = ctx
            .run("acquire connection", async {
                pool.acquire()
                    .await
                    .map_err(|e| MigrationError::driver("failed to acquire db connection", e))
            })
            .await?;

        let elapsed = execute_script(ctx, pool, &mut *conn, file, self.sink.as_ref()).await?;
        // The content is applied at this point. The insert is not bounded by
        // the context; if it fails the migration stays applied but unrecorded.
        self.history
            .record_applied(&Context::new(), &mut *conn, &file.name, elapsed)
            .await?;
        Ok(elapsed)
    }
}

/// Executes the whole file as one batch and returns how long it took.
///
/// When the context ends first the statement is cancelled on the server and
/// awaited, so an interrupted file never keeps running in the background. A
/// file that finished before the cancel arrived counts as executed.
async fn execute_script(
    ctx: &Context,
    pool: &PgPool,
    conn: &mut PgConnection,
    file: &MigrationFile,
    sink: &dyn LogSink,
) -> Result<Duration> {
    let op = format!("execute {}", file.name);
    let pid = ctx
        .run(&op, async {
            sqlx::query_scalar::<_, i32>("SELECT pg_backend_pid()")
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| MigrationError::driver("failed to query backend pid", e))
        })
        .await?;

    let start = Instant::now();
    let script = async {
        sqlx::raw_sql(&file.sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                MigrationError::driver(
                    format!("failed to execute SQL script {}", file.path.display()),
                    e,
                )
            })
    };
    tokio::pin!(script);

    // The script goes first so it is always sent before an interrupt is seen
    let interrupt = tokio::select! {
        biased;
        result = &mut script => return result.map(|_| start.elapsed()),
        err = ctx.done(&op) => err,
    };

    warn!("{}, cancelling statement on backend {}", interrupt, pid);
    cancel_backend(pool, pid, sink).await;

    match script.await {
        Ok(_) => Ok(start.elapsed()),
        Err(_) => Err(interrupt),
    }
}

/// Asks the server to cancel whatever backend `pid` is running. Uses its own
/// connection so an exhausted pool cannot hold the request up.
async fn cancel_backend(pool: &PgPool, pid: i32, sink: &dyn LogSink) {
    let options = pool.connect_options();
    let cancel = async {
        let mut conn = PgConnection::connect_with(&options).await?;
        let cancelled = sqlx::query_scalar::<_, bool>("SELECT pg_cancel_backend($1)")
            .bind(pid)
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok::<_, sqlx::Error>(cancelled)
    };

    match tokio::time::timeout(CANCEL_TIMEOUT, cancel).await {
        Ok(Ok(cancelled)) => debug!("Cancel request for backend {} accepted: {}", pid, cancelled),
        Ok(Err(e)) => sink.log(&format_args!("failed to cancel running statement: {}", e)),
        Err(_) => sink.log(&"failed to cancel running statement: timed out"),
    }
}
