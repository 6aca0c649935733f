//! Scoped transactions.
//!
//! A unit of work runs against an open transaction which is committed when the
//! work succeeds and rolled back when it fails or panics. A panic is re-raised
//! after the rollback attempt.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures::FutureExt;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use migrathor_core::error::{MigrationError, Result};
use migrathor_core::{Context, LogSink};

/// Future returned by a unit of work. Borrows the transaction connection.
///
/// Not `Send`: the work runs on the task that called `transaction`.
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T>> + 't>>;

/// Runs `work` inside a transaction on `pool`.
///
/// Commit and rollback errors are reported through `sink`. A rollback error
/// never replaces the error of the work itself. A commit error is returned,
/// since in that case nothing the work did was persisted.
///
/// ```ignore
/// transaction(&ctx, &pool, sink, |conn| {
///     Box::pin(async move {
///         sqlx::query("CREATE TABLE t ()")
///             .execute(&mut *conn)
///             .await
///             .map_err(|e| MigrationError::driver("failed to create t", e))?;
///         Ok(())
///     })
/// })
/// .await?;
/// ```
pub async fn transaction<T, F>(
    ctx: &Context,
    pool: &PgPool,
    sink: &dyn LogSink,
    work: F,
) -> Result<T>
where
    F: for<'t> FnOnce(&'t mut PgConnection) -> TxFuture<'t, T>,
{
    let mut tx = ctx
        .run("begin transaction", async {
            pool.begin()
                .await
                .map_err(|e| MigrationError::driver("failed to begin db transaction", e))
        })
        .await?;

    // Catches a panic while building the future as well as while polling it
    let outcome = AssertUnwindSafe(async { work(&mut *tx).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(value)) => match tx.commit().await {
            Ok(()) => {
                debug!("Transaction committed");
                Ok(value)
            }
            Err(e) => {
                sink.log(&format_args!("failed to commit db transaction: {}", e));
                Err(MigrationError::driver("failed to commit db transaction", e))
            }
        },
        Ok(Err(err)) => {
            rollback(tx, sink).await;
            Err(err)
        }
        Err(panic) => {
            rollback(tx, sink).await;
            std::panic::resume_unwind(panic)
        }
    }
}

async fn rollback(tx: Transaction<'_, Postgres>, sink: &dyn LogSink) {
    match tx.rollback().await {
        Ok(()) => debug!("Transaction rolled back"),
        Err(e) => {
            sink.log(&format_args!("failed to roll back db transaction: {}", e));
        }
    }
}
