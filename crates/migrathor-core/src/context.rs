//! Cancellation and deadline handling for database operations.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{MigrationError, Result};

/// Bounds every individual database operation of a run.
///
/// Cloning shares the cancellation token. Cancelling never undoes work that
/// already completed; it only stops the next operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context without deadline that is only stopped by `cancel()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fails fast if the context is already done.
    pub fn check(&self, op: &str) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(MigrationError::Cancelled(op.to_string()));
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(MigrationError::DeadlineExceeded(op.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Resolves once the token is cancelled or the deadline passes, with the
    /// matching error for `op`.
    pub async fn done(&self, op: &str) -> MigrationError {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => MigrationError::Cancelled(op.to_string()),
            _ = deadline => MigrationError::DeadlineExceeded(op.to_string()),
        }
    }

    /// Runs `fut` until it completes, the token is cancelled, or the deadline
    /// passes, whichever comes first. `op` names the operation in the error.
    ///
    /// An interrupted `fut` is dropped. Work it already handed to the server
    /// is not stopped by this.
    pub async fn run<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(op)?;

        tokio::select! {
            biased;
            err = self.done(op) => Err(err),
            result = fut => result,
        }
    }
}
