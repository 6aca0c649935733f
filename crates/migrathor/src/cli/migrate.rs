use std::fmt;

use clap::Parser;
use console::style;
use tracing::debug;

use migrathor_core::{Context, MigrathorConfig};
use migrathor_runtime::{Database, Migrator};

use super::{report_driver_error, Failure, GlobalArgs};

/// Apply all pending migrations.
#[derive(Parser)]
pub struct MigrateCommand {}

impl MigrateCommand {
    pub async fn execute(self, global: &GlobalArgs) -> Result<(), Failure> {
        let config = global.load_config().map_err(Failure::Setup)?;
        let migrator = console_migrator(&config)?;
        let db = connect(&config).await?;

        println!();
        println!("  {}  Migrations", style("migrathor").bold().cyan());
        println!();

        let ctx = Context::with_timeout(config.migrations.apply_timeout());
        cancel_on_ctrl_c(&ctx);

        let result = migrator.apply(&ctx, db.pool()).await;
        db.close().await;

        match result {
            Ok(applied) => {
                for name in &applied {
                    println!("  {} Applied: {}", style("✓").green(), name);
                }
                if applied.is_empty() {
                    println!("  {} No pending migrations", style("ℹ").blue());
                } else {
                    println!();
                    println!(
                        "  {} Applied {} migration(s)",
                        style("✓").green(),
                        applied.len()
                    );
                }
                println!();
                Ok(())
            }
            Err(err) => {
                for name in &err.applied {
                    println!("  {} Applied: {}", style("✓").green(), name);
                }
                if let Some(failed) = &err.failed {
                    println!("  {} Failed: {}", style("✗").red(), style(failed).red());
                }
                report_driver_error(&err.source);
                Err(Failure::Migrate(err.into()))
            }
        }
    }
}

/// Builds a migrator whose operator messages are printed to the console.
pub(super) fn console_migrator(config: &MigrathorConfig) -> Result<Migrator, Failure> {
    config
        .migrator_config()
        .map(|c| {
            c.with_sink(|message: &dyn fmt::Display| {
                println!("  {} {}", style("ℹ").blue(), message);
            })
        })
        .and_then(Migrator::new)
        .map_err(|e| Failure::Setup(e.into()))
}

/// Connects and pings the database.
pub(super) async fn connect(config: &MigrathorConfig) -> Result<Database, Failure> {
    match Database::from_config(&config.database).await {
        Ok(db) => Ok(db),
        Err(err) => {
            report_driver_error(&err);
            Err(Failure::Setup(err.into()))
        }
    }
}

/// Cancels `ctx` on the first Ctrl-C. The current migration is rolled back
/// where it runs in a transaction.
fn cancel_on_ctrl_c(ctx: &Context) {
    let token = ctx.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling");
            token.cancel();
        }
    });
}
