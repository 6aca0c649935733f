use clap::Parser;
use console::style;

use migrathor_core::Context;

use super::migrate::{connect, console_migrator};
use super::{report_driver_error, Failure, GlobalArgs};

/// Show applied and pending migrations.
#[derive(Parser)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(self, global: &GlobalArgs) -> Result<(), Failure> {
        let config = global.load_config().map_err(Failure::Setup)?;
        let migrator = console_migrator(&config)?;
        let db = connect(&config).await?;

        let ctx = Context::with_timeout(config.database.connect_timeout());
        let status = migrator.status(&ctx, db.pool()).await;
        db.close().await;

        let status = status.map_err(|e| {
            report_driver_error(&e);
            Failure::Setup(e.into())
        })?;

        println!();
        println!("  {}  Migration Status", style("migrathor").bold().cyan());
        println!();

        if status.applied.is_empty() && status.pending.is_empty() {
            println!("  {} No migrations found", style("ℹ").blue());
            println!();
            return Ok(());
        }

        if !status.applied.is_empty() {
            println!("  {} Applied:", style("✓").green());
            for record in &status.applied {
                println!(
                    "    {} {} ({:.3}s)",
                    style(&record.migration).cyan(),
                    style(record.applied_at.format("%Y-%m-%d %H:%M:%S")).dim(),
                    record.execution_time
                );
            }
        }

        if !status.pending.is_empty() {
            if !status.applied.is_empty() {
                println!();
            }
            println!("  {} Pending:", style("○").yellow());
            for name in &status.pending {
                println!("    {} {}", style("→").dim(), style(name).yellow());
            }
        }

        println!();
        println!(
            "  {} {} applied, {} pending",
            style("ℹ").blue(),
            status.applied.len(),
            status.pending.len()
        );
        println!();
        Ok(())
    }
}
