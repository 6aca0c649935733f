mod create;
mod migrate;
mod settings;
mod status;

pub use create::CreateCommand;
pub use migrate::MigrateCommand;
pub use settings::GlobalArgs;
pub use status::StatusCommand;

use clap::{Parser, Subcommand};
use console::style;

use migrathor_core::MigrationError;
use migrathor_runtime::describe_driver_error;

/// migrathor - forward-only SQL migrations for PostgreSQL
#[derive(Parser)]
#[command(name = "migrathor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new, empty migration file.
    Create(CreateCommand),

    /// Apply all pending migrations.
    Migrate(MigrateCommand),

    /// Show applied and pending migrations.
    Status(StatusCommand),

    /// Print the version.
    Version,
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<(), Failure> {
        match self.command {
            Commands::Version => {
                println!("migrathor {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            Commands::Create(cmd) => cmd.execute(&self.global),
            Commands::Migrate(cmd) => {
                self.global.init_tracing();
                cmd.execute(&self.global).await
            }
            Commands::Status(cmd) => {
                self.global.init_tracing();
                cmd.execute(&self.global).await
            }
        }
    }
}

/// A failed command, classified by the exit code it maps to.
#[derive(Debug)]
pub enum Failure {
    /// A migration failed to apply.
    Migrate(anyhow::Error),
    /// Configuration could not be loaded or the database was unreachable.
    Setup(anyhow::Error),
    /// A new migration file could not be written.
    Create(anyhow::Error),
}

impl Failure {
    pub fn exit_code(&self) -> u8 {
        match self {
            Failure::Migrate(_) => 1,
            Failure::Setup(_) => 2,
            Failure::Create(_) => 3,
        }
    }

    pub fn error(&self) -> &anyhow::Error {
        match self {
            Failure::Migrate(e) | Failure::Setup(e) | Failure::Create(e) => e,
        }
    }
}

/// Prints the server's view of a database error, if there is one.
fn report_driver_error(err: &MigrationError) {
    if let Some(driver) = err.driver_error() {
        eprintln!();
        for line in describe_driver_error(driver).lines() {
            eprintln!("    {}", style(line).dim());
        }
        eprintln!();
    }
}
