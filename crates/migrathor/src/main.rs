mod cli;

use std::process::ExitCode;

use clap::Parser;
use console::style;

#[tokio::main]
async fn main() -> ExitCode {
    // Flags fall back to MIGRATHOR_* variables, so .env has to be loaded first
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("  {} {:#}", style("✗").red().bold(), failure.error());
            ExitCode::from(failure.exit_code())
        }
    }
}
