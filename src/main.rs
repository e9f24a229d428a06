//! AT harness CLI - runs accessibility test plans against live AT software

use at_harness::{cli, common};
use clap::Parser;

#[derive(Parser)]
#[command(name = "at-harness", about = "Assistive-technology test harness")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: cli::Commands,
}

#[tokio::main]
async fn main() {
    common::logging::init_cli();

    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
