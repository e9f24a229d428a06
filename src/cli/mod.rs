//! CLI command handlers
//!
//! Wires a loaded test plan to a live AT driver connection and WebDriver
//! session, runs the tests sequentially, and prints per-command progress.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::atdriver::AtDriverClient;
use crate::browser::WebDriverBrowser;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::report::{CallbackReporter, TestStatus};
use crate::testing::plan;
use crate::testing::runner::TestRunner;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a test plan against a live AT and browser
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Test plan: a collected-test JSON file or a directory of them
    #[arg(long)]
    pub plan: PathBuf,

    /// AT Driver WebSocket endpoint
    #[arg(long, default_value = "ws://127.0.0.1:4382/session")]
    pub at_driver_url: String,

    /// WebDriver server URL
    #[arg(long, default_value = "http://127.0.0.1:4444")]
    pub webdriver_url: String,

    /// Existing WebDriver session id to drive
    #[arg(long)]
    pub webdriver_session: String,

    /// Base URL where reference pages are served
    #[arg(long)]
    pub reference_base_url: String,

    /// Optional endpoint that receives each test's result
    #[arg(long)]
    pub callback_url: Option<String>,

    /// Override the after-keys debounce window (ms)
    #[arg(long)]
    pub keys_debounce_ms: Option<u64>,

    /// Override the after-navigation debounce window (ms)
    #[arg(long)]
    pub navigation_debounce_ms: Option<u64>,
}

/// Dispatch a parsed subcommand.
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(ms) = args.keys_debounce_ms {
        config.timings.keys_debounce_ms = ms;
    }
    if let Some(ms) = args.navigation_debounce_ms {
        config.timings.navigation_debounce_ms = ms;
    }

    let tests = plan::load_plan(&args.plan)?;
    println!(
        "{} {} test(s) from {}",
        "Loaded".blue().bold(),
        tests.len(),
        args.plan.display()
    );

    let mut client = AtDriverClient::connect(&args.at_driver_url).await?;
    let at = client.new_session().await?;
    println!(
        "  {} AT driver session ready ({})",
        "✓".green(),
        if at.at_name.is_empty() { "unidentified AT" } else { at.at_name.as_str() }
    );

    let browser = WebDriverBrowser::new(&args.webdriver_url, &args.webdriver_session);
    let mut runner = TestRunner::new(
        client,
        Box::new(browser),
        &args.reference_base_url,
        config.timings,
    );
    let reporter = args.callback_url.as_deref().map(CallbackReporter::new);

    let mut failed = 0usize;
    for test in &tests {
        println!(
            "\n{} {}",
            "Running:".blue().bold(),
            test.info
                .title
                .as_deref()
                .unwrap_or(&test.info.test_id)
                .white()
                .bold()
        );

        match runner.run(test).await {
            Ok(result) => {
                for output in &result.commands {
                    if output.errors.is_empty() {
                        println!("  {} {}", "✓".green(), output.command.dimmed());
                    } else {
                        failed += 1;
                        println!(
                            "  {} {} ({})",
                            "✗".red(),
                            output.command,
                            output.errors.join("; ").dimmed()
                        );
                    }
                }
                if let Some(reporter) = &reporter {
                    reporter.post_result(&result, TestStatus::Completed).await;
                }
            }
            Err(e) => {
                // Fatal for this test; its partial output is lost but the
                // rest of the plan still runs.
                failed += 1;
                println!("  {} {}", "✗".red(), e);
                if let Some(reporter) = &reporter {
                    reporter.post_error(test).await;
                }
            }
        }
    }

    runner.quit().await?;

    if failed > 0 {
        println!(
            "\n{} {} command(s) or test(s) failed",
            "✗".red().bold(),
            failed
        );
        return Err(Error::TestRunFailed { failed });
    }

    println!("\n{} {}", "✓".green().bold(), "All tests passed".green().bold());
    Ok(())
}
