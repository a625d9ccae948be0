//! Colo Latency Probe - command-line entry point
//!
//! Loads the endpoint catalog, resolves every endpoint, measures a TLS
//! handshake to each address and writes JSON and HTML reports.

use clap::Parser;
use colo_latency_probe::{
    app::App,
    cli::Cli,
    config::{load_config, EnvManager},
    error::{ErrorReporter, Result},
    BUILD_TIME, GIT_COMMIT, PKG_NAME, TARGET_TRIPLE, VERSION,
};
use std::error::Error;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.env_help {
        println!("{}", EnvManager::display_env_help());
        return;
    }

    let use_color = cli.use_colors();
    let verbose = cli.verbose || cli.debug;
    if !use_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run_application(cli).await {
        let reporter = ErrorReporter::new(use_color, verbose);
        reporter.report_error(&e);

        if let Some(source) = e.source() {
            eprintln!("Caused by: {}", source);
        }

        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!(
            "{} v{} ({}, {}, built {})",
            PKG_NAME,
            VERSION,
            GIT_COMMIT.unwrap_or("unknown commit"),
            TARGET_TRIPLE,
            BUILD_TIME
        );
    }

    let config = load_config(cli)?;
    if !config.enable_color {
        colored::control::set_override(false);
    }

    let app = App::new(config);
    let report = app.run().await?;
    app.print_report(&report);

    // Unreachable endpoints are results, not errors
    Ok(())
}
