//! Bandwidth Bench - command-line entry point
//!
//! Loads the scenario configuration, checks the fleet, runs every selected
//! scenario and prints a per-scenario, per-file summary.

use bandwidth_bench::{
    cli::Cli,
    config::{display_config_summary, load_config},
    error::{AppError, Result},
    logging::{LogLevel, LoggerFactory},
    BenchmarkOrchestrator, PKG_NAME, VERSION,
};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();

    if cli.should_show_topic_help() {
        println!("{}", cli.display_help());
        return;
    }

    let use_color = cli.use_colors();
    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(use_color));
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!("{} v{}", PKG_NAME, VERSION);
    }

    let settings = load_config(cli)?;

    if settings.log.level <= LogLevel::Debug {
        eprintln!("Configuration:\n{}\n", display_config_summary(&settings));
    }

    for warning in &settings.warnings {
        eprintln!("{}", warning.format(settings.use_color));
    }

    let loggers = LoggerFactory::new(settings.log);
    let orchestrator = BenchmarkOrchestrator::new(settings, loggers).await?;
    let outcome = orchestrator.run().await?;

    println!();
    println!("{}", orchestrator.render_summary(&outcome)?);
    if let Some(csv) = &outcome.csv_path {
        println!("CSV export: {}", csv.display());
    }

    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check the scenario file with --help-topic config");
            eprintln!("  - Exactly one upload and one download target are needed unless --rotate is set");
            eprintln!("  - Use --skip-preflight when the nodes do not run in containers");
        }
        AppError::Io(_) => {
            eprintln!();
            eprintln!("Output help:");
            eprintln!("  - Check that the output directory is writable (--output-dir)");
        }
        _ => {}
    }
}
