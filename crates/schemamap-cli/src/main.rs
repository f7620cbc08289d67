//! Schemamap CLI - Command-line interface for spec-driven data mapping
//!
//! This is the main entry point for the Schemamap CLI application, providing
//! commands for mapping data, deriving target schemas and inverting
//! transformation specifications.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;
use tracing_appender::non_blocking::WorkerGuard;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Configuration is loaded before logging so its logging section applies
    let config = Config::load_with_file(cli.config.as_deref());
    let use_color = cli.use_color() && config.as_ref().map_or(true, |c| c.output.color);
    control::set_override(use_color);

    let guard = match init_logging(&cli, config.as_ref().ok()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    let result = config.and_then(|config| run(cli, config, use_color));

    if let Err(e) = result {
        eprintln!("{}", error::format_error(&e, use_color));
        // flush the log file before exiting
        drop(guard);
        process::exit(e.exit_code());
    }
}

/// Main application logic
#[instrument(skip_all, fields(command = ?cli.command))]
fn run(cli: Cli, config: Config, use_color: bool) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let format = cli.output_format.unwrap_or(config.output.format);
    let mut output = OutputWriter::new(format, use_color, cli.quiet);

    tracing::info!(
        command = ?cli.command,
        verbosity = cli.verbosity_level(),
        "Executing command"
    );

    match cli.command {
        Commands::MapData(args) => handlers::handle_map_data(args, &config, &mut output),
        Commands::DeriveSchema(args) => handlers::handle_derive_schema(args, &config, &mut output),
        Commands::Invert(args) => handlers::handle_invert(args, &config, &mut output),
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: Option<&Config>) -> Result<Option<WorkerGuard>> {
    let verbosity = cli.verbosity_level();
    let mut logging_config = LoggingConfig::from_verbosity(verbosity);

    if let Some(config) = config {
        logging_config.merge_with_file(&config.logging, verbosity);
    }

    // Apply environment overrides
    logging_config.merge_with_env();

    // If quiet mode, only log errors
    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["schemamap", "completions", "zsh"]);
        assert_eq!(cli.verbosity_level(), 0);

        let cli = Cli::parse_from([
            "schemamap",
            "-vv",
            "invert",
            "-s",
            "personinfo.yaml",
            "-T",
            "spec.yaml",
        ]);
        assert_eq!(cli.verbosity_level(), 2);

        let cli = Cli::parse_from(["schemamap", "--quiet", "completions", "bash"]);
        assert_eq!(cli.verbosity_level(), 0);
    }
}
