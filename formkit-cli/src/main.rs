//! Formkit CLI - inspect form presets, types and form documents.
//!
//! Commands:
//! - `formkit build <FORM> [--json]`: Build a form document and print its tree
//! - `formkit type <TYPE>`: Print the merged definition of a type
//! - `formkit presets`: List the configured presets
//!
//! Environment variables:
//! - FORMKIT_*: Override settings, `__` separates nested keys
//! - RUST_LOG: Log filter when `--debug` is not given
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error

use clap::Parser;
use tracing_subscriber::EnvFilter;

use formkit::FormSettings;
use formkit_cli::commands;
use formkit_cli::{Cli, Commands};

/// Print a command's output, or its error, and map it to an exit code.
fn handle_result(result: anyhow::Result<String>) -> i32 {
    match result {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("formkit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = match FormSettings::load(&cli.settings) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let exit_code = match cli.command {
        Commands::Build { form, json } => {
            handle_result(commands::run_build(&settings, &cli.preset, &form, json))
        }
        Commands::Type { type_name } => {
            handle_result(commands::run_type(&settings, &cli.preset, &type_name))
        }
        Commands::Presets => handle_result(Ok(commands::run_presets(&settings))),
    };

    std::process::exit(exit_code);
}
