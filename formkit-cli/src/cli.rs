//! CLI definition for the formkit command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Formkit - inspect form presets, types and form documents.
///
/// Settings files hold named presets under a top-level `presets` key. Files
/// are merged in the order given; `FORMKIT_` environment variables are merged
/// last, with `__` separating nested keys.
#[derive(Parser, Debug)]
#[command(name = "formkit")]
#[command(version)]
#[command(about = "Inspect form presets, types and form documents")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Settings file (YAML, JSON or TOML); may be repeated
    #[arg(short, long = "settings", global = true, value_name = "PATH")]
    pub settings: Vec<PathBuf>,

    /// Preset to build against
    #[arg(short, long, global = true, default_value = "default")]
    pub preset: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a form document and print its page and element tree
    Build {
        /// Form document (YAML or JSON)
        form: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the merged definition of a type
    Type {
        /// Type name, e.g. Formkit.Core:Page
        type_name: String,
    },

    /// List the configured presets
    Presets,
}
