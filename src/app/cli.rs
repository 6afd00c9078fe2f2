//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pen Interpreter - Turn digital pen dot streams into document actions
#[derive(Parser, Debug)]
#[command(name = "pen-interp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a dot recording through the interpreter
    Replay {
        /// Input recording file
        #[arg(short, long)]
        input: PathBuf,

        /// Annotation catalogue (overrides the configured one)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Print listener events as JSON lines
        #[arg(long)]
        json: bool,

        /// Send recognition requests to the configured service instead of
        /// replaying the recorded outcomes
        #[arg(long)]
        live: bool,
    },

    /// Show the pages and marks of an annotation catalogue
    Catalog {
        /// Catalogue file (defaults to the configured one)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show or edit the interpreter configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "strokes.multi_stroke_gap_ms", "recognition.endpoint")
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a specific configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Reset configuration to defaults
    Reset {
        /// Reset even if a config file exists
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Catalogue used when neither the command line nor the config names one
    pub fn default_catalog() -> PathBuf {
        PathBuf::from("data").join("catalog.json")
    }
}
