//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Overrides;

/// Rainmaker - configuration, schedule and firmware server for irrigation controllers.
#[derive(Parser, Debug)]
#[command(name = "rainmaker", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for scripts and log shippers)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "RAINMAKER_FORMAT"
    )]
    pub format: OutputFormat,

    /// Shorthand for --format=json
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Settings file (TOML). Defaults to ./rainmaker.toml when present.
    #[arg(long, short = 'c', global = true, env = "RAINMAKER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

impl Cli {
    /// Returns true if output should be JSON.
    pub const fn use_json(&self) -> bool {
        self.json || matches!(self.format, OutputFormat::Json)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Load and validate the persisted documents
    Check(DataArgs),

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Location of the persisted documents.
#[derive(Parser, Debug, Default)]
pub struct DataArgs {
    /// Directory holding manifolds.json, currentVersion.json and nextRun.json
    #[arg(long, short = 'd', env = "RAINMAKER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', env = "RAINMAKER_PORT")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long, env = "RAINMAKER_BIND")]
    pub bind: Option<String>,

    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

impl ServeArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            bind: self.bind.clone(),
            port: self.port,
            data_dir: self.data.data_dir.clone(),
        }
    }
}

impl DataArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            data_dir: self.data_dir.clone(),
            ..Overrides::default()
        }
    }
}
