//! CLI argument definitions for `calc-share`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "calc-share",
    version,
    about = "Inspect and edit the calculator shared-data document",
    long_about = "Inspect and edit the document calculators use to share values.\n\n\
                  Lists the shared field vocabulary and the calculator connection graph,\n\
                  shows stored values with provenance, and watches for changes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Settings file (default: platform config dir).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the shared document (overrides settings).
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the shared field vocabulary.
    Fields,

    /// List registered calculators with their imports and exports.
    Calculators,

    /// List calculators that can use values a calculator exports.
    Connections(CalculatorArgs),

    /// Show stored values with their source and age.
    Show,

    /// Show what a calculator would be offered to import.
    Imports(CalculatorArgs),

    /// Publish values as a calculator.
    ///
    /// Fields the calculator does not declare as exports are ignored.
    Export(ExportArgs),

    /// Delete the shared document.
    Clear,

    /// Print stored values whenever the document changes.
    Watch(WatchArgs),

    /// Show the effective settings.
    Config(ConfigArgs),
}

#[derive(Parser)]
pub struct CalculatorArgs {
    /// Calculator id, e.g. bbq-planner.
    #[arg(value_name = "CALCULATOR")]
    pub calculator: String,
}

#[derive(Parser)]
pub struct ExportArgs {
    /// Calculator id to publish as.
    #[arg(value_name = "CALCULATOR")]
    pub calculator: String,

    /// Values as FIELD=VALUE, e.g. guestCount=50 currency=GBP.
    #[arg(value_name = "FIELD=VALUE", required = true)]
    pub values: Vec<String>,
}

#[derive(Parser)]
pub struct WatchArgs {
    /// Poll interval in milliseconds (default: from settings).
    #[arg(long = "interval-ms", value_name = "MS")]
    pub interval_ms: Option<u64>,
}

#[derive(Parser)]
pub struct ConfigArgs {
    /// Save the effective settings to the settings file.
    #[arg(long)]
    pub write: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
