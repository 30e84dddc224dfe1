//! CLI argument definitions for tarunner-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Scripted input runner.
///
/// Loads the app configuration under `<BASE_DIR>`, schedules every enabled
/// input and forwards the collected records to `<ENDPOINT>`.
#[derive(Parser, Debug)]
#[command(name = "tarunner-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// App directory (or a directory of app directories).
    pub base_dir: PathBuf,

    /// Downstream endpoint (`host:port`, `tcp://` or `http://` prefix accepted).
    pub endpoint: String,

    /// Path to tarunner.toml configuration file.
    ///
    /// Built-in defaults (plus environment overrides) are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and app files, then exit without starting.
    #[arg(long)]
    pub validate: bool,

    /// Print the receiver plan of every scheduled input as JSON and exit.
    #[arg(long)]
    pub print_plan: bool,
}
