//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Swagcheck: failure evidence and attempt reports for browser end-to-end suites
#[derive(Parser, Debug)]
#[command(name = "swagcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suite configuration file (YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete and recreate the run directories
    Reset(ResetArgs),

    /// Log in once and save the storage state
    LoginState(LoginStateArgs),

    /// Render an attempt summary from a saved ledger
    Report(ReportArgs),

    /// Extract a trace archive for viewing
    ShowTrace(ShowTraceArgs),

    /// Run the flaky cart scenario against the simulated shop
    Simulate(SimulateArgs),

    /// Print the effective suite configuration
    Config(ConfigArgs),
}

/// Arguments for the reset command
#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Run root (overrides the configuration)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Arguments for the login-state command
#[derive(Parser, Debug)]
pub struct LoginStateArgs {
    /// Run root (overrides the configuration)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Use the simulated shop instead of a real browser
    #[arg(long)]
    pub simulated: bool,

    /// Bootstrap even when a valid login state exists
    #[arg(long)]
    pub force: bool,

    /// Browser binary (overrides the configuration)
    #[arg(long)]
    pub executable: Option<PathBuf>,

    /// Launch the browser without its sandbox
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Ledger JSON written by a previous run
    #[arg(long)]
    pub ledger: PathBuf,

    /// Test name shown in the title (`module::Class::name`)
    #[arg(long, default_value = "unknown::test")]
    pub test: String,

    /// Output HTML file (stdout when omitted)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for the show-trace command
#[derive(Parser, Debug)]
pub struct ShowTraceArgs {
    /// Trace archive (`trace.zip`)
    pub trace: PathBuf,
}

/// Arguments for the simulate command
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Run root (overrides the configuration)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Attempts that fail before the scenario passes
    #[arg(long, default_value = "1")]
    pub fail_attempts: u32,

    /// Retries after the first attempt (overrides the configuration)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Also write the ledger JSON next to the summary
    #[arg(long)]
    pub save_ledger: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print the built-in defaults instead of the effective configuration
    #[arg(long)]
    pub defaults: bool,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
