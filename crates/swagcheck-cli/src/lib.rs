//! Swagcheck CLI Library
//!
//! Command-line surface over the swagcheck pipeline: reset the run
//! workspace, bootstrap the login state, re-render attempt summaries from a
//! saved ledger, extract traces, and run the flaky cart scenario against the
//! simulated shop.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, LoginStateArgs, ReportArgs, ResetArgs, ShowTraceArgs,
    SimulateArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Printer;
