//! Swagcheck CLI
//!
//! ## Usage
//!
//! ```bash
//! swagcheck reset                               # Recreate run directories
//! swagcheck login-state --simulated             # Save storage/login.json
//! swagcheck simulate --fail-attempts 1          # Flaky cart run, then report
//! swagcheck report --ledger ledger.json -o a.html
//! swagcheck show-trace artifacts/.../trace.zip  # Extract for the viewer
//! ```

use clap::Parser;
use std::process::ExitCode;
use swagcheck::SuiteConfig;
use swagcheck_cli::{
    handlers, Cli, CliConfig, CliResult, ColorChoice, Commands, Printer, Verbosity,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    config.init_logging();
    let printer = Printer::new(&config);

    let suite = || SuiteConfig::resolve(cli.config.as_deref());

    match &cli.command {
        Commands::Reset(args) => handlers::execute_reset(&printer, suite()?, args),
        Commands::LoginState(args) => handlers::execute_login_state(&printer, suite()?, args),
        Commands::Report(args) => handlers::execute_report(&printer, &suite()?, args),
        Commands::ShowTrace(args) => handlers::execute_show_trace(&printer, &suite()?, args),
        Commands::Simulate(args) => handlers::execute_simulate(&printer, suite()?, args),
        Commands::Config(args) => {
            let suite = if args.defaults {
                SuiteConfig::default()
            } else {
                suite()?
            };
            handlers::execute_config(&suite)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_log_json(cli.log_json)
}
