//! Command handlers
//!
//! Each handler module contains the execution logic for one CLI command,
//! small helpers, and tests.

pub mod config;
pub mod login_state;
pub mod report;
pub mod reset;
pub mod show_trace;
pub mod simulate;

pub use config::execute_config;
pub use login_state::execute_login_state;
pub use report::{execute_report, render_ledger};
pub use reset::execute_reset;
pub use show_trace::{execute_show_trace, viewer_hint};
pub use simulate::{execute_simulate, ledger_path, simulate};
