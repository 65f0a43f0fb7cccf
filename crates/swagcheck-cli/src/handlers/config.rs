//! Config command handler

use crate::error::CliResult;
use swagcheck::SuiteConfig;

/// Print `suite` as YAML
pub fn execute_config(suite: &SuiteConfig) -> CliResult<()> {
    print!("{}", suite.to_yaml()?);
    Ok(())
}
