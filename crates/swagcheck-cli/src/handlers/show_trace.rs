//! Show-trace command handler

use crate::commands::ShowTraceArgs;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use std::path::Path;
use swagcheck::driver::trace::extract_trace;
use swagcheck::report::failure_panel::VIEWER_PORT;
use swagcheck::report::DEFAULT_TRACE_VIEWER_COMMAND;
use swagcheck::SuiteConfig;

/// Lines telling the user how to open `trace` once extracted to `viewer_dir`
///
/// A configured external viewer is listed last; the bundled one needs no extra line.
#[must_use]
pub fn viewer_hint(suite: &SuiteConfig, trace: &Path, viewer_dir: &Path) -> Vec<String> {
    let mut lines = vec![
        viewer_dir.join("index.html").display().to_string(),
        format!(
            "cd {} && python -m http.server {VIEWER_PORT}",
            viewer_dir.display()
        ),
        format!("http://localhost:{VIEWER_PORT}"),
    ];
    if suite.trace_viewer_command != DEFAULT_TRACE_VIEWER_COMMAND {
        lines.push(format!("{} {}", suite.trace_viewer_command, trace.display()));
    }
    lines
}

/// Extract a trace archive next to itself and print how to view it
pub fn execute_show_trace(
    printer: &Printer,
    suite: &SuiteConfig,
    args: &ShowTraceArgs,
) -> CliResult<()> {
    if !args.trace.is_file() {
        return Err(CliError::invalid_argument(format!(
            "trace archive not found: {}",
            args.trace.display()
        )));
    }
    let viewer_dir = extract_trace(&args.trace)?;
    printer.success(&format!("trace extracted to {}", viewer_dir.display()));
    for line in viewer_hint(suite, &args.trace, &viewer_dir) {
        printer.info(&line);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{CliConfig, ColorChoice, Verbosity};
    use swagcheck::driver::trace::TraceRecorder;
    use swagcheck::driver::TraceOptions;

    fn quiet() -> Printer {
        Printer::new(
            &CliConfig::new()
                .with_verbosity(Verbosity::Quiet)
                .with_color(ColorChoice::Never),
        )
    }

    #[test]
    fn test_hint_uses_configured_viewer() {
        let suite = SuiteConfig::default().with_trace_viewer_command("viewer");
        let lines = viewer_hint(&suite, Path::new("a/trace.zip"), Path::new("a/trace-viewer"));
        assert_eq!(lines[0], "a/trace-viewer/index.html");
        assert!(lines[1].ends_with("python -m http.server 9323"));
        assert_eq!(lines[3], "viewer a/trace.zip");
    }

    #[test]
    fn test_hint_for_bundled_viewer() {
        let lines = viewer_hint(
            &SuiteConfig::default(),
            Path::new("a/trace.zip"),
            Path::new("a/trace-viewer"),
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "http://localhost:9323");
    }

    #[test]
    fn test_extracts_recorded_trace() {
        let dir = tempfile::tempdir().unwrap();
        let zip = dir.path().join("trace.zip");
        let mut recorder = TraceRecorder::start(TraceOptions::full("attempt_1"));
        recorder.record("goto", "https://shop.test/", "https://shop.test/", None, None);
        recorder.finish(&zip).unwrap();

        let args = ShowTraceArgs { trace: zip };
        execute_show_trace(&quiet(), &SuiteConfig::default(), &args).unwrap();
        assert!(dir.path().join("trace-viewer").is_dir());
    }

    #[test]
    fn test_missing_archive_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = ShowTraceArgs {
            trace: dir.path().join("trace.zip"),
        };
        let err = execute_show_trace(&quiet(), &SuiteConfig::default(), &args).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
    }
}
