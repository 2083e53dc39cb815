//! Output renderers and formatting helpers for CLI commands.

use std::io::Write as _;

use anyhow::anyhow;
use serde::Serialize;
use stowage_core::{FailureKind, SaveResult};

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

const STATUS_SAVED: &str = "saved";
const STATUS_FAILED: &str = "failed";

/// Serializable summary of one command's save result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SaveReport {
    pub(crate) command: &'static str,
    pub(crate) status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

impl SaveReport {
    pub(crate) fn from_result(command: &'static str, result: &SaveResult) -> Self {
        match result {
            SaveResult::Saved { path } => Self {
                command,
                status: STATUS_SAVED,
                path: Some(path.display().to_string()),
                entries: None,
                kind: None,
                message: None,
            },
            SaveResult::Failed(failure) => Self {
                command,
                status: STATUS_FAILED,
                path: None,
                entries: None,
                kind: Some(failure.kind()),
                message: Some(failure.message().to_string()),
            },
        }
    }

    #[must_use]
    pub(crate) const fn with_entries(mut self, entries: usize) -> Self {
        self.entries = Some(entries);
        self
    }
}

pub(crate) fn render_report(report: &SaveReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(report)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => println!("{}", table_row(report)),
    }
    Ok(())
}

fn table_row(report: &SaveReport) -> String {
    let detail = report
        .path
        .as_deref()
        .or(report.message.as_deref())
        .unwrap_or_default();
    let kind = report.kind.map_or("-", FailureKind::as_str);
    match report.entries {
        Some(entries) => format!(
            "{:<6} {:<7} {:<24} {entries:>4} {detail}",
            report.command, report.status, kind
        ),
        None => format!(
            "{:<6} {:<7} {:<24} {detail}",
            report.command, report.status, kind
        ),
    }
}

/// Render the result, then turn a failure into the matching CLI error.
pub(crate) fn finish(report: &SaveReport, result: &SaveResult, format: OutputFormat) -> CliResult<()> {
    render_report(report, format)?;
    result.failure().map_or(Ok(()), |failure| {
        Err(CliError::from_save_failure(failure))
    })
}

/// Progress sink printing a percentage line to stderr.
pub(crate) fn progress_printer() -> impl Fn(f64) + Send + Sync + 'static {
    |fraction: f64| {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", format_progress(fraction));
        if fraction >= 1.0 {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

fn format_progress(fraction: f64) -> String {
    format!("progress {:>5.1}%", fraction.clamp(0.0, 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use stowage_core::{SaveError, SaveFailure};

    #[test]
    fn saved_report_serializes_path_only() -> anyhow::Result<()> {
        let result = SaveResult::Saved {
            path: PathBuf::from("/srv/out/report.pdf"),
        };
        let report = SaveReport::from_result("save", &result);
        let value = serde_json::to_value(&report)?;
        assert_eq!(value["status"], "saved");
        assert_eq!(value["path"], "/srv/out/report.pdf");
        assert!(value.get("kind").is_none());
        assert!(value.get("entries").is_none());
        Ok(())
    }

    #[test]
    fn failed_report_carries_kind_and_message() -> anyhow::Result<()> {
        let result = SaveResult::Failed(SaveFailure::from(SaveError::NoDestinationSelected));
        let report = SaveReport::from_result("bulk", &result).with_entries(3);
        let value = serde_json::to_value(&report)?;
        assert_eq!(value["kind"], "no_destination_selected");
        assert_eq!(value["entries"], 3);
        assert!(table_row(&report).contains("no_destination_selected"));
        Ok(())
    }

    #[test]
    fn finish_maps_failures_to_errors() {
        let result = SaveResult::Failed(SaveFailure::from(SaveError::Unsupported {
            operation: "save_with_progress",
            reason: "length unknown",
        }));
        let report = SaveReport::from_result("save", &result);
        let error = finish(&report, &result, OutputFormat::Json).expect_err("failed save");
        assert_eq!(error.exit_code(), crate::context::EXIT_FAILURE);

        let saved = SaveResult::Saved {
            path: PathBuf::from("/tmp/x"),
        };
        let report = SaveReport::from_result("save", &saved);
        assert!(finish(&report, &saved, OutputFormat::Table).is_ok());
    }

    #[test]
    fn progress_is_clamped_percentage() {
        assert_eq!(format_progress(0.5), "progress  50.0%");
        assert_eq!(format_progress(1.5), "progress 100.0%");
    }
}
