#![warn(missing_docs)]
//! samplerig Report - Run Outcomes
//!
//! Collects per-sample verdicts into a run report and renders it:
//! - JSON (machine-readable, full captured output included)
//! - Human (terminal summary)

mod human;
mod json;
#[allow(missing_docs)]
mod report;

pub use human::format_human_report;
pub use json::generate_json_report;
pub use report::{ReportMeta, RunMode, RunOutcome, RunReport, RunSummary, Verdict};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON with the full report
    Json,
    /// Human-readable terminal output
    #[default]
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Render `report` in `format`.
pub fn render_report(report: &RunReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Human => Ok(format_human_report(report)),
    }
}
