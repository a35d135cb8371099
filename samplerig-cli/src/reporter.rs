//! Console reporter
//!
//! Everything a pipeline prints goes through [`Reporter`]: the progress line
//! announcing each invocation, the captured tool output, and the outcome that
//! decides whether the run continues. The reporter owns the [`RunReport`]
//! being built, so the abort decision lives in exactly one place.

use crate::pipeline::HarnessError;
use indicatif::{ProgressBar, ProgressStyle};
use samplerig_core::{InvocationResult, InvokeError};
use samplerig_report::{ReportMeta, RunOutcome, RunReport};
use std::io::{self, Write};
use std::time::Duration;

/// Whether the run goes on after an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Abort,
}

/// Which artifact a per-sample build produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPurpose {
    /// Normal runnable artifact
    Execution,
    /// Test-instrumented artifact consumed by the tester
    Testing,
}

impl BuildPurpose {
    fn as_str(self) -> &'static str {
        match self {
            BuildPurpose::Execution => "execution",
            BuildPurpose::Testing => "testing",
        }
    }
}

/// `compiling '<sample>' for execution|testing`
pub fn build_message(sample: &str, purpose: BuildPurpose) -> String {
    format!("compiling '{}' for {}", sample, purpose.as_str())
}

/// `testing '<sample>' for <N> iterations`
pub fn test_message(sample: &str, iterations: u32) -> String {
    format!("testing '{}' for {} iterations", sample, iterations)
}

/// `compiling solution '<catalog>'`
pub fn solution_message(catalog: &str) -> String {
    format!("compiling solution '{}'", catalog)
}

/// Console sink plus the report under construction
pub struct Reporter<W: Write> {
    out: W,
    report: RunReport,
    show_spinner: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, meta: ReportMeta) -> Self {
        Self {
            out,
            report: RunReport::new(meta),
            show_spinner: false,
        }
    }

    /// Show a spinner on stderr while a child runs
    pub fn with_spinner(mut self, show: bool) -> Self {
        self.show_spinner = show;
        self
    }

    /// Print a progress line
    pub fn progress(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, ". {}", message)
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.show_spinner {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Announce `message`, then run one tool invocation under a spinner
    pub fn run_step<F>(&mut self, message: &str, step: F) -> Result<InvocationResult, HarnessError>
    where
        F: FnOnce() -> Result<InvocationResult, InvokeError>,
    {
        self.progress(message)?;
        let pb = self.spinner(message);
        let result = step();
        pb.finish_and_clear();
        Ok(result?)
    }

    /// Print captured stdout verbatim
    pub fn dump_stdout(&mut self, result: &InvocationResult) -> io::Result<()> {
        self.out.write_all(result.stdout.as_bytes())?;
        if !result.stdout.is_empty() && !result.stdout.ends_with('\n') {
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Print everything a failed invocation left behind
    pub fn dump_output(&mut self, result: &InvocationResult) -> io::Result<()> {
        self.dump_stdout(result)?;
        if !result.stderr.trim().is_empty() {
            writeln!(self.out, "--- stderr ---")?;
            self.out.write_all(result.stderr.as_bytes())?;
            if !result.stderr.ends_with('\n') {
                self.out.write_all(b"\n")?;
            }
        }
        if result.timed_out {
            writeln!(self.out, "(killed after exceeding the timeout)")?;
        }
        Ok(())
    }

    /// Add `outcome` to the report
    pub fn record(&mut self, outcome: RunOutcome) -> Flow {
        if self.report.record(outcome) {
            Flow::Continue
        } else {
            Flow::Abort
        }
    }

    /// Fail the run with an error that produced no outcome
    pub fn abort_with_error(&mut self, message: impl Into<String>) {
        self.report.abort_with_error(message);
    }

    pub fn into_parts(self) -> (W, RunReport) {
        (self.out, self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samplerig_report::{RunMode, Verdict};

    fn reporter() -> Reporter<Vec<u8>> {
        Reporter::new(Vec::new(), ReportMeta::new(RunMode::Compile))
    }

    fn console(reporter: Reporter<Vec<u8>>) -> String {
        let (out, _) = reporter.into_parts();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn progress_messages() {
        assert_eq!(
            build_message("Raft", BuildPurpose::Execution),
            "compiling 'Raft' for execution"
        );
        assert_eq!(
            build_message("Raft", BuildPurpose::Testing),
            "compiling 'Raft' for testing"
        );
        assert_eq!(test_message("Chord", 100), "testing 'Chord' for 100 iterations");
        assert_eq!(solution_message("racy"), "compiling solution 'racy'");
    }

    #[test]
    fn run_step_announces_then_invokes() {
        let mut reporter = reporter();
        let result = reporter
            .run_step("compiling 'A' for execution", || {
                Ok(InvocationResult::exited(vec!["compiler".to_string()], 0))
            })
            .unwrap();
        assert!(result.succeeded());
        assert_eq!(console(reporter), ". compiling 'A' for execution\n");
    }

    #[test]
    fn run_step_surfaces_launch_errors() {
        let mut reporter = reporter();
        let err = reporter
            .run_step("compiling 'A' for execution", || {
                Err(InvokeError::Launch {
                    tool: "missing".into(),
                    source: io::Error::new(io::ErrorKind::NotFound, "not found"),
                })
            })
            .unwrap_err();
        assert!(matches!(err, HarnessError::Invoke(InvokeError::Launch { .. })));
    }

    #[test]
    fn dump_output_includes_stderr_and_newline() {
        let mut reporter = reporter();
        let result = InvocationResult::exited(vec!["compiler".to_string()], 1)
            .with_stdout("error CS1002")
            .with_stderr("fatal\n");
        reporter.dump_output(&result).unwrap();
        assert_eq!(console(reporter), "error CS1002\n--- stderr ---\nfatal\n");
    }

    #[test]
    fn dump_output_notes_a_timeout() {
        let mut reporter = reporter();
        let result = InvocationResult {
            timed_out: true,
            ..InvocationResult::exited(vec!["tester".to_string()], -1).with_stdout("... Iteration #9\n")
        };
        reporter.dump_output(&result).unwrap();
        assert_eq!(
            console(reporter),
            "... Iteration #9\n(killed after exceeding the timeout)\n"
        );
    }

    #[test]
    fn dump_stdout_skips_blank_output() {
        let mut reporter = reporter();
        let result = InvocationResult::exited(vec!["tester".to_string()], 0);
        reporter.dump_stdout(&result).unwrap();
        assert_eq!(console(reporter), "");
    }

    #[test]
    fn record_turns_hard_failures_into_abort() {
        let mut reporter = reporter();
        let ok = InvocationResult::exited(vec!["compiler".to_string()], 0);
        let bad = InvocationResult::exited(vec!["compiler".to_string()], 1);

        assert_eq!(
            reporter.record(RunOutcome::new("c", "A", Verdict::Succeeded, ok)),
            Flow::Continue
        );
        assert_eq!(
            reporter.record(RunOutcome::new("c", "B", Verdict::FailedExecutionBuild, bad)),
            Flow::Abort
        );
        let (_, report) = reporter.into_parts();
        assert_eq!(report.exit_code(), 1);
    }
}
