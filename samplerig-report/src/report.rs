//! Report Data Structures

use chrono::{DateTime, Utc};
use samplerig_core::{InvocationResult, TesterStats};
use serde::{Deserialize, Serialize};

/// Per-sample verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Every step for the sample succeeded
    Succeeded,
    /// The runnable build failed
    FailedExecutionBuild,
    /// The test-instrumented build failed
    FailedTestBuild,
    /// The tester reported a failure
    FailedTestRun,
    /// Whole-solution output lacked the success sentinel (soft failure)
    SentinelMismatch,
}

impl Verdict {
    /// Failures that abort the remaining batch.
    pub fn is_hard_failure(self) -> bool {
        matches!(
            self,
            Verdict::FailedExecutionBuild | Verdict::FailedTestBuild | Verdict::FailedTestRun
        )
    }

    /// Failures that are surfaced but let the batch continue.
    pub fn is_soft_failure(self) -> bool {
        matches!(self, Verdict::SentinelMismatch)
    }

    /// Short human description.
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Succeeded => "succeeded",
            Verdict::FailedExecutionBuild => "failed execution build",
            Verdict::FailedTestBuild => "failed test build",
            Verdict::FailedTestRun => "failed test run",
            Verdict::SentinelMismatch => "success sentinel missing",
        }
    }
}

/// Which pipeline produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Compile then test
    All,
    /// Two-phase per-sample build
    Compile,
    /// Systematic testing of built artifacts
    Test,
    /// Whole-solution builds judged by output sentinel
    Batch,
}

/// Verdict for one sample (or one whole-solution build in batch mode)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub catalog: String,
    pub sample: String,
    pub verdict: Verdict,
    /// Invocation that decided the verdict
    pub invocation: Option<InvocationResult>,
    /// Figures the tester printed, for tester runs that printed any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tester_stats: Option<TesterStats>,
}

impl RunOutcome {
    /// Outcome decided by `invocation`.
    pub fn new(
        catalog: impl Into<String>,
        sample: impl Into<String>,
        verdict: Verdict,
        invocation: InvocationResult,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            sample: sample.into(),
            verdict,
            invocation: Some(invocation),
            tester_stats: None,
        }
    }

    /// Attach tester statistics.
    pub fn with_tester_stats(mut self, stats: Option<TesterStats>) -> Self {
        self.tester_stats = stats;
        self
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub version: String,
    pub mode: RunMode,
    pub timestamp: DateTime<Utc>,
    /// Tester iteration bound, when the run tests
    pub iterations: Option<u32>,
    /// Per-invocation timeout, when configured
    pub timeout_ms: Option<u64>,
}

impl ReportMeta {
    /// Metadata stamped with the current time.
    pub fn new(mode: RunMode) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode,
            timestamp: Utc::now(),
            iterations: None,
            timeout_ms: None,
        }
    }
}

/// Report summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub hard_failures: usize,
    pub soft_failures: usize,
    pub total_duration_ms: f64,
}

/// Ordered outcomes of one harness run.
///
/// The run is marked aborted on the first hard failure; nothing is attempted
/// after it, so `outcomes` is a prefix of the planned work in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub meta: ReportMeta,
    pub outcomes: Vec<RunOutcome>,
    pub aborted: bool,
    /// Fatal error that ended the run, if any
    pub error: Option<String>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Empty report.
    pub fn new(meta: ReportMeta) -> Self {
        Self {
            meta,
            outcomes: Vec::new(),
            aborted: false,
            error: None,
            summary: RunSummary::default(),
        }
    }

    /// Append `outcome`; returns `false` once the run must stop.
    pub fn record(&mut self, outcome: RunOutcome) -> bool {
        self.summary.attempted += 1;
        match outcome.verdict {
            Verdict::Succeeded => self.summary.succeeded += 1,
            v if v.is_hard_failure() => {
                self.summary.hard_failures += 1;
                self.aborted = true;
            }
            _ => self.summary.soft_failures += 1,
        }
        if let Some(invocation) = &outcome.invocation {
            self.summary.total_duration_ms += invocation.duration_ms as f64;
        }
        self.outcomes.push(outcome);
        !self.aborted
    }

    /// Mark the run aborted by an error that produced no outcome.
    pub fn abort_with_error(&mut self, message: impl Into<String>) {
        self.aborted = true;
        self.error = Some(message.into());
    }

    /// No fail-fast abort and no fatal error.
    pub fn passed(&self) -> bool {
        !self.aborted
    }

    /// Process exit code for this report.
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }

    /// Outcomes whose verdict is `verdict`.
    pub fn count(&self, verdict: Verdict) -> usize {
        self.outcomes.iter().filter(|o| o.verdict == verdict).count()
    }

    /// First hard failure, if the run was aborted by one.
    pub fn first_failure(&self) -> Option<&RunOutcome> {
        self.outcomes.iter().find(|o| o.verdict.is_hard_failure())
    }
}
