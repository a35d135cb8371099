//! Harness Pipelines
//!
//! Drives the external tools over an [`ExecutionPlan`]. One child process is
//! in flight at a time; catalogs and samples are attempted in plan order.
//!
//! ## Modes
//!
//! ```text
//!  compile ──► CompilationPipeline   execution build, then test build, per sample
//!  test    ──► TestRunner            tester over each sample's test artifact
//!  all     ──► compile, then test    test only runs if compile never aborted
//!  batch   ──► BatchBuild            one whole-solution build per catalog
//! ```
//!
//! Hard failures (nonzero exit or timeout in compile/test) end the run at
//! once. Sentinel mismatches in batch mode are recorded and skipped. A tool
//! that cannot be launched ends the run with an error in every mode.
//!
//! ## Modules
//!
//! - [`compile`] - Two-phase per-sample build
//! - [`test`] - Systematic testing of built artifacts
//! - [`batch`] - Whole-solution builds judged by output sentinel

pub mod batch;
pub mod compile;
pub mod test;

pub use batch::BatchBuild;
pub use compile::CompilationPipeline;
pub use test::TestRunner;

use crate::config::HarnessConfig;
use crate::planner::ExecutionPlan;
use crate::reporter::{Flow, Reporter};
use samplerig_core::{InvokeError, ToolInvoker};
use samplerig_report::{ReportMeta, RunMode, RunReport};
use std::io::{self, Write};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Errors that end a run without a verdict
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("Failed to write console output: {0}")]
    Output(#[from] io::Error),
}

/// Per-run settings layered over the configuration file
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Tester iteration bound, fixed for the whole run
    pub iterations: NonZeroU32,
    /// Recorded in the report; enforcement lives in the invoker
    pub timeout: Option<Duration>,
    pub show_spinner: bool,
}

impl RunOptions {
    pub fn new(mode: RunMode, iterations: NonZeroU32) -> Self {
        Self {
            mode,
            iterations,
            timeout: None,
            show_spinner: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_spinner(mut self, show: bool) -> Self {
        self.show_spinner = show;
        self
    }

    fn meta(&self) -> ReportMeta {
        let mut meta = ReportMeta::new(self.mode);
        if matches!(self.mode, RunMode::All | RunMode::Test) {
            meta.iterations = Some(self.iterations.get());
        }
        meta.timeout_ms = self.timeout.map(|t| t.as_millis() as u64);
        meta
    }
}

/// Run the pipeline selected by `options.mode` over `plan`.
///
/// Console output goes to `out`. The returned report is complete even when
/// the run ended early: a fatal error is stored in `RunReport::error`.
pub fn run_plan<I, W>(
    config: &HarnessConfig,
    plan: &ExecutionPlan,
    invoker: &I,
    out: W,
    options: RunOptions,
) -> (RunReport, W)
where
    I: ToolInvoker,
    W: Write,
{
    let mut reporter = Reporter::new(out, options.meta()).with_spinner(options.show_spinner);

    info!(
        "Running {:?} over {} catalogs ({} samples)",
        options.mode,
        plan.catalogs.len(),
        plan.sample_count()
    );

    if let Err(e) = execute(config, plan, invoker, &mut reporter, options) {
        error!("Run aborted: {}", e);
        reporter.abort_with_error(e.to_string());
    }

    let (out, report) = reporter.into_parts();
    info!(
        "Finished: {} attempted, {} succeeded, {} hard failures, {} soft failures",
        report.summary.attempted,
        report.summary.succeeded,
        report.summary.hard_failures,
        report.summary.soft_failures
    );
    (report, out)
}

/// Dispatch on mode, feeding outcomes to `reporter`.
pub fn execute<I, W>(
    config: &HarnessConfig,
    plan: &ExecutionPlan,
    invoker: &I,
    reporter: &mut Reporter<W>,
    options: RunOptions,
) -> Result<Flow, HarnessError>
where
    I: ToolInvoker,
    W: Write,
{
    match options.mode {
        RunMode::Compile => CompilationPipeline::new(&config.builder).run(plan, invoker, reporter),
        RunMode::Test => {
            TestRunner::new(&config.tester, options.iterations).run(plan, invoker, reporter)
        }
        RunMode::All => {
            let flow = CompilationPipeline::new(&config.builder).run(plan, invoker, reporter)?;
            if flow == Flow::Abort {
                return Ok(flow);
            }
            TestRunner::new(&config.tester, options.iterations).run(plan, invoker, reporter)
        }
        RunMode::Batch => {
            BatchBuild::new(&config.builder, &config.runner.sentinel).run(plan, invoker, reporter)
        }
    }
}
