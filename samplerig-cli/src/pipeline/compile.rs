//! Two-phase per-sample build
//!
//! Every sample is built twice: once as a runnable artifact and once as a
//! test-instrumented artifact. The first nonzero exit ends the whole run,
//! including catalogs not reached yet. Builder output is only shown for the
//! build that failed.

use super::HarnessError;
use crate::config::BuilderConfig;
use crate::planner::ExecutionPlan;
use crate::reporter::{BuildPurpose, Flow, Reporter, build_message};
use samplerig_core::{BuildTarget, Catalog, InvocationResult, ToolInvoker};
use samplerig_report::{RunOutcome, Verdict};
use std::io::Write;
use tracing::{debug, error, info};

/// Builds each sample for execution, then for testing
pub struct CompilationPipeline<'a> {
    builder: &'a BuilderConfig,
}

impl<'a> CompilationPipeline<'a> {
    pub fn new(builder: &'a BuilderConfig) -> Self {
        Self { builder }
    }

    /// Target shared by every sample of `catalog`
    pub fn target_for(&self, catalog: &Catalog) -> BuildTarget {
        let mut flags = Vec::new();
        if self.builder.skip_analysis {
            flags.push(self.builder.protocol.skip_analysis_flag.clone());
        }
        flags.extend(self.builder.extra_args.iter().cloned());
        BuildTarget::for_catalog(catalog, &self.builder.path).with_extra_flags(flags)
    }

    pub fn run<I, W>(
        &self,
        plan: &ExecutionPlan,
        invoker: &I,
        reporter: &mut Reporter<W>,
    ) -> Result<Flow, HarnessError>
    where
        I: ToolInvoker,
        W: Write,
    {
        for catalog in &plan.catalogs {
            info!(
                "Compiling catalog '{}' ({} samples)",
                catalog.name,
                catalog.len()
            );
            let target = self.target_for(catalog);

            for sample in &catalog.samples {
                if self.build_sample(catalog, &target, sample, invoker, reporter)? == Flow::Abort {
                    return Ok(Flow::Abort);
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn build_sample<I, W>(
        &self,
        catalog: &Catalog,
        target: &BuildTarget,
        sample: &str,
        invoker: &I,
        reporter: &mut Reporter<W>,
    ) -> Result<Flow, HarnessError>
    where
        I: ToolInvoker,
        W: Write,
    {
        let protocol = &self.builder.protocol;

        let args = protocol.execution_build_args(target, sample);
        let result = self.build(target, &args, sample, BuildPurpose::Execution, invoker, reporter)?;
        if !result.succeeded() {
            return fail(catalog, sample, Verdict::FailedExecutionBuild, result, reporter);
        }

        let args = protocol.test_build_args(target, sample);
        let result = self.build(target, &args, sample, BuildPurpose::Testing, invoker, reporter)?;
        if !result.succeeded() {
            return fail(catalog, sample, Verdict::FailedTestBuild, result, reporter);
        }

        Ok(reporter.record(RunOutcome::new(
            &catalog.name,
            sample,
            Verdict::Succeeded,
            result,
        )))
    }

    fn build<I, W>(
        &self,
        target: &BuildTarget,
        args: &[String],
        sample: &str,
        purpose: BuildPurpose,
        invoker: &I,
        reporter: &mut Reporter<W>,
    ) -> Result<InvocationResult, HarnessError>
    where
        I: ToolInvoker,
        W: Write,
    {
        debug!("{} {:?}", target.tool_path.display(), args);
        reporter.run_step(&build_message(sample, purpose), || {
            invoker.invoke(&target.tool_path, args)
        })
    }
}

fn fail<W: Write>(
    catalog: &Catalog,
    sample: &str,
    verdict: Verdict,
    result: InvocationResult,
    reporter: &mut Reporter<W>,
) -> Result<Flow, HarnessError> {
    error!(
        "'{}' {} (exit code {}{})",
        sample,
        verdict.label(),
        result.exit_code,
        if result.timed_out { ", timed out" } else { "" }
    );
    reporter.dump_output(&result)?;
    Ok(reporter.record(RunOutcome::new(&catalog.name, sample, verdict, result)))
}
