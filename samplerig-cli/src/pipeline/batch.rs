//! Whole-solution builds judged by output sentinel
//!
//! Builds each catalog's solution in one invocation and decides success from
//! the last line printed instead of the exit code. A mismatch is a soft
//! failure: the output is shown and the next catalog is built anyway.

use super::HarnessError;
use crate::config::BuilderConfig;
use crate::planner::ExecutionPlan;
use crate::reporter::{Flow, Reporter, solution_message};
use samplerig_core::{BuildTarget, Catalog, ToolInvoker, matches_sentinel, sentinel_line};
use samplerig_report::{RunOutcome, Verdict};
use std::io::Write;
use tracing::{debug, info, warn};

/// One builder invocation per catalog
pub struct BatchBuild<'a> {
    builder: &'a BuilderConfig,
    sentinel: &'a str,
}

impl<'a> BatchBuild<'a> {
    pub fn new(builder: &'a BuilderConfig, sentinel: &'a str) -> Self {
        Self { builder, sentinel }
    }

    pub fn target_for(&self, catalog: &Catalog) -> BuildTarget {
        let protocol = &self.builder.protocol;
        let mut flags = Vec::new();
        if self.builder.skip_analysis {
            flags.push(protocol.skip_analysis_flag.clone());
        }
        if let Some(bound) = self.builder.depth_bound {
            flags.push(protocol.depth_bound(bound));
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
            let target = self.target_for(catalog);
            let args = self.builder.protocol.solution_build_args(&target);
            debug!("{} {:?}", target.tool_path.display(), args);

            let result = reporter.run_step(&solution_message(&catalog.name), || {
                invoker.invoke(&target.tool_path, &args)
            })?;
            debug!(
                "'{}' builder exited with {} (not used in this mode)",
                catalog.name, result.exit_code
            );

            let verdict = if matches_sentinel(&result.stdout, self.sentinel) {
                info!("'{}' built", catalog.name);
                reporter.progress(&format!("'{}' built", catalog.name))?;
                Verdict::Succeeded
            } else {
                warn!(
                    "'{}' did not end with '{}' (last line: {:?})",
                    catalog.name,
                    self.sentinel,
                    sentinel_line(&result.stdout).unwrap_or("")
                );
                reporter.dump_output(&result)?;
                Verdict::SentinelMismatch
            };

            let outcome = RunOutcome::new(&catalog.name, &catalog.name, verdict, result);
            if reporter.record(outcome) == Flow::Abort {
                return Ok(Flow::Abort);
            }
        }
        Ok(Flow::Continue)
    }
}
