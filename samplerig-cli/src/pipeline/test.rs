//! Systematic testing of built artifacts
//!
//! Runs the tester once per sample against the test artifact produced by the
//! compile phase, with the same iteration bound for every sample. The
//! tester's report is always printed; a nonzero exit ends the run. The bug
//! and schedule counts it prints are attached to the outcome but never decide
//! the verdict.

use super::HarnessError;
use crate::config::TesterConfig;
use crate::planner::ExecutionPlan;
use crate::reporter::{Flow, Reporter, test_message};
use samplerig_core::{Catalog, TesterStats, ToolInvoker, artifact_path};
use samplerig_report::{RunOutcome, Verdict};
use std::io::Write;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Runs the tester over every planned sample
pub struct TestRunner<'a> {
    tester: &'a TesterConfig,
    iterations: NonZeroU32,
}

impl<'a> TestRunner<'a> {
    pub fn new(tester: &'a TesterConfig, iterations: NonZeroU32) -> Self {
        Self { tester, iterations }
    }

    /// Artifact the tester is pointed at for `sample`.
    ///
    /// Existence is not checked; a missing artifact shows up as a tester
    /// failure.
    pub fn artifact_for(&self, catalog: &Catalog, sample: &str) -> PathBuf {
        let dir: &Path = catalog
            .artifact_dir
            .as_deref()
            .unwrap_or(&self.tester.artifact_dir);
        artifact_path(dir, sample, &self.tester.artifact_extension)
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
                "Testing catalog '{}' ({} samples, {} iterations)",
                catalog.name,
                catalog.len(),
                self.iterations
            );

            for sample in &catalog.samples {
                if self.test_sample(catalog, sample, invoker, reporter)? == Flow::Abort {
                    return Ok(Flow::Abort);
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn test_sample<I, W>(
        &self,
        catalog: &Catalog,
        sample: &str,
        invoker: &I,
        reporter: &mut Reporter<W>,
    ) -> Result<Flow, HarnessError>
    where
        I: ToolInvoker,
        W: Write,
    {
        let artifact = self.artifact_for(catalog, sample);
        let args = self
            .tester
            .protocol
            .run_args(&artifact, self.iterations, &self.tester.extra_args);
        debug!("{} {:?}", self.tester.path.display(), args);

        let result = reporter.run_step(&test_message(sample, self.iterations.get()), || {
            invoker.invoke(&self.tester.path, &args)
        })?;
        reporter.dump_stdout(&result)?;

        let stats = TesterStats::parse(&result.stdout);
        if let Some(stats) = &stats {
            debug!(
                bugs = stats.bugs_found,
                schedules = stats.schedules_explored,
                "'{}' tester summary",
                sample
            );
        }

        if !result.succeeded() {
            error!(
                "'{}' failed testing (exit code {}{})",
                sample,
                result.exit_code,
                if result.timed_out { ", timed out" } else { "" }
            );
            if result.timed_out || !result.stderr.trim().is_empty() {
                // stdout was already shown above
                let rest = result.clone().with_stdout("");
                reporter.dump_output(&rest)?;
            }
            return Ok(reporter.record(
                RunOutcome::new(&catalog.name, sample, Verdict::FailedTestRun, result)
                    .with_tester_stats(stats),
            ));
        }

        Ok(reporter.record(
            RunOutcome::new(&catalog.name, sample, Verdict::Succeeded, result)
                .with_tester_stats(stats),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stub::ScriptedInvoker;
    use crate::planner::build_plan;
    use samplerig_report::{ReportMeta, RunMode, RunReport};
    use std::path::MAIN_SEPARATOR_STR;

    fn tester() -> TesterConfig {
        TesterConfig {
            path: "tester".into(),
            artifact_dir: "bin".into(),
            ..TesterConfig::default()
        }
    }

    fn artifact(dir: &str, sample: &str) -> String {
        format!("/test:{}{}{}.dll", dir, MAIN_SEPARATOR_STR, sample)
    }

    fn run(
        tester: &TesterConfig,
        iterations: u32,
        catalogs: &[Catalog],
        invoker: &ScriptedInvoker,
    ) -> (Flow, RunReport, String) {
        let plan = build_plan(catalogs, None, None, None);
        let mut reporter = Reporter::new(Vec::new(), ReportMeta::new(RunMode::Test));
        let iterations = NonZeroU32::new(iterations).unwrap();
        let flow = TestRunner::new(tester, iterations)
            .run(&plan, invoker, &mut reporter)
            .unwrap();
        let (out, report) = reporter.into_parts();
        (flow, report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn every_sample_gets_the_same_iteration_bound() {
        let catalogs = vec![Catalog::new("samples", "S.sln", ["Raft", "Chord"])];
        let invoker = ScriptedInvoker::new();
        let (flow, report, console) = run(&tester(), 1000, &catalogs, &invoker);

        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            invoker.argv(),
            vec![
                vec![artifact("bin", "Raft"), "/i:1000".to_string()],
                vec![artifact("bin", "Chord"), "/i:1000".to_string()],
            ]
        );
        assert_eq!(report.count(Verdict::Succeeded), 2);
        assert!(console.contains("testing 'Raft' for 1000 iterations"));
    }

    #[test]
    fn tester_output_is_always_printed() {
        let catalogs = vec![Catalog::new("samples", "S.sln", ["Raft"])];
        let invoker = ScriptedInvoker::new()
            .stdout_when(&artifact("bin", "Raft"), "... Found 0 bugs.\n");
        let (_, _, console) = run(&tester(), 10, &catalogs, &invoker);

        assert!(console.contains("... Found 0 bugs.\n"));
    }

    #[test]
    fn failing_sample_aborts_remaining() {
        let catalogs = vec![
            Catalog::new("first", "F.sln", ["A", "B", "C"]),
            Catalog::new("second", "G.sln", ["D"]),
        ];
        let invoker = ScriptedInvoker::new().fail_when(
            &artifact("bin", "B"),
            1,
            "... Found 1 bug.\n",
        );
        let (flow, report, console) = run(&tester(), 10, &catalogs, &invoker);

        assert_eq!(flow, Flow::Abort);
        assert_eq!(invoker.argv().len(), 2);
        let verdicts: Vec<_> = report.outcomes.iter().map(|o| o.verdict).collect();
        assert_eq!(verdicts, vec![Verdict::Succeeded, Verdict::FailedTestRun]);
        assert_eq!(console.matches("Found 1 bug").count(), 1);
    }

    #[test]
    fn timed_out_tester_aborts_the_run() {
        let catalogs = vec![Catalog::new("samples", "S.sln", ["A", "B"])];
        let invoker = ScriptedInvoker::new().timeout_when(&artifact("bin", "A"));
        let (flow, report, console) = run(&tester(), 10, &catalogs, &invoker);

        assert_eq!(flow, Flow::Abort);
        assert_eq!(invoker.argv().len(), 1);
        assert_eq!(report.outcomes[0].verdict, Verdict::FailedTestRun);
        assert!(report.outcomes[0].invocation.as_ref().unwrap().timed_out);
        assert_eq!(console.matches("(killed after exceeding the timeout)").count(), 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn tester_figures_are_attached_to_the_outcome() {
        let catalogs = vec![Catalog::new("samples", "S.sln", ["Raft", "Chord"])];
        let invoker = ScriptedInvoker::new()
            .stdout_when(
                &artifact("bin", "Raft"),
                "... Found 0 bugs.\n..... Explored 100 schedules\n",
            )
            .stdout_when(&artifact("bin", "Chord"), "no summary here\n");
        let (_, report, _) = run(&tester(), 100, &catalogs, &invoker);

        let stats = report.outcomes[0].tester_stats.as_ref().unwrap();
        assert_eq!(stats.bugs_found, 0);
        assert_eq!(stats.schedules_explored, 100);
        assert_eq!(report.outcomes[1].tester_stats, None);
    }

    #[test]
    fn reported_bugs_do_not_override_a_zero_exit() {
        let catalogs = vec![Catalog::new("samples", "S.sln", ["Raft"])];
        let invoker = ScriptedInvoker::new().stdout_when(
            &artifact("bin", "Raft"),
            "... Found 2 bugs.\n... Writing bin/Output/Raft_0.sci\n",
        );
        let (flow, report, _) = run(&tester(), 10, &catalogs, &invoker);

        assert_eq!(flow, Flow::Continue);
        assert_eq!(report.outcomes[0].verdict, Verdict::Succeeded);
        let stats = report.outcomes[0].tester_stats.as_ref().unwrap();
        assert_eq!(stats.bugs_found, 2);
        assert_eq!(stats.trace.as_deref(), Some("bin/Output/Raft_0.sci"));
    }

    #[test]
    fn catalog_artifact_dir_overrides_default() {
        let catalogs =
            vec![Catalog::new("racy", "R.sln", ["GermanRacy"]).with_artifact_dir("racy/bin")];
        let invoker = ScriptedInvoker::new();
        run(&tester(), 5, &catalogs, &invoker);

        assert_eq!(invoker.argv()[0][0], artifact("racy/bin", "GermanRacy"));
    }

    #[test]
    fn extra_args_follow_iterations() {
        let tester = TesterConfig {
            extra_args: vec!["/sch:random".to_string(), "/sch-seed:50".to_string()],
            ..tester()
        };
        let catalogs = vec![Catalog::new("samples", "S.sln", ["Raft"])];
        let invoker = ScriptedInvoker::new();
        run(&tester, 100, &catalogs, &invoker);

        assert_eq!(
            invoker.argv()[0],
            vec![
                artifact("bin", "Raft"),
                "/i:100".to_string(),
                "/sch:random".to_string(),
                "/sch-seed:50".to_string(),
            ]
        );
    }

    #[test]
    fn missing_artifact_is_not_checked() {
        let runner_config = tester();
        let runner = TestRunner::new(&runner_config, NonZeroU32::MIN);
        let catalog = Catalog::new("samples", "S.sln", ["Nope"]);
        let path = runner.artifact_for(&catalog, "Nope");
        assert!(!path.exists());

        let invoker = ScriptedInvoker::new();
        let (flow, _, _) = run(&runner_config, 1, &[catalog], &invoker);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(invoker.argv().len(), 1);
    }
}
