#![warn(missing_docs)]
//! # samplerig
//!
//! Build-and-verify harness for catalogs of concurrent-program samples.
//!
//! samplerig drives two external tools over every sample of every configured
//! catalog:
//! - **Builder**: compiles a sample into a runnable artifact, then into a
//!   test-instrumented artifact
//! - **Tester**: explores a bounded number of schedules of a test artifact
//!
//! Tools run one at a time without a shell, with their output captured.
//! The first failing step ends the run (fail-fast); the legacy whole-solution
//! mode instead judges builds by their last output line and keeps going.
//!
//! ## Quick Start
//!
//! ```ignore
//! use samplerig::prelude::*;
//!
//! let config = HarnessConfig::load("harness.toml")?;
//! let plan = build_plan(&config.catalogs, None, None, None);
//! let options = RunOptions::new(RunMode::All, NonZeroU32::new(100).unwrap());
//! let (report, _) = run_plan(&config, &plan, &ProcessInvoker::new(), std::io::stdout(), options);
//! std::process::exit(report.exit_code());
//! ```

// Re-export core types
pub use samplerig_core::{
    BuildTarget, BuilderProtocol, Catalog, CatalogStyle, DEFAULT_SENTINEL, InvocationResult,
    InvokeError, MAX_OUTPUT_BYTES, ProcessInvoker, TRUNCATION_MARKER, TesterProtocol,
    TesterStats, ToolInvoker, artifact_path, matches_sentinel, sentinel_line,
};

// Re-export report types
pub use samplerig_report::{
    OutputFormat, ReportMeta, RunMode, RunOutcome, RunReport, RunSummary, Verdict,
    format_human_report, generate_json_report, render_report,
};

// Re-export harness
pub use samplerig_cli::{
    BatchBuild, BuildPurpose, BuilderConfig, CompilationPipeline, ConfigError, ExecutionPlan,
    Flow, HarnessConfig, HarnessError, Reporter, RunOptions, TestRunner, TesterConfig,
    build_plan, build_solution_plan, execute, run_plan,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Catalog, HarnessConfig, ProcessInvoker, RunMode, RunOptions, RunReport, ToolInvoker,
        Verdict, build_plan, build_solution_plan, run_plan,
    };
    pub use std::num::NonZeroU32;
}
