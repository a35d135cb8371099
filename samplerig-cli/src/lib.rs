//! samplerig CLI
//!
//! Command-line driver for the harness.
//!
//! ## Usage
//!
//! ```text
//! samplerig                      # compile, then test, every configured sample
//! samplerig '^Raft$'             # only samples matching the pattern
//! samplerig compile --catalog library
//! samplerig test -i 1000 --timeout 30m
//! samplerig batch --format json -o report.json
//! samplerig list
//! samplerig init
//! ```
//!
//! The exit code is 0 when the run completed without a hard failure and 1
//! otherwise.

pub mod config;
pub mod pipeline;
pub mod planner;
pub mod reporter;

pub use config::{
    BuilderConfig, CONFIG_FILE_NAME, ConfigError, HarnessConfig, OutputConfig, RunnerConfig,
    TesterConfig,
};
pub use pipeline::{
    BatchBuild, CompilationPipeline, HarnessError, RunOptions, TestRunner, execute, run_plan,
};
pub use planner::{ExecutionPlan, build_plan, build_solution_plan};
pub use reporter::{
    BuildPurpose, Flow, Reporter, build_message, solution_message, test_message,
};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use regex::Regex;
use samplerig_core::{CatalogStyle, ProcessInvoker};
use samplerig_report::{OutputFormat, RunMode, RunReport, render_report};
use std::io::{self, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// samplerig CLI arguments
#[derive(Parser, Debug)]
#[command(name = "samplerig")]
#[command(
    author,
    version,
    about = "samplerig - build and systematically test sample catalogs"
)]
pub struct Cli {
    /// Optional subcommand; defaults to `all`
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter samples by regex pattern
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Only this catalog
    #[arg(long, global = true)]
    pub catalog: Option<String>,

    /// Only catalogs of this style: library, language, benchmark, regression
    #[arg(long, global = true)]
    pub style: Option<CatalogStyle>,

    /// Configuration file (default: harness.toml found by walking up)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Tester iterations per sample (overrides tester.iterations)
    #[arg(short, long, global = true)]
    pub iterations: Option<NonZeroU32>,

    /// Kill any tool running longer than this, e.g. "90s" or "30m"
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Output format: human, json
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// No spinner while tools run
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Compile every sample, then test every sample (default)
    All,
    /// Build each sample for execution and for testing
    Compile,
    /// Run the tester against previously built artifacts
    Test,
    /// Build whole solutions and check the builder's last output line
    Batch,
    /// Print the samples that would run
    List,
    /// Write a default harness.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    fn mode(self) -> Option<RunMode> {
        match self {
            Commands::All => Some(RunMode::All),
            Commands::Compile => Some(RunMode::Compile),
            Commands::Test => Some(RunMode::Test),
            Commands::Batch => Some(RunMode::Batch),
            Commands::List | Commands::Init { .. } => None,
        }
    }
}

/// Run the samplerig CLI with the process arguments.
///
/// # Returns
/// The process exit code, or an error for configuration and I/O problems.
pub fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the samplerig CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<i32> {
    init_logging(cli.verbose);

    let command = cli.command.unwrap_or(Commands::All);
    if let Commands::Init { force } = command {
        init_config(cli.config.as_deref(), force)?;
        return Ok(0);
    }

    let config = load_config(cli.config.as_deref())?;

    let filter = Regex::new(&cli.filter)
        .with_context(|| format!("Invalid filter pattern '{}'", cli.filter))?;
    if let Some(name) = &cli.catalog {
        if !config.catalogs.iter().any(|c| &c.name == name) {
            let known: Vec<&str> = config.catalogs.iter().map(|c| c.name.as_str()).collect();
            bail!("Unknown catalog '{}'. Available: {}", name, known.join(", "));
        }
    }
    let plan = if command == Commands::Batch {
        if cli.filter != ".*" {
            warn!("Sample filter '{}' is ignored by batch builds", cli.filter);
        }
        build_solution_plan(&config.catalogs, cli.catalog.as_deref(), cli.style)
    } else {
        build_plan(&config.catalogs, Some(&filter), cli.catalog.as_deref(), cli.style)
    };

    match command.mode() {
        Some(mode) => run_mode(&cli, &config, &plan, mode),
        None => {
            write_plan(&mut io::stdout().lock(), &plan)?;
            Ok(0)
        }
    }
}

/// Initialize tracing to stderr; `RUST_LOG` takes precedence
fn init_logging(verbose: bool) {
    let default = if verbose {
        "samplerig=debug"
    } else {
        "samplerig=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    if let Some(path) = path {
        let config = HarnessConfig::load(path)
            .with_context(|| format!("Could not load configuration {}", path.display()))?;
        info!("Using {}", path.display());
        return Ok(config);
    }

    match HarnessConfig::discover()? {
        Some((path, config)) => {
            info!("Using {}", path.display());
            Ok(config)
        }
        None => {
            warn!(
                "No {} found; run `samplerig init` to create one",
                CONFIG_FILE_NAME
            );
            Ok(HarnessConfig::default())
        }
    }
}

fn init_config(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = path.map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), Path::to_path_buf);
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    std::fs::write(&path, HarnessConfig::default_toml())
        .with_context(|| format!("Could not write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

/// Print the plan as a tree
pub fn write_plan(out: &mut impl Write, plan: &ExecutionPlan) -> io::Result<()> {
    writeln!(out, "samplerig Plan:")?;
    for catalog in &plan.catalogs {
        writeln!(
            out,
            "├── catalog: {} [{}] ({})",
            catalog.name,
            catalog.style,
            catalog.manifest.display()
        )?;
        for sample in &catalog.samples {
            writeln!(out, "│   ├── {}", sample)?;
        }
    }
    writeln!(
        out,
        "{} samples in {} catalogs.",
        plan.sample_count(),
        plan.catalogs.len()
    )
}

fn run_mode(
    cli: &Cli,
    config: &HarnessConfig,
    plan: &ExecutionPlan,
    mode: RunMode,
) -> anyhow::Result<i32> {
    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let output_path = cli.output.clone().or_else(|| config.output.path.clone());

    let iterations = match cli.iterations {
        Some(n) => n,
        None => NonZeroU32::new(config.tester.iterations)
            .context("tester.iterations must be a positive integer")?,
    };
    let timeout = match &cli.timeout {
        Some(s) => Some(HarnessConfig::parse_duration(s)?),
        None => config.timeout()?,
    };

    if plan.is_empty() {
        if mode == RunMode::Batch {
            println!("No catalogs selected.");
        } else {
            println!("No samples selected.");
        }
        return Ok(0);
    }

    // Keep stdout clean for a JSON report
    let console: Box<dyn Write> = if format == OutputFormat::Json && output_path.is_none() {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    };

    let invoker = ProcessInvoker::with_timeout(timeout);
    let options = RunOptions::new(mode, iterations)
        .with_timeout(invoker.timeout())
        .with_spinner(!cli.quiet);
    let (report, mut console) = run_plan(config, plan, &invoker, console, options);
    console.flush()?;

    let output = render_report(&report, format)?;
    match &output_path {
        Some(path) => {
            write_report_file(path, &output)?;
            println!("Report written to: {}", path.display());
        }
        None => print!("{}", output),
    }

    print_failure_summary(&report);
    Ok(report.exit_code())
}

fn write_report_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
    }
    std::fs::write(path, contents).with_context(|| format!("Could not write {}", path.display()))
}

fn print_failure_summary(report: &RunReport) {
    if let Some(error) = &report.error {
        eprintln!("\nRun aborted: {}", error);
    } else if let Some(failure) = report.first_failure() {
        eprintln!(
            "\nRun aborted: '{}' in catalog '{}' {}",
            failure.sample,
            failure.catalog,
            failure.verdict.label()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samplerig_core::Catalog;

    #[test]
    fn defaults_to_all_with_match_everything_filter() {
        let cli = Cli::try_parse_from(["samplerig"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.filter, ".*");
        assert!(cli.iterations.is_none());
        assert!(!cli.quiet);
    }

    #[test]
    fn positional_filter() {
        let cli = Cli::try_parse_from(["samplerig", "^Raft$"]).unwrap();
        assert_eq!(cli.filter, "^Raft$");
    }

    #[test]
    fn options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "samplerig",
            "test",
            "-i",
            "1000",
            "--catalog",
            "library",
            "--timeout",
            "30m",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Test));
        assert_eq!(cli.iterations.map(NonZeroU32::get), Some(1000));
        assert_eq!(cli.catalog.as_deref(), Some("library"));
        assert_eq!(cli.timeout.as_deref(), Some("30m"));
    }

    #[test]
    fn zero_iterations_rejected() {
        assert!(Cli::try_parse_from(["samplerig", "test", "-i", "0"]).is_err());
    }

    #[test]
    fn style_parses() {
        let cli = Cli::try_parse_from(["samplerig", "batch", "--style", "regression"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Batch));
        assert_eq!(cli.style, Some(CatalogStyle::Regression));
        assert!(Cli::try_parse_from(["samplerig", "--style", "gui"]).is_err());
    }

    #[test]
    fn init_force_flag() {
        let cli = Cli::try_parse_from(["samplerig", "init", "--force"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Init { force: true }));
        assert_eq!(Commands::Init { force: true }.mode(), None);
        assert_eq!(Commands::Compile.mode(), Some(RunMode::Compile));
    }

    #[test]
    fn plan_tree() {
        let catalogs = vec![Catalog::new("library", "Lib.sln", ["Raft", "Chord"])];
        let plan = build_plan(&catalogs, None, None, None);
        let mut out = Vec::new();
        write_plan(&mut out, &plan).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("samplerig Plan:\n├── catalog: library [language] (Lib.sln)\n"));
        assert!(text.contains("│   ├── Raft\n│   ├── Chord\n"));
        assert!(text.ends_with("2 samples in 1 catalogs.\n"));
    }

    #[test]
    fn batch_plan_tree_lists_catalogs_without_samples() {
        let catalogs = vec![Catalog::new("whole", "Whole.sln", Vec::<String>::new())];
        let plan = build_solution_plan(&catalogs, None, None);
        let mut out = Vec::new();
        write_plan(&mut out, &plan).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("├── catalog: whole [language] (Whole.sln)\n"));
        assert!(text.ends_with("0 samples in 1 catalogs.\n"));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        init_config(Some(&path), false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, HarnessConfig::default_toml());

        assert!(init_config(Some(&path), false).is_err());
        init_config(Some(&path), true).unwrap();
    }

    #[test]
    fn report_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target").join("samplerig").join("report.json");
        write_report_file(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
