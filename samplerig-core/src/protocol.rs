//! Command-line protocol of the external builder and tester.
//!
//! Both tools are unmodified binaries, so the flag spellings here are a wire
//! format: each flag is a prefix glued directly to its value
//! (`/s:Samples.sln`, `/p:Raft`, `/i:100`) and passed as a single argument.

use crate::catalog::BuildTarget;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::num::NonZeroU32;
use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};

/// Flag spellings understood by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderProtocol {
    /// Solution/manifest selection prefix
    pub solution_flag: String,
    /// Project/sample selection prefix
    pub project_flag: String,
    /// Switches the artifact from runnable to test-instrumented
    pub test_flag: String,
    /// Skips the builder's static analysis
    pub skip_analysis_flag: String,
    /// Iteration/depth bound prefix used by whole-solution builds
    pub depth_bound_flag: String,
}

impl Default for BuilderProtocol {
    fn default() -> Self {
        Self {
            solution_flag: "/s:".to_string(),
            project_flag: "/p:".to_string(),
            test_flag: "/t:test".to_string(),
            skip_analysis_flag: "/nostatetransitionanalysis".to_string(),
            depth_bound_flag: "/i:".to_string(),
        }
    }
}

impl BuilderProtocol {
    pub fn solution(&self, manifest: &Path) -> String {
        format!("{}{}", self.solution_flag, manifest.display())
    }

    pub fn project(&self, sample: &str) -> String {
        format!("{}{}", self.project_flag, sample)
    }

    pub fn depth_bound(&self, bound: u32) -> String {
        format!("{}{}", self.depth_bound_flag, bound)
    }

    /// Arguments for building `sample` as a normal runnable artifact.
    pub fn execution_build_args(&self, target: &BuildTarget, sample: &str) -> Vec<String> {
        let mut args = vec![
            self.solution(&target.manifest_path),
            self.project(sample),
        ];
        args.extend(target.extra_flags.iter().cloned());
        args
    }

    /// Arguments for building `sample` as a test-instrumented artifact.
    pub fn test_build_args(&self, target: &BuildTarget, sample: &str) -> Vec<String> {
        let mut args = vec![
            self.solution(&target.manifest_path),
            self.project(sample),
            self.test_flag.clone(),
        ];
        args.extend(target.extra_flags.iter().cloned());
        args
    }

    /// Arguments for building every project of the solution in one go.
    pub fn solution_build_args(&self, target: &BuildTarget) -> Vec<String> {
        let mut args = vec![self.solution(&target.manifest_path)];
        args.extend(target.extra_flags.iter().cloned());
        args
    }
}

/// Flag spellings understood by the tester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterProtocol {
    /// Test-artifact selection prefix
    pub test_flag: String,
    /// Iteration-count prefix
    pub iterations_flag: String,
}

impl Default for TesterProtocol {
    fn default() -> Self {
        Self {
            test_flag: "/test:".to_string(),
            iterations_flag: "/i:".to_string(),
        }
    }
}

impl TesterProtocol {
    /// Arguments for exploring `artifact` for `iterations` schedules.
    pub fn run_args(
        &self,
        artifact: &Path,
        iterations: NonZeroU32,
        extra: &[String],
    ) -> Vec<String> {
        let mut args = vec![
            format!("{}{}", self.test_flag, artifact.display()),
            format!("{}{}", self.iterations_flag, iterations),
        ];
        args.extend(extra.iter().cloned());
        args
    }
}

/// `artifact_dir + separator + sample + extension`, concatenated verbatim.
pub fn artifact_path(artifact_dir: &Path, sample: &str, extension: &str) -> PathBuf {
    let mut path = OsString::from(artifact_dir.as_os_str());
    path.push(MAIN_SEPARATOR_STR);
    path.push(sample);
    path.push(extension);
    PathBuf::from(path)
}
