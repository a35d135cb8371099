//! Configuration loading from harness.toml
//!
//! The harness is configured by a `harness.toml` file holding the tool paths,
//! the tools' flag protocols, and the sample catalogs. The file is discovered
//! by walking up from the current directory, or given explicitly.

use samplerig_core::{BuilderProtocol, Catalog, DEFAULT_SENTINEL, TesterProtocol};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file looked for during discovery
pub const CONFIG_FILE_NAME: &str = "harness.toml";

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid duration '{0}'")]
    Duration(String),
}

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Builder tool configuration
    #[serde(default)]
    pub builder: BuilderConfig,
    /// Tester tool configuration
    #[serde(default)]
    pub tester: TesterConfig,
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Sample catalogs, processed in declared order
    #[serde(default, rename = "catalog")]
    pub catalogs: Vec<Catalog>,
}

/// Builder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Builder binary
    pub path: PathBuf,
    /// Flag spellings
    #[serde(flatten)]
    pub protocol: BuilderProtocol,
    /// Pass the skip-analysis flag on every build
    pub skip_analysis: bool,
    /// Depth bound for whole-solution builds
    pub depth_bound: Option<u32>,
    /// Appended to every builder invocation
    pub extra_args: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("Binaries/PSharpCompiler.exe"),
            protocol: BuilderProtocol::default(),
            skip_analysis: false,
            depth_bound: None,
            extra_args: Vec::new(),
        }
    }
}

/// Tester configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    /// Tester binary
    pub path: PathBuf,
    /// Flag spellings
    #[serde(flatten)]
    pub protocol: TesterProtocol,
    /// Schedules explored per sample
    pub iterations: u32,
    /// Directory holding test artifacts (overridable per catalog)
    pub artifact_dir: PathBuf,
    /// Extension appended to the sample name to form the artifact file name
    pub artifact_extension: String,
    /// Appended to every tester invocation
    pub extra_args: Vec<String>,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("Binaries/PSharpTester.exe"),
            protocol: TesterProtocol::default(),
            iterations: default_iterations(),
            artifact_dir: PathBuf::from("Binaries/Debug"),
            artifact_extension: ".dll".to_string(),
            extra_args: Vec::new(),
        }
    }
}

fn default_iterations() -> u32 {
    100
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Per-invocation timeout (e.g., "90s", "30m"); unset waits forever
    #[serde(default)]
    pub timeout: Option<String>,
    /// Success line of whole-solution builds
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            sentinel: default_sentinel(),
        }
    }
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Report format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Report file (stdout if not set)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            path: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl HarnessConfig {
    /// Parse configuration from TOML text without touching paths
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a TOML file, resolving relative paths
    /// against the file's directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content, path)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Walk up from `start` looking for [`CONFIG_FILE_NAME`]
    pub fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Discover and load configuration starting at the current directory
    pub fn discover() -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let Ok(cwd) = std::env::current_dir() else {
            return Ok(None);
        };
        match Self::discover_from(&cwd) {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok(Some((path, config)))
            }
            None => Ok(None),
        }
    }

    /// Check invariants the pipelines rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tester.iterations == 0 {
            return Err(ConfigError::Invalid(
                "tester.iterations must be a positive integer".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for catalog in &self.catalogs {
            if catalog.name.trim().is_empty() {
                return Err(ConfigError::Invalid("catalog with empty name".to_string()));
            }
            if !names.insert(catalog.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate catalog name '{}'",
                    catalog.name
                )));
            }
            if catalog.manifest.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "catalog '{}' has no manifest",
                    catalog.name
                )));
            }
        }

        if let Some(timeout) = &self.runner.timeout {
            Self::parse_duration(timeout)?;
        }

        Ok(())
    }

    /// Make relative paths absolute against `base`.
    ///
    /// Tool paths without a directory component are left alone so they are
    /// still looked up on PATH.
    pub fn resolve_paths(&mut self, base: &Path) {
        resolve_tool(&mut self.builder.path, base);
        resolve_tool(&mut self.tester.path, base);
        resolve_file(&mut self.tester.artifact_dir, base);
        if let Some(path) = self.output.path.as_mut() {
            resolve_file(path, base);
        }
        for catalog in &mut self.catalogs {
            resolve_file(&mut catalog.manifest, base);
            if let Some(builder) = catalog.builder.as_mut() {
                resolve_tool(builder, base);
            }
            if let Some(dir) = catalog.artifact_dir.as_mut() {
                resolve_file(dir, base);
            }
        }
    }

    /// Configured timeout, parsed
    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.runner
            .timeout
            .as_deref()
            .map(Self::parse_duration)
            .transpose()
    }

    /// Default configuration as TOML string
    pub fn default_toml() -> &'static str {
        include_str!("default_harness.toml")
    }

    /// Parse duration string (e.g., "500ms", "90s", "30m", "1h")
    pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::Duration(s.to_string()));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| ConfigError::Duration(s.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Duration(s.to_string()));
        }

        let multiplier_ns: f64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" | "" => 1_000_000_000.0,
            "m" | "min" => 60_000_000_000.0,
            "h" => 3_600_000_000_000.0,
            _ => return Err(ConfigError::Duration(s.to_string())),
        };

        Ok(Duration::from_nanos((value * multiplier_ns) as u64))
    }
}

fn resolve_tool(path: &mut PathBuf, base: &Path) {
    if path.components().count() > 1 {
        resolve_file(path, base);
    }
}

fn resolve_file(path: &mut PathBuf, base: &Path) {
    if path.is_relative() && !path.as_os_str().is_empty() {
        *path = base.join(&*path);
    }
}
