//! Sample catalogs and build targets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How the samples of a catalog are written and grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogStyle {
    /// Samples using the runtime as a plain library
    Library,
    /// Samples written in the language surface and compiled by the builder
    #[default]
    Language,
    /// Flat benchmark list
    Benchmark,
    /// Flat regression list
    Regression,
}

impl CatalogStyle {
    /// Lowercase name as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogStyle::Library => "library",
            CatalogStyle::Language => "language",
            CatalogStyle::Benchmark => "benchmark",
            CatalogStyle::Regression => "regression",
        }
    }
}

impl fmt::Display for CatalogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CatalogStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "library" | "lib" => Ok(CatalogStyle::Library),
            "language" | "lang" => Ok(CatalogStyle::Language),
            "benchmark" | "bench" => Ok(CatalogStyle::Benchmark),
            "regression" => Ok(CatalogStyle::Regression),
            other => Err(format!("Unknown catalog style: {}", other)),
        }
    }
}

/// Ordered collection of samples sharing one build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Unique name, used in progress output and reports
    pub name: String,
    #[serde(default)]
    pub style: CatalogStyle,
    /// Solution/manifest handed to the builder
    pub manifest: PathBuf,
    /// Sample identifiers, in the order they are attempted
    #[serde(default)]
    pub samples: Vec<String>,
    /// Builder binary for this catalog only
    #[serde(default)]
    pub builder: Option<PathBuf>,
    /// Directory holding this catalog's test artifacts
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
}

impl Catalog {
    /// Catalog with the default style and no per-catalog overrides.
    pub fn new(
        name: impl Into<String>,
        manifest: impl Into<PathBuf>,
        samples: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            style: CatalogStyle::default(),
            manifest: manifest.into(),
            samples: samples.into_iter().map(Into::into).collect(),
            builder: None,
            artifact_dir: None,
        }
    }

    pub fn with_style(mut self, style: CatalogStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Builder binary + manifest + extra flags for one pipeline phase.
///
/// Constructed once per catalog and reused for every sample in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub tool_path: PathBuf,
    pub manifest_path: PathBuf,
    /// Appended after the protocol flags on every invocation
    pub extra_flags: Vec<String>,
}

impl BuildTarget {
    pub fn new(tool_path: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
            manifest_path: manifest_path.into(),
            extra_flags: Vec::new(),
        }
    }

    pub fn with_extra_flags(mut self, flags: impl IntoIterator<Item = String>) -> Self {
        self.extra_flags.extend(flags);
        self
    }

    /// Target for `catalog`, honoring its builder override.
    pub fn for_catalog(catalog: &Catalog, default_tool: impl Into<PathBuf>) -> Self {
        let tool_path = catalog
            .builder
            .clone()
            .unwrap_or_else(|| default_tool.into());
        Self::new(tool_path, catalog.manifest.clone())
    }
}
