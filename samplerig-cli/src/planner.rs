//! Catalog Planner
//!
//! Builds the execution plan by selecting catalogs and samples.
//!
//! Filtering options:
//! - Regex pattern matching on sample ID
//! - Catalog name
//! - Catalog style
//!
//! Whole-solution builds work per catalog, so their plan ignores the sample
//! filter and keeps catalogs that list no samples at all.
//!
//! Ordering: catalogs and samples keep their declared order. The pipelines
//! attempt them in exactly that order, so nothing is sorted here.

use regex::Regex;
use samplerig_core::{Catalog, CatalogStyle};

/// Execution plan for a run
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Selected catalogs, each holding only its selected samples
    pub catalogs: Vec<Catalog>,
}

impl ExecutionPlan {
    /// Number of samples across all catalogs
    pub fn sample_count(&self) -> usize {
        self.catalogs.iter().map(Catalog::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    /// `(catalog, sample)` pairs in attempt order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.catalogs.iter().flat_map(|c| {
            c.samples
                .iter()
                .map(move |s| (c.name.as_str(), s.as_str()))
        })
    }
}

/// Build execution plan from configured catalogs
///
/// Catalogs left without samples after filtering are dropped.
pub fn build_plan<'a>(
    catalogs: impl IntoIterator<Item = &'a Catalog>,
    filter: Option<&Regex>,
    catalog: Option<&str>,
    style: Option<CatalogStyle>,
) -> ExecutionPlan {
    let selected = catalogs
        .into_iter()
        .filter(|c| catalog.is_none_or(|name| c.name == name))
        .filter(|c| style.is_none_or(|s| c.style == s))
        .filter_map(|c| {
            let samples: Vec<String> = c
                .samples
                .iter()
                .filter(|s| filter.is_none_or(|re| re.is_match(s)))
                .cloned()
                .collect();
            if samples.is_empty() {
                return None;
            }
            Some(Catalog {
                samples,
                ..c.clone()
            })
        })
        .collect();

    ExecutionPlan { catalogs: selected }
}

/// Build the plan for whole-solution builds
///
/// Only catalog name and style select; every matching catalog is kept, even
/// one with an empty sample list.
pub fn build_solution_plan<'a>(
    catalogs: impl IntoIterator<Item = &'a Catalog>,
    catalog: Option<&str>,
    style: Option<CatalogStyle>,
) -> ExecutionPlan {
    let selected = catalogs
        .into_iter()
        .filter(|c| catalog.is_none_or(|name| c.name == name))
        .filter(|c| style.is_none_or(|s| c.style == s))
        .cloned()
        .collect();

    ExecutionPlan { catalogs: selected }
}
