//! Tester output statistics
//!
//! The tester prints a few summary lines next to its exit code: how many bugs
//! it found, how many schedules it explored, and where it wrote the coverage
//! trace. They are informational only; the exit code alone decides a verdict.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static BUGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Found (\d+) bugs?\.").expect("valid regex"));
static SCHEDULES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Explored (\d+) schedule").expect("valid regex"));
static TRACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Writing (\S.*\.sci)\s*$").expect("valid regex"));

/// Summary figures reported by one tester run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesterStats {
    pub bugs_found: u64,
    pub schedules_explored: u64,
    /// Coverage trace file written by the tester
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl TesterStats {
    /// Scan tester stdout for summary lines.
    ///
    /// Returns `None` when no line matched. A figure printed more than once
    /// keeps its last value.
    pub fn parse(stdout: &str) -> Option<Self> {
        let mut stats = TesterStats::default();
        let mut matched = false;

        for line in stdout.lines() {
            if let Some(n) = capture_number(&BUGS_RE, line) {
                stats.bugs_found = n;
                matched = true;
            }
            if let Some(n) = capture_number(&SCHEDULES_RE, line) {
                stats.schedules_explored = n;
                matched = true;
            }
            if let Some(caps) = TRACE_RE.captures(line) {
                stats.trace = Some(caps[1].to_string());
                matched = true;
            }
        }

        matched.then_some(stats)
    }
}

fn capture_number(re: &Regex, line: &str) -> Option<u64> {
    re.captures(line).and_then(|caps| caps[1].parse().ok())
}
