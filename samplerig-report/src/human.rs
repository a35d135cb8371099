//! Human Output
//!
//! Terminal summary of a run: outcomes grouped by catalog in the order they
//! were attempted, followed by totals and the overall status.

use crate::report::{RunOutcome, RunReport, Verdict};

/// Format a report for terminal display
pub fn format_human_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("samplerig Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    // Catalogs in first-seen order; attempts never interleave across catalogs
    let mut groups: Vec<(&str, Vec<&RunOutcome>)> = Vec::new();
    for outcome in &report.outcomes {
        let same_catalog = groups
            .last()
            .is_some_and(|(name, _)| *name == outcome.catalog.as_str());
        if same_catalog {
            if let Some((_, outcomes)) = groups.last_mut() {
                outcomes.push(outcome);
            }
        } else {
            groups.push((outcome.catalog.as_str(), vec![outcome]));
        }
    }

    for (catalog, outcomes) in groups {
        output.push_str(&format!("Catalog: {}\n", catalog));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for outcome in outcomes {
            let icon = match outcome.verdict {
                Verdict::Succeeded => "✓",
                Verdict::SentinelMismatch => "⚠",
                _ => "✗",
            };
            output.push_str(&format!("  {} {}", icon, outcome.sample));

            if outcome.verdict != Verdict::Succeeded {
                output.push_str(&format!("  ({}", outcome.verdict.label()));
                if let Some(invocation) = &outcome.invocation {
                    if invocation.timed_out {
                        output.push_str(", timed out");
                    } else {
                        output.push_str(&format!(", exit code {}", invocation.exit_code));
                    }
                }
                output.push(')');
            }
            output.push('\n');

            if let Some(stats) = &outcome.tester_stats {
                output.push_str(&format!(
                    "      {} bug{}, {} schedules explored\n",
                    stats.bugs_found,
                    if stats.bugs_found == 1 { "" } else { "s" },
                    stats.schedules_explored
                ));
                if let Some(trace) = &stats.trace {
                    output.push_str(&format!("      trace: {}\n", trace));
                }
            }

            if outcome.verdict.is_hard_failure() {
                if let Some(invocation) = &outcome.invocation {
                    output.push_str(&format!("      command: {}\n", invocation.command_line()));
                }
            }
        }
        output.push('\n');
    }

    output.push_str("Summary\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  Attempted: {}  Succeeded: {}  Hard failures: {}  Soft failures: {}\n",
        report.summary.attempted,
        report.summary.succeeded,
        report.summary.hard_failures,
        report.summary.soft_failures
    ));
    let tested: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|o| o.tester_stats.as_ref())
        .collect();
    if !tested.is_empty() {
        output.push_str(&format!(
            "  Bugs found: {}  Schedules explored: {}\n",
            tested.iter().map(|s| s.bugs_found).sum::<u64>(),
            tested.iter().map(|s| s.schedules_explored).sum::<u64>()
        ));
    }
    output.push_str(&format!(
        "  Tool time: {:.1}s\n",
        report.summary.total_duration_ms / 1000.0
    ));

    if let Some(error) = &report.error {
        output.push_str(&format!("  Error: {}\n", error));
    }

    let status = if !report.passed() {
        "ABORTED"
    } else if report.summary.soft_failures > 0 {
        "COMPLETED WITH WARNINGS"
    } else {
        "PASSED"
    };
    output.push_str(&format!("  Status: {}\n", status));

    output
}
