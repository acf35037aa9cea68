use std::io::{self, Write};

use crate::model::{Classification, ComparisonResult, PolicyStatus};

use super::ReportWriter;

/// Human-readable console summary, matching the teacher's plain
/// `println!`-style reporting: a status line, then a block listing any
/// critical changes by policy and path.
pub struct ConsoleWriter;

impl ReportWriter for ConsoleWriter {
    fn write(&self, result: &ComparisonResult, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{} ({})", result.status, result.message)?;
        writeln!(
            out,
            "  {} policies compared: {} identical, {} semantically equivalent, {} differ, {} left-only, {} right-only",
            result.summary.total_policies,
            result.summary.identical,
            result.summary.semantically_equivalent,
            result.summary.differ,
            result.summary.left_only,
            result.summary.right_only,
        )?;

        if result.summary.critical_changes > 0 {
            writeln!(out, "\nCritical changes:")?;
            for comparison in &result.comparisons {
                if comparison.status != PolicyStatus::Differ {
                    continue;
                }
                let critical_paths: Vec<&str> = comparison
                    .differences
                    .iter()
                    .filter(|d| d.classification == Some(Classification::Critical))
                    .map(|d| d.path.as_str())
                    .collect();
                if critical_paths.is_empty() {
                    continue;
                }
                writeln!(out, "  {}: {}", comparison.display_name, critical_paths.join(", "))?;
            }
        }

        Ok(())
    }
}
