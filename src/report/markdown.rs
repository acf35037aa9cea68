use std::io::{self, Write};

use crate::model::ComparisonResult;

use super::ReportWriter;

/// A Markdown summary table, suitable for pasting into a PR comment.
pub struct MarkdownWriter;

impl ReportWriter for MarkdownWriter {
    fn write(&self, result: &ComparisonResult, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# Policy Drift Report")?;
        writeln!(out)?;
        writeln!(out, "**Status:** {} — {}", result.status, result.message)?;
        writeln!(out)?;
        writeln!(
            out,
            "{} policies compared: {} identical, {} semantically equivalent, {} differ, {} left-only, {} right-only",
            result.summary.total_policies,
            result.summary.identical,
            result.summary.semantically_equivalent,
            result.summary.differ,
            result.summary.left_only,
            result.summary.right_only,
        )?;
        writeln!(out)?;

        if !result.comparisons.is_empty() {
            writeln!(out, "| Policy | Status | Differences |")?;
            writeln!(out, "|---|---|---|")?;
            for comparison in &result.comparisons {
                writeln!(
                    out,
                    "| {} | {:?} | {} |",
                    comparison.display_name,
                    comparison.status,
                    comparison.differences.len(),
                )?;
            }
        }
        Ok(())
    }
}
