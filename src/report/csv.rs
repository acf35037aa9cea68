use std::io::{self, Write};

use crate::model::ComparisonResult;

use super::ReportWriter;

/// One row per policy: `displayName,status,differenceCount,criticalCount`.
pub struct CsvWriter;

impl ReportWriter for CsvWriter {
    fn write(&self, result: &ComparisonResult, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "displayName,status,differenceCount,criticalCount")?;
        for comparison in &result.comparisons {
            let critical_count = comparison
                .differences
                .iter()
                .filter(|d| d.classification == Some(crate::model::Classification::Critical))
                .count();
            writeln!(
                out,
                "{},{:?},{},{}",
                escape_field(&comparison.display_name),
                comparison.status,
                comparison.differences.len(),
                critical_count,
            )?;
        }
        Ok(())
    }
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
