use std::io::{self, Write};

use serde_json::json;

use crate::model::ComparisonResult;

use super::ReportWriter;

/// The bit-exact `pipelineJson` schema from §6, for CI/CD consumption.
pub struct PipelineJsonWriter;

impl ReportWriter for PipelineJsonWriter {
    fn write(&self, result: &ComparisonResult, out: &mut dyn Write) -> io::Result<()> {
        let non_ignored_differences: usize = result
            .summary
            .critical_changes
            + result.summary.non_critical_changes
            + result.summary.left_only
            + result.summary.right_only;

        let payload = json!({
            "status": result.status,
            "exitCode": result.exit_code,
            "differencesCount": non_ignored_differences,
            "criticalChanges": result.summary.critical_changes,
            "nonCriticalChanges": result.summary.non_critical_changes,
            "comparedAt": result.compared_at,
            "tenantId": result.tenant_id,
            "criticalChangeTypes": result.summary.critical_change_types,
            "policyNames": result.summary.policies_with_critical_diffs,
            "message": result.message,
            "thresholdConfiguration": result.threshold_configuration,
        });
        let text = serde_json::to_string_pretty(&payload)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(out, "{text}")
    }
}
