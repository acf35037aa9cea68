//! The Orchestrator: composes C1-C7 end to end, the way the teacher's
//! `Pipeline` composes its own classifier/selection/run/summary stages.
//! Owns the [`ReportSink`], the [`CancellationToken`], and the bounded
//! worker pool; never touches a global logger or clock.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;

use crate::aggregate::{aggregate, AggregationOptions, ClassifiedPair};
use crate::cancel::CancellationToken;
use crate::classify::classify_all;
use crate::config::EffectiveConfig;
use crate::diff_engine::diff_policies;
use crate::error::OrchestratorError;
use crate::loader::{load_hcl, load_json, load_json_envelope, LoadOutcome};
use crate::matcher::match_policies;
use crate::model::{ComparisonResult, NormalizedPolicy};
use crate::pool::{resolve_pool_size, run_bounded};
use crate::report::ReportSink;
use crate::source::{resolve_live_document, LivePolicySource};

/// The reference-directory dialect, detected from its file extensions
/// since the CLI carries no explicit `--format` flag (an Open Question
/// resolved this way; see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceFormat {
    Json,
    Hcl,
}

/// Everything a `compare` run needs that isn't already folded into
/// [`EffectiveConfig`]: the two document locations and the collaborators
/// the orchestrator is wired with.
pub struct CompareRequest<'a> {
    pub reference_dir: PathBuf,
    pub entra_file: Option<PathBuf>,
    pub live_source: &'a dyn LivePolicySource,
    pub config: &'a EffectiveConfig,
    pub cancellation: CancellationToken,
    pub report_sink: &'a ReportSink,
}

/// Run one full comparison: load both sides, match, diff, classify,
/// aggregate. Returns the finished [`ComparisonResult`] or a fatal
/// [`OrchestratorError`].
pub fn run_compare(request: CompareRequest<'_>) -> Result<ComparisonResult, OrchestratorError> {
    let CompareRequest {
        reference_dir,
        entra_file,
        live_source,
        config,
        cancellation,
        report_sink,
    } = request;

    if cancellation.is_cancelled() {
        return Err(OrchestratorError::Cancelled);
    }

    report_sink.info(&format!("loading reference policies from {}", reference_dir.display()));
    let reference = load_reference_dir(&reference_dir)?;
    for warning in &reference.warnings {
        report_sink.info(&format!("warning: {}: {}", warning.source_ref, warning.message));
    }

    if cancellation.is_cancelled() {
        return Err(OrchestratorError::Cancelled);
    }

    report_sink.info("fetching live policy set");
    let live_document = resolve_live_document(entra_file.as_deref(), live_source)
        .map_err(OrchestratorError::from)?;
    let tenant_id = live_document
        .get("tenantId")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let live_source_ref = entra_file
        .as_deref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "live".to_string());
    let live_outcome = load_json_envelope(&live_document, &live_source_ref)
        .map_err(OrchestratorError::from)?;
    for warning in &live_outcome.warnings {
        report_sink.info(&format!("warning: {}: {}", warning.source_ref, warning.message));
    }

    if cancellation.is_cancelled() {
        return Err(OrchestratorError::Cancelled);
    }

    let (strategy, matching_options) = config.matching_options();
    let match_result = match_policies(
        reference.policies,
        live_outcome.policies,
        strategy,
        &matching_options,
    );
    for warning in &match_result.warnings {
        report_sink.info(&format!("warning: {}", warning.message));
    }

    let classification_config = config.classification_config();
    let worker_count = resolve_pool_size(config.jobs(), num_cpus());

    let pairs: Vec<(NormalizedPolicy, NormalizedPolicy)> = match_result.matched;
    let classified_config = classification_config.clone();
    let classified_pairs: Vec<ClassifiedPair> = run_bounded(pairs, worker_count, move |_, (left, right)| {
        let diffs = diff_policies(&left, &right);
        let (differences, critical_change_types) = classify_all(diffs, &classified_config);
        ClassifiedPair {
            left,
            right,
            differences,
            critical_change_types,
        }
    });

    if cancellation.is_cancelled() {
        return Err(OrchestratorError::Cancelled);
    }

    let result = aggregate(
        classified_pairs,
        match_result.left_only,
        match_result.right_only,
        AggregationOptions {
            max_differences: config.max_differences(),
            exit_on_differences: config.exit_on_differences(),
            fail_on_change_types: classification_config.fail_on_change_types,
            ignore_change_types: classification_config.ignore_change_types,
        },
        Utc::now().to_rfc3339(),
        tenant_id,
    );

    Ok(result)
}

fn load_reference_dir(dir: &Path) -> Result<LoadOutcome, OrchestratorError> {
    match detect_reference_format(dir)? {
        ReferenceFormat::Json => load_json(dir).map_err(OrchestratorError::from),
        ReferenceFormat::Hcl => load_hcl(dir).map_err(OrchestratorError::from),
    }
}

/// Look at the reference path's extension (single file) or the
/// extensions present one level into the directory to decide which
/// loader applies. `.tf`/`.hcl` anywhere selects HCL; otherwise JSON.
fn detect_reference_format(path: &Path) -> Result<ReferenceFormat, OrchestratorError> {
    if path.is_file() {
        return match path.extension().and_then(|e| e.to_str()) {
            Some("tf") | Some("hcl") => Ok(ReferenceFormat::Hcl),
            Some("json") => Ok(ReferenceFormat::Json),
            _ => Err(OrchestratorError::InvalidConfiguration(format!(
                "cannot determine reference format for '{}'",
                path.display()
            ))),
        };
    }

    let entries = std::fs::read_dir(path).map_err(|e| {
        OrchestratorError::InvalidConfiguration(format!(
            "cannot read reference directory '{}': {e}",
            path.display()
        ))
    })?;

    for entry in entries.filter_map(|e| e.ok()) {
        match entry.path().extension().and_then(|e| e.to_str()) {
            Some("tf") | Some("hcl") => return Ok(ReferenceFormat::Hcl),
            _ => continue,
        }
    }
    Ok(ReferenceFormat::Json)
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_json_reference_directory_by_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        assert_eq!(detect_reference_format(dir.path()).unwrap(), ReferenceFormat::Json);
    }

    #[test]
    fn detects_hcl_reference_directory_from_tf_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.tf"), "").unwrap();
        assert_eq!(detect_reference_format(dir.path()).unwrap(), ReferenceFormat::Hcl);
    }

    #[test]
    fn detects_format_from_single_file_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("policy.json");
        fs::write(&file, "{}").unwrap();
        assert_eq!(detect_reference_format(&file).unwrap(), ReferenceFormat::Json);
    }
}
