//! The `LivePolicySource` collaborator contract (§6): an injectable
//! seam yielding the live policy set as a JSON export envelope. The
//! directory-service client that authenticates and fetches real
//! policies is out of scope; this module defines the trait plus a
//! file-backed and an in-memory mock implementation for tests.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::loader::LoadError;

/// Yields the live policy set as a single JSON document, called at most
/// once per comparison run.
pub trait LivePolicySource {
    fn fetch(&self) -> Result<Value, LoadError>;
}

/// Reads the export envelope from a fixed path on disk — the shape used
/// when a caller pre-fetches the live export out-of-process (e.g. a CI
/// step that curls the directory service and hands the core a file).
pub struct FileLivePolicySource {
    path: PathBuf,
}

impl FileLivePolicySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LivePolicySource for FileLivePolicySource {
    fn fetch(&self) -> Result<Value, LoadError> {
        let source_ref = self.path.to_string_lossy().to_string();
        let bytes = fs::read(&self.path).map_err(|e| LoadError::Io {
            source_ref: source_ref.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| LoadError::Syntax {
            source_ref,
            message: e.to_string(),
        })
    }
}

/// An in-memory source for tests.
pub struct MockLivePolicySource {
    document: Value,
}

impl MockLivePolicySource {
    pub fn new(document: Value) -> Self {
        Self { document }
    }
}

impl LivePolicySource for MockLivePolicySource {
    fn fetch(&self) -> Result<Value, LoadError> {
        Ok(self.document.clone())
    }
}

/// Resolve a `--entra-file` path (if given) or fall back to the
/// caller-supplied live source, matching §6's "if omitted, the live
/// source is used" rule.
pub fn resolve_live_document(
    entra_file: Option<&Path>,
    fallback: &dyn LivePolicySource,
) -> Result<Value, LoadError> {
    match entra_file {
        Some(path) => FileLivePolicySource::new(path).fetch(),
        None => fallback.fetch(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mock_source_returns_its_document() {
        let source = MockLivePolicySource::new(json!({"policies": []}));
        let doc = source.fetch().unwrap();
        assert_eq!(doc["policies"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn entra_file_overrides_fallback_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        fs::write(&path, r#"{"policies":[{"displayName":"FromFile"}]}"#).unwrap();

        let fallback = MockLivePolicySource::new(json!({"policies": []}));
        let doc = resolve_live_document(Some(&path), &fallback).unwrap();
        assert_eq!(doc["policies"][0]["displayName"], "FromFile");
    }
}
