//! The JSON Policy Loader (C2): export envelopes and per-file directories.

use std::fmt;
use std::fs;
use std::io::BufReader;
use std::path::Path;

use serde::de::{DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserializer as _;
use serde_json::{Deserializer, Value};

use crate::model::SourceFormat;

use super::{assemble_policy, LoadError, LoadOutcome, LoadWarning};

/// Files at or above this size are streamed element-by-element rather
/// than parsed whole, per the §5 memory-discipline rule.
const STREAMING_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;

/// Assemble policies from an already-fetched export-envelope document
/// (used for the live source, which the caller fetches rather than
/// reads from a path). `source_ref` is an opaque diagnostic label (the
/// collaborator's name, not a file path).
pub fn load_json_envelope(root: &Value, source_ref: &str) -> Result<LoadOutcome, LoadError> {
    let mut outcome = LoadOutcome::default();
    let policies = envelope_policies(root).ok_or_else(|| LoadError::InvalidDocument {
        source_ref: source_ref.to_string(),
    })?;
    for value in policies {
        outcome.policies.push(assemble_policy(
            value,
            SourceFormat::Json,
            source_ref,
            &mut outcome.warnings,
        ));
    }
    Ok(outcome)
}

/// Load policies from either a single export-envelope file or a directory
/// of one-policy-per-file documents.
pub fn load_json(path: &Path) -> Result<LoadOutcome, LoadError> {
    if path.is_dir() {
        return load_directory(path);
    }
    load_file(path)
}

fn load_file(path: &Path) -> Result<LoadOutcome, LoadError> {
    let source_ref = path.to_string_lossy().to_string();
    let metadata = fs::metadata(path).map_err(|e| LoadError::Io {
        source_ref: source_ref.clone(),
        message: e.to_string(),
    })?;

    if metadata.len() >= STREAMING_THRESHOLD_BYTES {
        return load_large_envelope(path, &source_ref);
    }

    let bytes = fs::read(path).map_err(|e| LoadError::Io {
        source_ref: source_ref.clone(),
        message: e.to_string(),
    })?;
    let root: Value = serde_json::from_slice(&bytes).map_err(|e| LoadError::Syntax {
        source_ref: source_ref.clone(),
        message: e.to_string(),
    })?;

    let mut outcome = LoadOutcome::default();

    if let Some(policies) = envelope_policies(&root) {
        for value in policies {
            outcome.policies.push(assemble_policy(
                value,
                SourceFormat::Json,
                &source_ref,
                &mut outcome.warnings,
            ));
        }
        return Ok(outcome);
    }

    if root.is_object() {
        outcome.policies.push(assemble_policy(
            &root,
            SourceFormat::Json,
            &source_ref,
            &mut outcome.warnings,
        ));
        return Ok(outcome);
    }

    Err(LoadError::InvalidDocument { source_ref })
}

/// Stream an export envelope's `policies` array one element at a time so
/// peak memory is bounded by the largest single policy rather than the
/// whole file. Walks the top-level object field by field: the `policies`
/// (or `Policies`) array is deserialized one element at a time via
/// [`PoliciesVisitor`], handing each element straight to [`assemble_policy`]
/// before the next element is read; every other top-level field
/// (`exportedAt`, `tenantId`, `policiesCount`, ...) is discarded via
/// [`IgnoredAny`] without being materialized.
fn load_large_envelope(path: &Path, source_ref: &str) -> Result<LoadOutcome, LoadError> {
    let file = fs::File::open(path).map_err(|e| LoadError::Io {
        source_ref: source_ref.to_string(),
        message: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    let mut de = Deserializer::from_reader(reader);
    let mut outcome = LoadOutcome::default();

    let found_policies = de
        .deserialize_map(EnvelopeVisitor {
            source_ref,
            outcome: &mut outcome,
        })
        .map_err(|e| LoadError::Syntax {
            source_ref: source_ref.to_string(),
            message: e.to_string(),
        })?;

    if !found_policies {
        return Err(LoadError::InvalidDocument {
            source_ref: source_ref.to_string(),
        });
    }

    Ok(outcome)
}

/// Visits the envelope's top-level map, delegating the `policies` key to
/// [`PoliciesSeed`] and discarding everything else. Returns whether a
/// `policies` key was seen.
struct EnvelopeVisitor<'a> {
    source_ref: &'a str,
    outcome: &'a mut LoadOutcome,
}

impl<'de, 'a> Visitor<'de> for EnvelopeVisitor<'a> {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an export envelope object with a top-level `policies` array")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut found = false;
        while let Some(key) = map.next_key::<String>()? {
            if key.eq_ignore_ascii_case("policies") {
                map.next_value_seed(PoliciesSeed {
                    source_ref: self.source_ref,
                    outcome: self.outcome,
                })?;
                found = true;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }
}

/// Hands the `policies` value's deserializer straight to [`PoliciesVisitor`]
/// without going through an intermediate `Value`.
struct PoliciesSeed<'a> {
    source_ref: &'a str,
    outcome: &'a mut LoadOutcome,
}

impl<'de, 'a> DeserializeSeed<'de> for PoliciesSeed<'a> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PoliciesVisitor {
            source_ref: self.source_ref,
            outcome: self.outcome,
        })
    }
}

/// Pulls one `policies[]` element at a time and assembles it immediately,
/// so at most one policy's `Value` tree is ever resident alongside the
/// accumulated outcome.
struct PoliciesVisitor<'a> {
    source_ref: &'a str,
    outcome: &'a mut LoadOutcome,
}

impl<'de, 'a> Visitor<'de> for PoliciesVisitor<'a> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a sequence of policy objects")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(value) = seq.next_element::<Value>()? {
            let policy = assemble_policy(
                &value,
                SourceFormat::Json,
                self.source_ref,
                &mut self.outcome.warnings,
            );
            self.outcome.policies.push(policy);
        }
        Ok(())
    }
}

fn envelope_policies(root: &Value) -> Option<&Vec<Value>> {
    root.as_object()
        .and_then(|o| o.get("policies").or_else(|| o.get("Policies")))
        .and_then(Value::as_array)
}

fn load_directory(dir: &Path) -> Result<LoadOutcome, LoadError> {
    let mut outcome = LoadOutcome::default();
    let entries = fs::read_dir(dir).map_err(|e| LoadError::Io {
        source_ref: dir.to_string_lossy().to_string(),
        message: e.to_string(),
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    for path in paths {
        let source_ref = path.to_string_lossy().to_string();
        match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) if value.is_object() => {
                    outcome.policies.push(assemble_policy(
                        &value,
                        SourceFormat::Json,
                        &source_ref,
                        &mut outcome.warnings,
                    ));
                }
                Ok(_) => outcome.warnings.push(LoadWarning {
                    source_ref,
                    message: "top-level document is not an object; skipped".to_string(),
                }),
                Err(e) => outcome.warnings.push(LoadWarning {
                    source_ref,
                    message: format!("malformed JSON: {e}"),
                }),
            },
            Err(e) => outcome.warnings.push(LoadWarning {
                source_ref,
                message: format!("unreadable file: {e}"),
            }),
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_export_envelope() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(
            file,
            r#"{{"exportedAt":"2024-01-01T00:00:00Z","tenantId":"t1","policiesCount":1,
               "policies":[{{"displayName":"P","state":"enabled"}}]}}"#
        )
        .unwrap();

        let outcome = load_json(file.path()).unwrap();
        assert_eq!(outcome.policies.len(), 1);
        assert_eq!(outcome.policies[0].display_name, "P");
    }

    #[test]
    fn loads_single_policy_file() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(file, r#"{{"displayName":"Solo","state":"disabled"}}"#).unwrap();

        let outcome = load_json(file.path()).unwrap();
        assert_eq!(outcome.policies.len(), 1);
        assert_eq!(outcome.policies[0].display_name, "Solo");
    }

    #[test]
    fn rejects_non_object_non_envelope_root() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(file, "[1, 2, 3]").unwrap();

        let result = load_json(file.path());
        assert!(matches!(result, Err(LoadError::InvalidDocument { .. })));
    }

    #[test]
    fn directory_load_skips_malformed_file_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.json"), r#"{"displayName":"Good","state":"enabled"}"#)
            .unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();

        let outcome = load_json(dir.path()).unwrap();
        assert_eq!(outcome.policies.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn streaming_path_ignores_scalar_fields_and_assembles_each_policy() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(
            file,
            r#"{{"exportedAt":"2024-01-01T00:00:00Z","tenantId":"t1","policiesCount":2,
               "policies":[{{"displayName":"First","state":"enabled"}},
                           {{"displayName":"Second","state":"disabled"}}]}}"#
        )
        .unwrap();

        let source_ref = file.path().to_string_lossy().to_string();
        let outcome = load_large_envelope(file.path(), &source_ref).unwrap();
        assert_eq!(outcome.policies.len(), 2);
        assert_eq!(outcome.policies[0].display_name, "First");
        assert_eq!(outcome.policies[1].display_name, "Second");
    }

    #[test]
    fn streaming_path_rejects_envelope_without_policies_key() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(file, r#"{{"tenantId":"t1"}}"#).unwrap();

        let source_ref = file.path().to_string_lossy().to_string();
        let result = load_large_envelope(file.path(), &source_ref);
        assert!(matches!(result, Err(LoadError::InvalidDocument { .. })));
    }
}
