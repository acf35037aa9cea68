//! The HCL Policy Loader (C3): recursively scans a directory (or reads a
//! single file) for `azuread_conditional_access_policy` resource blocks
//! and converts each into a generic JSON `Value` tree before delegating
//! to [`assemble_policy`], the same constructor the JSON loader uses.

use std::fs;
use std::path::Path;

use hcl::{Body, Expression, Structure};
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::model::SourceFormat;

use super::{assemble_policy, LoadError, LoadOutcome, LoadWarning};

const RESOURCE_TYPE: &str = "azuread_conditional_access_policy";
const HCL_EXTENSIONS: &[&str] = &["tf", "hcl"];

/// Load policies from a single HCL file or every matching file found by
/// a recursive directory scan.
pub fn load_hcl(path: &Path) -> Result<LoadOutcome, LoadError> {
    let mut outcome = LoadOutcome::default();

    let files: Vec<_> = if path.is_dir() {
        WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| HCL_EXTENSIONS.contains(&ext))
            })
            .map(|e| e.path().to_path_buf())
            .collect()
    } else {
        vec![path.to_path_buf()]
    };

    let mut files = files;
    files.sort();

    for file in files {
        load_one_file(&file, &mut outcome)?;
    }

    Ok(outcome)
}

fn load_one_file(path: &Path, outcome: &mut LoadOutcome) -> Result<(), LoadError> {
    let source_ref = path.to_string_lossy().to_string();
    let contents = fs::read_to_string(path).map_err(|e| LoadError::Io {
        source_ref: source_ref.clone(),
        message: e.to_string(),
    })?;

    let body: Body = hcl::parse(&contents).map_err(|e| LoadError::Syntax {
        source_ref: source_ref.clone(),
        message: e.to_string(),
    })?;

    for structure in body.into_iter() {
        let block = match structure {
            Structure::Block(block) => block,
            Structure::Attribute(_) => continue,
        };

        if block.identifier.as_str() != "resource" {
            continue;
        }
        let labels: Vec<String> = block.labels.iter().map(|l| l.as_str().to_string()).collect();
        if labels.first().map(String::as_str) != Some(RESOURCE_TYPE) {
            continue;
        }
        let local_name = labels.get(1).cloned().unwrap_or_default();
        let block_ref = format!("{source_ref}:{RESOURCE_TYPE}.{local_name}");

        let mut warnings = Vec::new();
        let value = body_to_value(&block.body, &block_ref, &mut warnings);
        outcome.warnings.append(&mut warnings);

        outcome.policies.push(assemble_policy(
            &value,
            SourceFormat::Hcl,
            &block_ref,
            &mut outcome.warnings,
        ));
    }

    Ok(())
}

/// Convert an HCL block body into a JSON object: each attribute becomes a
/// key/value pair; each repeated nested block name becomes an array,
/// each singular one a nested object. Terraform's provider schema is
/// snake_case (`display_name`, `client_app_types`); the normalized model
/// is camelCase, so every key is converted on the way in.
fn body_to_value(body: &Body, block_ref: &str, warnings: &mut Vec<LoadWarning>) -> Value {
    let mut map = Map::new();

    for structure in body.iter() {
        match structure {
            Structure::Attribute(attr) => {
                let key = snake_to_camel(attr.key.as_str());
                let value = expression_to_value(&attr.expr, block_ref, warnings);
                map.insert(key, value);
            }
            Structure::Block(nested) => {
                let name = snake_to_camel(nested.identifier.as_str());
                let nested_value = body_to_value(&nested.body, block_ref, warnings);
                match map.remove(&name) {
                    Some(Value::Array(mut items)) => {
                        items.push(nested_value);
                        map.insert(name, Value::Array(items));
                    }
                    Some(existing) => {
                        map.insert(name, Value::Array(vec![existing, nested_value]));
                    }
                    None => {
                        map.insert(name, nested_value);
                    }
                }
            }
        }
    }

    Value::Object(map)
}

/// `display_name` -> `displayName`, `client_app_types` -> `clientAppTypes`.
/// Keys with no underscore pass through unchanged.
fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert a parsed HCL expression into a JSON value. Literal scalars,
/// arrays, and objects convert directly; anything requiring evaluation
/// (variable/local references, function calls, traversals) is preserved
/// as its opaque source text and recorded as a warning.
fn expression_to_value(expr: &Expression, block_ref: &str, warnings: &mut Vec<LoadWarning>) -> Value {
    match expr {
        Expression::Null => Value::Null,
        Expression::Bool(b) => Value::Bool(*b),
        Expression::Number(n) => serde_json::Number::from_f64(n.as_f64().unwrap_or_default())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Expression::String(s) => Value::String(s.clone()),
        Expression::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| expression_to_value(item, block_ref, warnings))
                .collect(),
        ),
        Expression::Object(obj) => {
            let map = obj
                .iter()
                .map(|(k, v)| {
                    (
                        k.to_string(),
                        expression_to_value(v, block_ref, warnings),
                    )
                })
                .collect();
            Value::Object(map)
        }
        other => {
            let opaque = other.to_string();
            warnings.push(LoadWarning {
                source_ref: block_ref.to_string(),
                message: format!("unresolved expression preserved as opaque token: {opaque}"),
            });
            Value::String(opaque)
        }
    }
}
