//! Override Merger
//!
//! Applies top-level overrides from a structured subscription document onto a
//! copy of the base configuration. The base passed in is never mutated, so one
//! template can serve any number of builds.

use log::{debug, warn};
use serde_json::Value;

use crate::error::SublinkError;
use crate::parser::types::{is_protected_key, OverrideDocument, OverrideValue};
use crate::utils::yaml::yaml_to_json;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub document: Value,
    /// Keys actually written or removed, in application order.
    pub applied: Vec<String>,
    /// One `SublinkError::Override` per skipped key.
    pub errors: Vec<SublinkError>,
}

impl MergeOutcome {
    pub fn was_applied(&self, key: &str) -> bool {
        self.applied.iter().any(|k| k == key)
    }
}

fn container_kind(value: &Value) -> Option<&'static str> {
    match value {
        Value::Object(_) => Some("mapping"),
        Value::Array(_) => Some("sequence"),
        _ => None,
    }
}

fn override_error(key: &str, reason: impl Into<String>) -> SublinkError {
    SublinkError::Override {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Apply `overrides` to a clone of `base`.
///
/// Protected keys are skipped silently. A key whose value cannot be converted,
/// or that would swap a mapping for a sequence (or the reverse), is skipped
/// with an error; the remaining keys still apply.
pub fn apply_overrides(base: &Value, overrides: &OverrideDocument) -> MergeOutcome {
    let mut document = base.clone();
    let mut applied = Vec::new();
    let mut errors = Vec::new();

    for (key, value) in overrides.iter() {
        if is_protected_key(key) {
            debug!("Ignoring override for protected key '{}'", key);
            continue;
        }

        let Some(root) = document.as_object_mut() else {
            errors.push(override_error(key, "base document is not a mapping"));
            continue;
        };

        match value {
            OverrideValue::Remove => {
                root.remove(key);
                applied.push(key.to_string());
            }
            OverrideValue::Replace(yaml) => {
                let replacement = match yaml_to_json(yaml) {
                    Ok(v) => v,
                    Err(e) => {
                        errors.push(override_error(key, e.to_string()));
                        continue;
                    }
                };
                if let (Some(old), Some(new)) = (
                    root.get(key).and_then(container_kind),
                    container_kind(&replacement),
                ) {
                    if old != new {
                        errors.push(override_error(
                            key,
                            format!("cannot replace a {} with a {}", old, new),
                        ));
                        continue;
                    }
                }
                root.insert(key.to_string(), replacement);
                applied.push(key.to_string());
            }
        }
    }

    for err in &errors {
        warn!("{}", err);
    }

    MergeOutcome {
        document,
        applied,
        errors,
    }
}
