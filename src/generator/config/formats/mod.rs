//! Dialect emitters, one per target configuration schema.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::constants::templates::{clash_base, singbox_base, surge_base};
use crate::error::SublinkError;
use crate::generator::config::emitter::DialectEmitter;

pub mod clash;
pub mod singbox;
pub mod surge;

pub use clash::ClashEmitter;
pub use singbox::SingBoxEmitter;
pub use surge::SurgeEmitter;

/// Output dialect of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Clash,
    SingBox,
    Surge,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Clash => "clash",
            Target::SingBox => "singbox",
            Target::Surge => "surge",
        }
    }

    /// Built-in base document used when the caller supplies none.
    pub fn default_template(&self) -> Value {
        match self {
            Target::Clash => clash_base(),
            Target::SingBox => singbox_base(),
            Target::Surge => surge_base(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = SublinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clash" | "mihomo" | "clash-meta" | "clashmeta" => Ok(Target::Clash),
            "singbox" | "sing-box" => Ok(Target::SingBox),
            "surge" => Ok(Target::Surge),
            other => Err(SublinkError::Template(format!(
                "unknown target '{}'",
                other
            ))),
        }
    }
}

/// Per-build values an emitter needs beyond the base document.
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// Top-level keys the override merger wrote into the base document.
    pub applied_override_keys: Vec<String>,
    /// Subscription URL advertised in the Surge managed-config header.
    pub subscription_url: Option<String>,
}

/// Create the emitter for `target`, owning `document`.
pub fn emitter_for(
    target: Target,
    document: Value,
    options: &EmitOptions,
) -> Box<dyn DialectEmitter> {
    match target {
        Target::Clash => Box::new(ClashEmitter::new(document, &options.applied_override_keys)),
        Target::SingBox => Box::new(SingBoxEmitter::new(document)),
        Target::Surge => Box::new(SurgeEmitter::new(
            document,
            options.subscription_url.clone(),
        )),
    }
}

/// Root mapping of a base document; anything else yields an empty mapping.
pub(crate) fn into_mapping(document: Value) -> Map<String, Value> {
    match document {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Remove `key` from `map`, keeping it only when it is a sequence.
pub(crate) fn take_sequence(map: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match map.remove(key) {
        Some(Value::Array(list)) => list,
        _ => Vec::new(),
    }
}

/// Insert `entry` into `list`, replacing the first element `same` matches.
pub(crate) fn upsert(list: &mut Vec<Value>, entry: Value, same: impl Fn(&Value) -> bool) {
    match list.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = entry,
        None => list.push(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_str() {
        assert_eq!("Clash".parse::<Target>().unwrap(), Target::Clash);
        assert_eq!("sing-box".parse::<Target>().unwrap(), Target::SingBox);
        assert_eq!("surge".parse::<Target>().unwrap(), Target::Surge);
        assert!("loon".parse::<Target>().is_err());
        assert_eq!(Target::SingBox.to_string(), "singbox");
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut list = vec![serde_json::json!({"name": "a", "v": 1}), serde_json::json!({"name": "b"})];
        upsert(&mut list, serde_json::json!({"name": "a", "v": 2}), |v| v["name"] == "a");
        upsert(&mut list, serde_json::json!({"name": "c"}), |v| v["name"] == "c");
        assert_eq!(list.len(), 3);
        assert_eq!(list[0]["v"], 2);
        assert_eq!(list[2]["name"], "c");
    }
}
