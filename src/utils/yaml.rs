use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use serde_yaml::Value;

use crate::error::SublinkError;

static PROXIES_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bproxies\s*:").expect("static pattern"));
static TYPE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btype\s*:").expect("static pattern"));

/// Cheap textual check for a structured proxy document: a `proxies` key and at
/// least one `type` key somewhere in the text.
pub fn looks_like_proxy_document(content: &str) -> bool {
    PROXIES_KEY.is_match(content) && TYPE_KEY.is_match(content)
}

/// Parse a YAML (or JSON, which is a YAML subset) document.
pub fn parse_document(content: &str) -> Result<Value, SublinkError> {
    serde_yaml::from_str(content).map_err(|e| SublinkError::Decode(format!("invalid YAML: {}", e)))
}

/// Convert a YAML node into the JSON tree every emitter works on.
///
/// Non-string mapping keys are stringified; tagged nodes keep their tag as a
/// single-key object.
pub fn yaml_to_json(value: &Value) -> Result<JsonValue, SublinkError> {
    serde_json::to_value(value).map_err(SublinkError::from)
}
