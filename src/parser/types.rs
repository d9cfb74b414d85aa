use serde_yaml::{Mapping, Value};

use crate::error::Diagnostic;
use crate::models::ProxyOrigin;

/// Top-level keys reserved for generated content; overrides never touch them.
pub const PROTECTED_KEYS: &[&str] = &["proxies", "rules", "rule-providers"];

pub fn is_protected_key(key: &str) -> bool {
    PROTECTED_KEYS.contains(&key)
}

/// One unit of decodable input.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A literal proxy link such as `ss://...`
    Link(String),
    /// One entry of a structured `proxies` collection
    Structured(Value),
}

/// A token together with the decode path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub token: Token,
    pub origin: ProxyOrigin,
}

impl Candidate {
    pub fn new(token: Token, origin: ProxyOrigin) -> Self {
        Candidate { token, origin }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverrideValue {
    Replace(Value),
    /// Drop the key from the base document. Written as `key: ~` in YAML.
    Remove,
}

/// Top-level replacements taken from a structured subscription document.
///
/// Keeps document order; a later value for the same key replaces the earlier
/// one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideDocument {
    entries: Vec<(String, OverrideValue)>,
}

impl OverrideDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything in `doc` except its `proxies` collection.
    pub fn from_mapping(doc: &Mapping) -> Self {
        let mut overrides = OverrideDocument::new();
        for (key, value) in doc {
            let key = match key {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            if key == "proxies" {
                continue;
            }
            let value = match value {
                Value::Null => OverrideValue::Remove,
                other => OverrideValue::Replace(other.clone()),
            };
            overrides.set(&key, value);
        }
        overrides
    }

    pub fn set(&mut self, key: &str, value: OverrideValue) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&OverrideValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Fold `other` into `self`; its values win.
    pub fn merge(&mut self, other: OverrideDocument) {
        for (key, value) in other.entries {
            self.set(&key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OverrideValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        for (key, value) in &self.entries {
            let value = match value {
                OverrideValue::Replace(v) => v.clone(),
                OverrideValue::Remove => Value::Null,
            };
            mapping.insert(Value::String(key.clone()), value);
        }
        mapping
    }
}

/// Output of the input normalizer.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub overrides: Option<OverrideDocument>,
    /// Decodable candidates in input order.
    pub candidates: Vec<Candidate>,
    /// Recovered failures met while normalizing.
    pub diagnostics: Vec<Diagnostic>,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.overrides.as_ref().map_or(true, |o| o.is_empty())
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.candidates.iter().map(|c| &c.token)
    }

    /// Render the candidate set back into subscription text.
    ///
    /// Pure link sets become a line list; structured sets, together with
    /// any overrides, become one YAML document. Mixed sets, and link sets
    /// carrying overrides, have no single-document form and yield `None`.
    pub fn reserialize(&self) -> Option<String> {
        if self.candidates.is_empty() {
            return None;
        }

        let links: Vec<&str> = self
            .tokens()
            .filter_map(|t| match t {
                Token::Link(link) => Some(link.as_str()),
                Token::Structured(_) => None,
            })
            .collect();
        if links.len() == self.candidates.len() {
            if self.overrides.as_ref().map_or(false, |o| !o.is_empty()) {
                return None;
            }
            return Some(links.join("\n"));
        }
        if !links.is_empty() {
            return None;
        }

        let proxies: Vec<Value> = self
            .tokens()
            .filter_map(|t| match t {
                Token::Structured(v) => Some(v.clone()),
                Token::Link(_) => None,
            })
            .collect();
        let mut doc = self
            .overrides
            .as_ref()
            .map(OverrideDocument::to_mapping)
            .unwrap_or_default();
        doc.insert(Value::String("proxies".to_string()), Value::Sequence(proxies));
        serde_yaml::to_string(&Value::Mapping(doc)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_document_from_mapping() {
        let doc: Value =
            serde_yaml::from_str("proxies: []\ndns: {enable: true}\nrules: [a]\nmode: rule\ntun: ~\n")
                .unwrap();
        let overrides = OverrideDocument::from_mapping(doc.as_mapping().unwrap());
        assert_eq!(overrides.keys().collect::<Vec<_>>(), vec!["dns", "rules", "mode", "tun"]);
        assert_eq!(overrides.get("tun"), Some(&OverrideValue::Remove));
    }

    #[test]
    fn test_merge_later_wins_in_place() {
        let mut a = OverrideDocument::new();
        a.set("mode", OverrideValue::Replace(Value::String("rule".into())));
        a.set("port", OverrideValue::Replace(Value::Number(7890.into())));
        let mut b = OverrideDocument::new();
        b.set("mode", OverrideValue::Replace(Value::String("global".into())));
        a.merge(b);
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["mode", "port"]);
        assert_eq!(
            a.get("mode"),
            Some(&OverrideValue::Replace(Value::String("global".into())))
        );
    }

    #[test]
    fn test_reserialize_mixed_is_none() {
        let normalized = Normalized {
            overrides: None,
            candidates: vec![
                Candidate::new(Token::Link("ss://a".into()), ProxyOrigin::Link),
                Candidate::new(
                    Token::Structured(serde_yaml::from_str("{name: a, type: ss}").unwrap()),
                    ProxyOrigin::Structured,
                ),
            ],
            diagnostics: Vec::new(),
        };
        assert!(normalized.reserialize().is_none());
    }

    #[test]
    fn test_protected_keys() {
        assert!(is_protected_key("rule-providers"));
        assert!(!is_protected_key("dns"));
    }
}
