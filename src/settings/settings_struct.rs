use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{DEFAULT_TEST_INTERVAL, DEFAULT_TEST_URL, DEFAULT_USER_AGENT};
use crate::parser::subparser::DEFAULT_MAX_REMOTE_DEPTH;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML settings: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_max_remote_depth() -> usize {
    DEFAULT_MAX_REMOTE_DEPTH
}

fn default_rule_set() -> String {
    "minimal".to_string()
}

fn default_lang() -> String {
    "zh-CN".to_string()
}

fn default_test_url() -> String {
    DEFAULT_TEST_URL.to_string()
}

fn default_test_interval() -> u32 {
    DEFAULT_TEST_INTERVAL
}

/// Defaults applied to every build.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Nesting limit for remote subscription references
    #[serde(default = "default_max_remote_depth")]
    pub max_remote_depth: usize,
    /// Extra headers sent with every remote fetch
    pub fetch_headers: BTreeMap<String, String>,
    /// Preset name or inline JSON selection
    #[serde(default = "default_rule_set")]
    pub default_rule_set: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    pub group_by_country: bool,
    #[serde(default = "default_test_url")]
    pub test_url: String,
    #[serde(default = "default_test_interval")]
    pub test_interval: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_remote_depth: default_max_remote_depth(),
            fetch_headers: BTreeMap::new(),
            default_rule_set: default_rule_set(),
            lang: default_lang(),
            group_by_country: false,
            test_url: default_test_url(),
            test_interval: default_test_interval(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YamlSettings {
    common: Settings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TomlSettings {
    common: Settings,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings text. A `common:` key selects YAML, anything else is read as TOML.
    pub fn load_from_content(content: &str) -> Result<Self, SettingsError> {
        if content.contains("common:") {
            let yaml: YamlSettings = serde_yaml::from_str(content)?;
            return Ok(yaml.common);
        }
        let toml_settings: TomlSettings = toml::from_str(content)?;
        Ok(toml_settings.common)
    }

    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SettingsError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Settings::load_from_content(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.user_agent, "curl/7.74.0");
        assert_eq!(settings.fetch_timeout_secs, 15);
        assert_eq!(settings.max_remote_depth, 2);
        assert_eq!(settings.default_rule_set, "minimal");
        assert_eq!(settings.lang, "zh-CN");
        assert!(!settings.group_by_country);
        assert_eq!(settings.test_interval, 300);
    }

    #[test]
    fn test_yaml_content() {
        let content = "common:\n  lang: en-US\n  group_by_country: true\n  max_remote_depth: 1\n";
        let settings = Settings::load_from_content(content).unwrap();
        assert_eq!(settings.lang, "en-US");
        assert!(settings.group_by_country);
        assert_eq!(settings.max_remote_depth, 1);
        assert_eq!(settings.user_agent, "curl/7.74.0");
    }

    #[test]
    fn test_toml_content() {
        let content = "[common]\ndefault_rule_set = \"balanced\"\ntest_interval = 600\n\n[common.fetch_headers]\nAuthorization = \"Bearer t\"\n";
        let settings = Settings::load_from_content(content).unwrap();
        assert_eq!(settings.default_rule_set, "balanced");
        assert_eq!(settings.test_interval, 600);
        assert_eq!(settings.fetch_headers["Authorization"], "Bearer t");
        assert_eq!(settings.lang, "zh-CN");
    }

    #[test]
    fn test_empty_content_is_default() {
        assert_eq!(Settings::load_from_content("").unwrap(), Settings::default());
    }

    #[test]
    fn test_invalid_content() {
        assert!(matches!(
            Settings::load_from_content("common:\n  test_interval: soon\n"),
            Err(SettingsError::Yaml(_))
        ));
        assert!(matches!(
            Settings::load_from_content("[common\n"),
            Err(SettingsError::Toml(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[common]\nuser_agent = \"sublink-test\"").unwrap();
        let settings = Settings::load_from_file(file.path()).await.unwrap();
        assert_eq!(settings.user_agent, "sublink-test");

        let missing = Settings::load_from_file(file.path().with_extension("missing")).await;
        assert!(matches!(missing, Err(SettingsError::Io { .. })));
    }
}
