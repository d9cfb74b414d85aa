use std::io::Write;

use serde_json::json;
use sublink::generator::config::apply_overrides;
use sublink::parser::{normalize, NormalizeOptions, OverrideValue, Token};
use sublink::utils::base64::base64_encode;
use sublink::{Settings, StaticFetcher};

const LINKS: &str = "trojan://pw@a.example.com:443#A\nss://YWVzLTEyOC1nY206cHc@1.2.3.4:8388#B";

#[tokio::test]
async fn test_reserialize_round_trip_links() {
    let fetcher = StaticFetcher::new();
    let options = NormalizeOptions::default();

    let first = normalize(&base64_encode(LINKS), &fetcher, &options).await;
    let text = first.reserialize().unwrap();
    assert_eq!(text, LINKS);

    let second = normalize(&text, &fetcher, &options).await;
    let first_tokens: Vec<&Token> = first.tokens().collect();
    let second_tokens: Vec<&Token> = second.tokens().collect();
    assert_eq!(first_tokens, second_tokens);
}

#[tokio::test]
async fn test_reserialize_round_trip_structured() {
    let input = "dns:\n  enable: false\nproxies:\n  - {name: A, type: trojan, server: a.example.com, port: 443, password: pw}\n";
    let fetcher = StaticFetcher::new();
    let options = NormalizeOptions::default();

    let first = normalize(input, &fetcher, &options).await;
    let text = first.reserialize().unwrap();
    let second = normalize(&text, &fetcher, &options).await;

    assert_eq!(first.candidates, second.candidates);
    assert_eq!(first.overrides, second.overrides);
}

#[tokio::test]
async fn test_mixed_input_has_no_single_form() {
    let input = format!(
        "{}\n{}",
        LINKS,
        base64_encode("proxies:\n  - {name: C, type: trojan, server: c.example.com, port: 443, password: pw}\n")
    );
    let normalized = normalize(&input, &StaticFetcher::new(), &NormalizeOptions::default()).await;
    assert_eq!(normalized.candidates.len(), 3);
    assert!(normalized.reserialize().is_none());
}

#[tokio::test]
async fn test_protected_keys_are_never_applied() {
    let input = "rules:\n  - MATCH,DIRECT\nrule-providers: {}\nlog-level: debug\nproxies:\n  - {name: A, type: trojan, server: a.example.com, port: 443, password: pw}\n";
    let normalized = normalize(input, &StaticFetcher::new(), &NormalizeOptions::default()).await;
    let overrides = normalized.overrides.unwrap();

    let base = json!({"log-level": "info", "rules": ["MATCH,Proxy"]});
    let outcome = apply_overrides(&base, &overrides);
    assert_eq!(outcome.applied, vec!["log-level"]);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.document["rules"], json!(["MATCH,Proxy"]));
    assert_eq!(outcome.document["log-level"], "debug");
    assert_eq!(base["log-level"], "info");
}

#[tokio::test]
async fn test_null_override_removes_key() {
    let input = "hosts: ~\nproxies:\n  - {name: A, type: trojan, server: a.example.com, port: 443, password: pw}\n";
    let normalized = normalize(input, &StaticFetcher::new(), &NormalizeOptions::default()).await;
    let overrides = normalized.overrides.unwrap();
    assert_eq!(overrides.get("hosts"), Some(&OverrideValue::Remove));

    let outcome = apply_overrides(&json!({"hosts": {"a": "1.1.1.1"}, "mode": "rule"}), &overrides);
    assert_eq!(outcome.document, json!({"mode": "rule"}));
}

#[tokio::test]
async fn test_settings_from_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "common:\n  lang: en-US\n  fetch_timeout_secs: 5").unwrap();

    let settings = Settings::load_from_file(file.path()).await.unwrap();
    assert_eq!(settings.lang, "en-US");
    assert_eq!(settings.fetch_timeout_secs, 5);
    assert_eq!(settings.default_rule_set, "minimal");
}
