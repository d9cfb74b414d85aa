use std::collections::HashSet;

use log::{debug, warn};

use crate::constants::countries::parse_country_from_name;
use crate::error::Diagnostic;
use crate::models::{Lang, Proxy};
use crate::parser::explodes::common::truncate;
use crate::parser::explodes::explode_token;
use crate::parser::types::{Candidate, Token};

/// Decode every candidate independently, in input order.
///
/// Failed candidates are reported and skipped.
pub fn explode_candidates(candidates: &[Candidate], lang: Lang) -> (Vec<Proxy>, Vec<Diagnostic>) {
    let mut proxies = Vec::with_capacity(candidates.len());
    let mut diagnostics = Vec::new();

    for candidate in candidates {
        match explode_token(&candidate.token) {
            Ok(mut proxy) => {
                proxy.origin = candidate.origin.clone();
                proxies.push(proxy);
            }
            Err(e) => {
                let subject = match &candidate.token {
                    Token::Link(link) => truncate(link),
                    Token::Structured(value) => value
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or("proxies entry")
                        .to_string(),
                };
                warn!("Skipping invalid proxy {}: {}", subject, e);
                diagnostics.push(Diagnostic::from_error(&e, subject, lang));
            }
        }
    }

    (proxies, diagnostics)
}

/// Fill in `country` from the tag text.
pub fn infer_countries(proxies: &mut [Proxy]) {
    for proxy in proxies.iter_mut() {
        proxy.country = parse_country_from_name(&proxy.tag).map(|c| c.code.to_string());
    }
}

/// Drop exact duplicates and make the remaining tags unique.
///
/// A tag colliding with an earlier one or with a `reserved` name gets the
/// first free ` n` suffix, n = 2, 3, ..., assigned in input order.
pub fn dedup_tags(proxies: Vec<Proxy>, reserved: &HashSet<String>) -> Vec<Proxy> {
    let mut kept: Vec<Proxy> = Vec::with_capacity(proxies.len());
    // original tag of every kept record, index-aligned with `kept`
    let mut original_tags: Vec<String> = Vec::with_capacity(proxies.len());
    let mut taken: HashSet<String> = reserved.clone();

    for mut proxy in proxies {
        let is_duplicate = kept
            .iter()
            .zip(&original_tags)
            .any(|(other, tag)| *tag == proxy.tag && other.same_endpoint(&proxy));
        if is_duplicate {
            debug!("Dropping duplicate proxy {}", proxy.tag);
            continue;
        }

        let original = proxy.tag.clone();
        if taken.contains(&proxy.tag) {
            let mut n = 2;
            while taken.contains(&format!("{} {}", original, n)) {
                n += 1;
            }
            proxy.tag = format!("{} {}", original, n);
            debug!("Renamed colliding tag {} to {}", original, proxy.tag);
        }
        taken.insert(proxy.tag.clone());
        original_tags.push(original);
        kept.push(proxy);
    }

    kept
}

/// Country inference followed by tag deduplication.
///
/// `reserved` sees the records after inference and returns the names no
/// proxy may keep, typically the group names about to be built.
pub fn preprocess_nodes<F>(mut proxies: Vec<Proxy>, reserved: F) -> Vec<Proxy>
where
    F: FnOnce(&[Proxy]) -> HashSet<String>,
{
    infer_countries(&mut proxies);
    let reserved = reserved(&proxies);
    dedup_tags(proxies, &reserved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::models::{ProtocolParams, ProxyOrigin};

    fn trojan(tag: &str, server: &str) -> Proxy {
        Proxy::new(
            tag,
            server,
            443,
            ProtocolParams::Trojan {
                password: "pw".to_string(),
            },
        )
    }

    #[test]
    fn test_dedup_suffixes_in_order() {
        let out = dedup_tags(
            vec![
                trojan("Node", "a.com"),
                trojan("Node", "b.com"),
                trojan("Node", "c.com"),
                trojan("Node 2", "d.com"),
            ],
            &HashSet::new(),
        );
        let tags: Vec<_> = out.iter().map(|p| p.tag.as_str()).collect();
        assert_eq!(tags, vec!["Node", "Node 2", "Node 3", "Node 2 2"]);
    }

    #[test]
    fn test_dedup_drops_exact_duplicates() {
        let out = dedup_tags(
            vec![
                trojan("Node", "a.com"),
                trojan("Node", "b.com"),
                trojan("Node", "b.com"),
                trojan("Node", "a.com"),
            ],
            &HashSet::new(),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].tag, "Node 2");
    }

    #[test]
    fn test_reserved_names_are_never_taken() {
        let out = preprocess_nodes(
            vec![
                trojan("🇭🇰 香港", "a.com"),
                trojan("🇭🇰 香港", "b.com"),
                trojan("DIRECT", "c.com"),
            ],
            |proxies| {
                assert_eq!(proxies[0].country.as_deref(), Some("HK"));
                ["🇭🇰 香港", "DIRECT"].iter().map(|s| s.to_string()).collect()
            },
        );
        let tags: Vec<_> = out.iter().map(|p| p.tag.as_str()).collect();
        assert_eq!(tags, vec!["🇭🇰 香港 2", "🇭🇰 香港 3", "DIRECT 2"]);
        assert_eq!(out[1].country.as_deref(), Some("HK"));
    }

    #[test]
    fn test_infer_countries() {
        let mut proxies = vec![
            trojan("🇯🇵 Tokyo 01", "a.com"),
            trojan("香港 IPLC", "b.com"),
            trojan("Office", "c.com"),
        ];
        infer_countries(&mut proxies);
        let codes: Vec<_> = proxies.iter().map(|p| p.country.as_deref()).collect();
        assert_eq!(codes, vec![Some("JP"), Some("HK"), None]);
    }

    #[test]
    fn test_explode_candidates_isolates_failures() {
        let candidates = vec![
            Candidate::new(Token::Link("trojan://pw@a.com:443#A".into()), ProxyOrigin::Link),
            Candidate::new(Token::Link("ssr://broken".into()), ProxyOrigin::Link),
            Candidate::new(
                Token::Link("trojan://pw@b.com:443#B".into()),
                ProxyOrigin::Remote("https://x".into()),
            ),
        ];
        let (proxies, diagnostics) = explode_candidates(&candidates, Lang::EnUs);
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[1].origin, ProxyOrigin::Remote("https://x".into()));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Protocol);
        assert!(diagnostics[0].message.starts_with("Skipped invalid proxy"));
    }
}
