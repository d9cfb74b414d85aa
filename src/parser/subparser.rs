//! Input Normalizer
//!
//! Classifies raw subscription text and flattens it into decodable candidates:
//!
//! 1. a structured document with a `proxies` collection,
//! 2. otherwise a whole-document base64 blob, decoded once,
//! 3. otherwise a line list where each line is a link, an encoded blob, or a
//!    remote subscription URL that is fetched and run through the same cascade.
//!
//! Failures are recorded as diagnostics and never stop sibling candidates.

use futures::future::{join_all, FutureExt, LocalBoxFuture};
use log::{debug, info, warn};

use crate::error::{Diagnostic, SublinkError};
use crate::models::{Lang, ProxyOrigin};
use crate::parser::explodes::common::truncate;
use crate::parser::explodes::explode_clash_proxy;
use crate::parser::types::{Candidate, Normalized, OverrideDocument, Token};
use crate::utils::base64::{is_base64_like, try_base64_decode};
use crate::utils::http::Fetcher;
use crate::utils::url::is_link;
use crate::utils::yaml::{looks_like_proxy_document, parse_document};

/// Default nesting limit for subscriptions that point at other subscriptions.
pub const DEFAULT_MAX_REMOTE_DEPTH: usize = 2;

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Remote URLs found at this nesting depth or deeper are not fetched.
    pub max_remote_depth: usize,
    /// Language of diagnostic texts.
    pub lang: Lang,
    /// Extra headers sent with every remote fetch.
    pub headers: Vec<(String, String)>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            max_remote_depth: DEFAULT_MAX_REMOTE_DEPTH,
            lang: Lang::default(),
            headers: Vec::new(),
        }
    }
}

/// Normalize raw subscription text into candidates plus optional overrides.
///
/// Returns an empty candidate list only when nothing in the input decoded.
pub async fn normalize<F: Fetcher>(
    raw: &str,
    fetcher: &F,
    options: &NormalizeOptions,
) -> Normalized {
    let normalized = cascade(raw.to_string(), 0, ProxyOrigin::Link, true, fetcher, options).await;
    info!(
        "Normalized input into {} candidates ({} override keys, {} diagnostics)",
        normalized.candidates.len(),
        normalized.overrides.as_ref().map_or(0, OverrideDocument::len),
        normalized.diagnostics.len()
    );
    normalized
}

fn absorb(into: &mut Normalized, part: Normalized) {
    into.candidates.extend(part.candidates);
    into.diagnostics.extend(part.diagnostics);
    if let Some(overrides) = part.overrides {
        match into.overrides.as_mut() {
            Some(existing) => existing.merge(overrides),
            None => into.overrides = Some(overrides),
        }
    }
}

fn record(into: &mut Normalized, err: SublinkError, subject: &str, lang: Lang) {
    warn!("Skipping {}: {}", truncate(subject), err);
    into.diagnostics
        .push(Diagnostic::from_error(&err, truncate(subject), lang));
}

fn structured_origin(origin: &ProxyOrigin) -> ProxyOrigin {
    match origin {
        ProxyOrigin::Remote(url) => ProxyOrigin::Remote(url.clone()),
        _ => ProxyOrigin::Structured,
    }
}

/// Tier 1: split a structured document into validated proxy entries and overrides.
fn parse_structured(text: &str, origin: &ProxyOrigin, lang: Lang) -> Result<Normalized, SublinkError> {
    let doc = parse_document(text)?;
    let mapping = doc
        .as_mapping()
        .ok_or_else(|| SublinkError::decode("structured document is not a mapping"))?;

    let mut result = Normalized::default();
    if let Some(entries) = mapping.get("proxies").and_then(|p| p.as_sequence()) {
        for entry in entries {
            match explode_clash_proxy(entry) {
                Ok(_) => result.candidates.push(Candidate::new(
                    Token::Structured(entry.clone()),
                    structured_origin(origin),
                )),
                Err(e) => {
                    let subject = entry
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or("proxies entry")
                        .to_string();
                    record(&mut result, e, &subject, lang);
                }
            }
        }
    }

    let overrides = OverrideDocument::from_mapping(mapping);
    if !overrides.is_empty() {
        result.overrides = Some(overrides);
    }
    Ok(result)
}

/// Run the decode cascade over one body of text.
///
/// `origin` is attached to link candidates found in the body; `allow_blob`
/// permits the whole-document decode tier (the decoded text is not decoded again).
fn cascade<'a, F: Fetcher>(
    text: String,
    depth: usize,
    origin: ProxyOrigin,
    allow_blob: bool,
    fetcher: &'a F,
    options: &'a NormalizeOptions,
) -> LocalBoxFuture<'a, Normalized> {
    async move {
        let text = text.trim();
        let mut result = Normalized::default();
        if text.is_empty() {
            return result;
        }

        if looks_like_proxy_document(text) {
            match parse_structured(text, &origin, options.lang) {
                Ok(parsed) if !parsed.candidates.is_empty() => {
                    debug!("Structured document with {} proxies", parsed.candidates.len());
                    return parsed;
                }
                Ok(parsed) => {
                    // no usable proxies, fall through to line handling
                    result.diagnostics.extend(parsed.diagnostics);
                }
                Err(e) => record(&mut result, e, "structured document", options.lang),
            }
        } else if allow_blob && is_base64_like(text) {
            if let Some(decoded) = try_base64_decode(text) {
                debug!("Decoded whole-document base64 blob ({} bytes)", decoded.len());
                let blob_origin = match origin {
                    ProxyOrigin::Remote(_) => origin.clone(),
                    _ => ProxyOrigin::EncodedBlob,
                };
                let part = cascade(decoded, depth, blob_origin, false, fetcher, options).await;
                absorb(&mut result, part);
                return result;
            }
        }

        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let expansions = join_all(
            lines
                .iter()
                .map(|line| expand_line(line, depth, &origin, fetcher, options)),
        )
        .await;
        for part in expansions {
            absorb(&mut result, part);
        }
        result
    }
    .boxed_local()
}

/// Tier 3: expand a single line into zero or more candidates.
fn expand_line<'a, F: Fetcher>(
    line: &'a str,
    depth: usize,
    origin: &'a ProxyOrigin,
    fetcher: &'a F,
    options: &'a NormalizeOptions,
) -> LocalBoxFuture<'a, Normalized> {
    async move {
        let mut result = Normalized::default();

        if is_link(line) {
            if depth >= options.max_remote_depth {
                record(
                    &mut result,
                    SublinkError::Fetch(format!(
                        "remote subscription nested deeper than {}",
                        options.max_remote_depth
                    )),
                    line,
                    options.lang,
                );
                return result;
            }
            match fetcher.fetch(line, &options.headers).await {
                Ok(body) => {
                    debug!("Fetched {} bytes from {}", body.len(), line);
                    let part = cascade(
                        body,
                        depth + 1,
                        ProxyOrigin::Remote(line.to_string()),
                        true,
                        fetcher,
                        options,
                    )
                    .await;
                    absorb(&mut result, part);
                }
                Err(e) => record(&mut result, e, line, options.lang),
            }
            return result;
        }

        if line.contains("://") {
            result
                .candidates
                .push(Candidate::new(Token::Link(line.to_string()), origin.clone()));
            return result;
        }

        match try_base64_decode(line) {
            Some(decoded) if decoded.contains("://") || looks_like_proxy_document(&decoded) => {
                let blob_origin = match origin {
                    ProxyOrigin::Remote(_) => origin.clone(),
                    _ => ProxyOrigin::EncodedBlob,
                };
                let part = cascade(decoded, depth, blob_origin, false, fetcher, options).await;
                absorb(&mut result, part);
            }
            _ => record(
                &mut result,
                SublinkError::decode("line is neither a link nor an encoded subscription"),
                line,
                options.lang,
            ),
        }
        result
    }
    .boxed_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::utils::base64::base64_encode;
    use crate::utils::http::StaticFetcher;

    fn links(normalized: &Normalized) -> Vec<String> {
        normalized
            .tokens()
            .filter_map(|t| match t {
                Token::Link(l) => Some(l.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_line_list() {
        let fetcher = StaticFetcher::new();
        let out = normalize(
            "ss://a@b:1\n\n  trojan://p@h:443  \nnonsense!!",
            &fetcher,
            &NormalizeOptions::default(),
        )
        .await;
        assert_eq!(links(&out), vec!["ss://a@b:1", "trojan://p@h:443"]);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::Decode);
    }

    #[tokio::test]
    async fn test_whole_document_blob() {
        let fetcher = StaticFetcher::new();
        let blob = base64_encode("trojan://p@h:443#A\nvless://id@h:443#B\n");
        let out = normalize(&blob, &fetcher, &NormalizeOptions::default()).await;
        assert_eq!(out.candidates.len(), 2);
        assert!(out
            .candidates
            .iter()
            .all(|c| c.origin == ProxyOrigin::EncodedBlob));
    }

    #[tokio::test]
    async fn test_structured_document() {
        let fetcher = StaticFetcher::new();
        let text = "dns:\n  enable: true\nproxies:\n  - {name: A, type: trojan, server: a.com, port: 443, password: p}\n  - {name: Bad, type: trojan, server: b.com}\n";
        let out = normalize(text, &fetcher, &NormalizeOptions::default()).await;
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].origin, ProxyOrigin::Structured);
        assert_eq!(out.overrides.unwrap().keys().collect::<Vec<_>>(), vec!["dns"]);
        assert_eq!(out.diagnostics[0].subject, "Bad");
    }

    #[tokio::test]
    async fn test_remote_and_fault_isolation() {
        let body = base64_encode("trojan://p@remote:443#R1\ntrojan://p@remote:444#R2");
        let fetcher = StaticFetcher::new().with("https://sub.example.com/a", &body);
        let text = "trojan://p@h:443#First\nhttps://sub.example.com/a\nhttps://down.example.com/b\ntrojan://p@h:445#Last";
        let out = normalize(text, &fetcher, &NormalizeOptions::default()).await;
        let tags: Vec<_> = links(&out)
            .iter()
            .map(|l| l.rsplit('#').next().unwrap().to_string())
            .collect();
        assert_eq!(tags, vec!["First", "R1", "R2", "Last"]);
        assert_eq!(
            out.candidates[1].origin,
            ProxyOrigin::Remote("https://sub.example.com/a".to_string())
        );
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::Fetch);
    }

    #[tokio::test]
    async fn test_remote_depth_limit() {
        let fetcher = StaticFetcher::new()
            .with("https://a.example/1", "https://a.example/2")
            .with("https://a.example/2", "https://a.example/3")
            .with("https://a.example/3", "trojan://p@h:443");
        let out = normalize("https://a.example/1", &fetcher, &NormalizeOptions::default()).await;
        assert!(out.candidates.is_empty());
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::Fetch);
    }

    /// Serves one body, and only to requests carrying the expected token.
    struct TokenFetcher;

    impl Fetcher for TokenFetcher {
        async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<String, SublinkError> {
            let authorized = headers
                .iter()
                .any(|(name, value)| name == "Authorization" && value == "Bearer t0ken");
            if url == "https://a.example/private" && authorized {
                Ok("trojan://p@h:443#A".to_string())
            } else {
                Err(SublinkError::Fetch(format!("403 from {}", url)))
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_headers_are_forwarded() {
        let plain = normalize("https://a.example/private", &TokenFetcher, &NormalizeOptions::default()).await;
        assert!(plain.candidates.is_empty());
        assert_eq!(plain.diagnostics[0].kind, DiagnosticKind::Fetch);

        let options = NormalizeOptions {
            headers: vec![("Authorization".to_string(), "Bearer t0ken".to_string())],
            ..Default::default()
        };
        let authorized = normalize("https://a.example/private", &TokenFetcher, &options).await;
        assert_eq!(authorized.candidates.len(), 1);
        assert!(authorized.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_remote_structured_contributes_overrides() {
        let fetcher = StaticFetcher::new().with(
            "https://a.example/clash",
            "mode: global\nproxies:\n  - {name: A, type: trojan, server: a.com, port: 443, password: p}\n",
        );
        let out = normalize(
            "https://a.example/clash\ntrojan://p@h:443#B",
            &fetcher,
            &NormalizeOptions::default(),
        )
        .await;
        assert_eq!(out.candidates.len(), 2);
        assert!(out.overrides.unwrap().get("mode").is_some());
    }

    #[tokio::test]
    async fn test_reserialize_is_idempotent() {
        let fetcher = StaticFetcher::new();
        let options = NormalizeOptions::default();
        for input in [
            "trojan://p@h:443#A\nss://YWVzLTEyOC1nY206cA@h:8388#B",
            "mode: rule\nproxies:\n  - {name: A, type: trojan, server: a.com, port: 443, password: p}\n",
        ] {
            let first = normalize(input, &fetcher, &options).await;
            let text = first.reserialize().unwrap();
            let second = normalize(&text, &fetcher, &options).await;
            assert_eq!(
                first.tokens().collect::<Vec<_>>(),
                second.tokens().collect::<Vec<_>>()
            );
            assert_eq!(first.overrides, second.overrides);
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let out = normalize("  \n ", &StaticFetcher::new(), &NormalizeOptions::default()).await;
        assert!(out.is_empty());
        assert!(out.diagnostics.is_empty());
    }
}
