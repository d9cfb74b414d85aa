use std::collections::HashMap;

use crate::error::SublinkError;
use crate::models::{Proxy, RealityOptions, TlsOptions, Transport};
use crate::parser::types::Token;
use crate::utils::url::{get_param, parse_bool};

pub(crate) use crate::utils::url::parse_query;

/// Explode a proxy link into a Proxy object
///
/// This function detects the scheme of the link and calls the appropriate parser.
pub fn explode(link: &str) -> Result<Proxy, SublinkError> {
    let link = link.trim();
    if link.is_empty() {
        return Err(SublinkError::protocol("empty link"));
    }

    let scheme = link
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .ok_or_else(|| SublinkError::protocol(format!("not a proxy link: {}", truncate(link))))?;

    match scheme.as_str() {
        "ss" => super::ss::explode_ss(link),
        "vmess" => super::vmess::explode_vmess(link),
        "vless" => super::vless::explode_vless(link),
        "trojan" => super::trojan::explode_trojan(link),
        "hysteria" => super::hysteria::explode_hysteria(link),
        "hysteria2" | "hy2" => super::hysteria2::explode_hysteria2(link),
        "tuic" => super::tuic::explode_tuic(link),
        "wireguard" | "wg" => super::wireguard::explode_wireguard(link),
        "socks" | "socks5" => super::socks::explode_socks(link),
        other => Err(SublinkError::protocol(format!("unsupported scheme '{}'", other))),
    }
}

/// Turn any candidate, link or structural entry, into a canonical record.
pub fn explode_token(token: &Token) -> Result<Proxy, SublinkError> {
    match token {
        Token::Link(link) => explode(link),
        Token::Structured(value) => super::clash::explode_clash_proxy(value),
    }
}

/// Shorten untrusted input before it lands in a log line.
pub(crate) fn truncate(s: &str) -> String {
    const MAX: usize = 48;
    if s.chars().count() <= MAX {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(MAX).collect::<String>())
    }
}

/// Split `host:port` or `[v6]:port`.
pub(crate) fn split_host_port(s: &str) -> Result<(String, u16), SublinkError> {
    let s = s.trim().trim_end_matches('/');
    let (host, port) = if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| SublinkError::protocol(format!("bad IPv6 address in '{}'", s)))?;
        let port = tail
            .strip_prefix(':')
            .ok_or_else(|| SublinkError::protocol(format!("missing port in '{}'", s)))?;
        (host, port)
    } else {
        s.rsplit_once(':')
            .ok_or_else(|| SublinkError::protocol(format!("missing port in '{}'", s)))?
    };
    if host.is_empty() {
        return Err(SublinkError::protocol("missing server"));
    }
    Ok((host.to_string(), parse_port(port)?))
}

pub(crate) fn parse_port(port: &str) -> Result<u16, SublinkError> {
    match port.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(SublinkError::protocol(format!("invalid port '{}'", port))),
        Ok(p) => Ok(p),
    }
}

/// Leading integer of a bandwidth value such as `100`, `100 Mbps`.
pub(crate) fn parse_mbps(value: &str) -> Option<u32> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_insecure(params: &HashMap<String, String>) -> bool {
    ["allowInsecure", "insecure", "allow_insecure", "skip-cert-verify"]
        .iter()
        .any(|key| params.get(*key).map_or(false, |v| parse_bool(v)))
}

/// TLS block of the share-link convention (`security`, `sni`, `alpn`, `fp`,
/// `pbk`, `sid`). `force` turns TLS on for protocols that always use it.
pub(crate) fn tls_from_params(
    params: &HashMap<String, String>,
    force: bool,
) -> Result<Option<TlsOptions>, SublinkError> {
    let security = params
        .get("security")
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();
    let enabled = force || matches!(security.as_str(), "tls" | "xtls" | "reality");
    if !enabled {
        return Ok(None);
    }

    let reality = if security == "reality" {
        let public_key = get_param(params, "pbk")
            .ok_or_else(|| SublinkError::protocol("reality requires a public key (pbk)"))?;
        Some(RealityOptions {
            public_key,
            short_id: get_param(params, "sid"),
        })
    } else {
        None
    };

    Ok(Some(TlsOptions {
        server_name: get_param(params, "sni").or_else(|| get_param(params, "peer")),
        insecure: is_insecure(params),
        alpn: params.get("alpn").map(|a| split_list(a)).unwrap_or_default(),
        fingerprint: get_param(params, "fp"),
        reality,
    }))
}

/// Transport of the share-link convention (`type`, `path`, `host`, `serviceName`).
pub(crate) fn transport_from_params(params: &HashMap<String, String>) -> Option<Transport> {
    let network = params.get("type").map(String::as_str).unwrap_or("tcp");
    Transport::from_network(
        network,
        get_param(params, "path"),
        get_param(params, "host"),
        get_param(params, "serviceName"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("example.com:443").unwrap(),
            ("example.com".to_string(), 443)
        );
        assert_eq!(
            split_host_port("[2001:db8::1]:8388/").unwrap(),
            ("2001:db8::1".to_string(), 8388)
        );
        assert!(split_host_port("example.com").is_err());
        assert!(split_host_port("example.com:0").is_err());
        assert!(split_host_port(":443").is_err());
    }

    #[test]
    fn test_explode_dispatch() {
        let proxy = explode("trojan://pw@example.com:443#T").unwrap();
        assert_eq!(proxy.proxy_type(), ProxyType::Trojan);
        assert!(matches!(
            explode("ssr://abcdef"),
            Err(SublinkError::Protocol(_))
        ));
        assert!(matches!(explode("hello"), Err(SublinkError::Protocol(_))));
        assert!(explode("  ").is_err());
    }

    #[test]
    fn test_tls_from_params() {
        let params = parse_query("security=reality&sni=a.com&pbk=KEY&sid=01&fp=chrome&alpn=h2,http/1.1");
        let tls = tls_from_params(&params, false).unwrap().unwrap();
        assert_eq!(tls.server_name.as_deref(), Some("a.com"));
        assert_eq!(tls.alpn, vec!["h2", "http/1.1"]);
        assert_eq!(tls.reality.unwrap().public_key, "KEY");

        let params = parse_query("security=none");
        assert!(tls_from_params(&params, false).unwrap().is_none());

        let params = parse_query("security=reality");
        assert!(tls_from_params(&params, false).is_err());
    }

    #[test]
    fn test_parse_mbps() {
        assert_eq!(parse_mbps("100"), Some(100));
        assert_eq!(parse_mbps("50 Mbps"), Some(50));
        assert_eq!(parse_mbps("fast"), None);
    }
}
