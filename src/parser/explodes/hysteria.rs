use url::Url;

use crate::error::SublinkError;
use crate::models::{ProtocolParams, Proxy, TlsOptions};
use crate::utils::url::{fragment_label, get_param, host_of, parse_bool, query_map};

use super::common::{parse_mbps, split_list};

/// Parse a Hysteria (v1) link into a Proxy object
///
/// Format: `hysteria://host:port?protocol=udp&auth=..&peer=..&upmbps=..&downmbps=..&obfsParam=..#tag`
pub fn explode_hysteria(hysteria: &str) -> Result<Proxy, SublinkError> {
    let url =
        Url::parse(hysteria).map_err(|e| SublinkError::protocol(format!("hysteria: {}", e)))?;
    let server = host_of(&url).ok_or_else(|| SublinkError::protocol("hysteria: missing server"))?;
    let port = url
        .port()
        .filter(|p| *p != 0)
        .ok_or_else(|| SublinkError::protocol("hysteria: missing port"))?;
    let params = query_map(&url);

    let tls = TlsOptions {
        server_name: get_param(&params, "peer").or_else(|| get_param(&params, "sni")),
        insecure: params.get("insecure").map_or(false, |v| parse_bool(v)),
        alpn: params.get("alpn").map(|a| split_list(a)).unwrap_or_default(),
        ..Default::default()
    };

    Ok(Proxy::new(
        &fragment_label(&url),
        &server,
        port,
        ProtocolParams::Hysteria {
            auth: get_param(&params, "auth"),
            up_mbps: params
                .get("upmbps")
                .or_else(|| params.get("up"))
                .and_then(|v| parse_mbps(v)),
            down_mbps: params
                .get("downmbps")
                .or_else(|| params.get("down"))
                .and_then(|v| parse_mbps(v)),
            obfs: get_param(&params, "obfsParam").or_else(|| get_param(&params, "obfs")),
            protocol: get_param(&params, "protocol"),
        },
    )
    .with_tls(Some(tls)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hysteria() {
        let proxy = explode_hysteria(
            "hysteria://example.com:36712?protocol=udp&auth=secret&peer=sni.example.com&insecure=1&upmbps=50&downmbps=100&alpn=h3&obfsParam=xplus#HY",
        )
        .unwrap();
        assert_eq!(proxy.tag, "HY");
        assert_eq!(
            proxy.params,
            ProtocolParams::Hysteria {
                auth: Some("secret".to_string()),
                up_mbps: Some(50),
                down_mbps: Some(100),
                obfs: Some("xplus".to_string()),
                protocol: Some("udp".to_string()),
            }
        );
        let tls = proxy.tls.unwrap();
        assert!(tls.insecure);
        assert_eq!(tls.alpn, vec!["h3"]);
    }

    #[test]
    fn test_missing_port() {
        assert!(explode_hysteria("hysteria://example.com").is_err());
    }
}
