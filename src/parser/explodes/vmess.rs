use serde_json::Value;
use url::Url;

use crate::error::SublinkError;
use crate::models::{ProtocolParams, Proxy, TlsOptions, Transport};
use crate::utils::base64::try_base64_decode;
use crate::utils::url::{decoded_username, fragment_label, host_of, parse_bool, query_map};

use super::common::{split_list, tls_from_params, transport_from_params};

/// Read a field that subscription generators emit either as a string or a number.
fn json_string(json: &Value, key: &str) -> Option<String> {
    match &json[key] {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a VMess link into a Proxy object
///
/// The common form is base64-encoded JSON (`v`, `ps`, `add`, `port`, `id`, ...).
/// The URL form `vmess://uuid@host:port?type=ws&security=tls#tag` is also accepted.
pub fn explode_vmess(vmess: &str) -> Result<Proxy, SublinkError> {
    let body = match vmess.split_once("://") {
        Some((scheme, body)) if scheme.eq_ignore_ascii_case("vmess") => body,
        _ => return Err(SublinkError::protocol("not a vmess link")),
    };

    if let Some(decoded) = try_base64_decode(body.split('#').next().unwrap_or(body)) {
        let json: Value = serde_json::from_str(&decoded)
            .map_err(|e| SublinkError::decode(format!("vmess payload is not JSON: {}", e)))?;
        return explode_vmess_json(&json);
    }

    if body.contains('@') {
        return explode_std_vmess(vmess);
    }

    Err(SublinkError::decode("vmess link is neither base64 JSON nor a URL"))
}

fn explode_vmess_json(json: &Value) -> Result<Proxy, SublinkError> {
    let server = json_string(json, "add").ok_or_else(|| SublinkError::protocol("vmess: missing add"))?;
    let port = json_string(json, "port")
        .and_then(|p| p.parse::<u16>().ok())
        .filter(|p| *p != 0)
        .ok_or_else(|| SublinkError::protocol("vmess: missing or invalid port"))?;
    let uuid = json_string(json, "id").ok_or_else(|| SublinkError::protocol("vmess: missing id"))?;
    let alter_id = json_string(json, "aid")
        .and_then(|a| a.parse::<u16>().ok())
        .unwrap_or(0);
    let security = json_string(json, "scy").unwrap_or_else(|| "auto".to_string());
    let tag = json_string(json, "ps").unwrap_or_default();

    let network = json_string(json, "net").unwrap_or_else(|| "tcp".to_string());
    let host = json_string(json, "host");
    let path = json_string(json, "path");
    let transport = Transport::from_network(&network, path.clone(), host.clone(), path);

    let tls = match json_string(json, "tls").as_deref() {
        Some("tls") => Some(TlsOptions {
            server_name: json_string(json, "sni").or(host),
            insecure: json_string(json, "allowInsecure").map_or(false, |v| parse_bool(&v))
                || json_string(json, "skip-cert-verify").map_or(false, |v| parse_bool(&v)),
            alpn: json_string(json, "alpn").map(|a| split_list(&a)).unwrap_or_default(),
            fingerprint: json_string(json, "fp"),
            reality: None,
        }),
        _ => None,
    };

    Ok(Proxy::new(
        &tag,
        &server,
        port,
        ProtocolParams::VMess {
            uuid,
            alter_id,
            security,
        },
    )
    .with_tls(tls)
    .with_transport(transport))
}

/// Parse a URL-form VMess link: `vmess://uuid@host:port?type=ws&security=tls#tag`
pub fn explode_std_vmess(vmess: &str) -> Result<Proxy, SublinkError> {
    let url = Url::parse(vmess).map_err(|e| SublinkError::protocol(format!("vmess: {}", e)))?;
    let uuid = decoded_username(&url);
    if uuid.is_empty() {
        return Err(SublinkError::protocol("vmess: missing uuid"));
    }
    let server = host_of(&url).ok_or_else(|| SublinkError::protocol("vmess: missing server"))?;
    let port = url
        .port()
        .filter(|p| *p != 0)
        .ok_or_else(|| SublinkError::protocol("vmess: missing port"))?;
    let params = query_map(&url);

    Ok(Proxy::new(
        &fragment_label(&url),
        &server,
        port,
        ProtocolParams::VMess {
            uuid,
            alter_id: params
                .get("alterId")
                .and_then(|a| a.parse().ok())
                .unwrap_or(0),
            security: params
                .get("encryption")
                .filter(|e| !e.is_empty())
                .cloned()
                .unwrap_or_else(|| "auto".to_string()),
        },
    )
    .with_tls(tls_from_params(&params, false)?)
    .with_transport(transport_from_params(&params)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;
    use crate::utils::base64::base64_encode;

    #[test]
    fn test_base64_json() {
        let payload = r#"{"v":"2","ps":"JP 01","add":"jp.example.com","port":"443","id":"b831381d-6324-4d53-ad4f-8cda48b30811","aid":0,"net":"ws","host":"cdn.example.com","path":"/ray","tls":"tls","sni":"jp.example.com"}"#;
        let proxy = explode_vmess(&format!("vmess://{}", base64_encode(payload))).unwrap();
        assert_eq!(proxy.proxy_type(), ProxyType::VMess);
        assert_eq!(proxy.tag, "JP 01");
        assert_eq!(proxy.port, 443);
        assert_eq!(
            proxy.transport,
            Some(Transport::Ws {
                path: Some("/ray".to_string()),
                host: Some("cdn.example.com".to_string()),
            })
        );
        let tls = proxy.tls.unwrap();
        assert_eq!(tls.server_name.as_deref(), Some("jp.example.com"));
    }

    #[test]
    fn test_numeric_port_and_no_tls() {
        let payload = r#"{"add":"1.1.1.1","port":8080,"id":"abc","net":"tcp"}"#;
        let proxy = explode_vmess(&format!("vmess://{}", base64_encode(payload))).unwrap();
        assert_eq!(proxy.port, 8080);
        assert_eq!(proxy.tag, "1.1.1.1:8080");
        assert!(proxy.tls.is_none());
        assert!(proxy.transport.is_none());
    }

    #[test]
    fn test_url_form() {
        let proxy = explode_vmess(
            "vmess://b831381d-6324-4d53-ad4f-8cda48b30811@example.com:443?type=grpc&serviceName=svc&security=tls&sni=example.com#G",
        )
        .unwrap();
        assert_eq!(proxy.tag, "G");
        assert_eq!(
            proxy.transport,
            Some(Transport::Grpc {
                service_name: Some("svc".to_string())
            })
        );
        assert!(proxy.tls_enabled());
    }

    #[test]
    fn test_missing_fields() {
        let payload = r#"{"add":"1.1.1.1","id":"abc"}"#;
        assert!(matches!(
            explode_vmess(&format!("vmess://{}", base64_encode(payload))),
            Err(SublinkError::Protocol(_))
        ));
        assert!(matches!(
            explode_vmess(&format!("vmess://{}", base64_encode("not json"))),
            Err(SublinkError::Decode(_))
        ));
    }
}
