use url::Url;

use crate::error::SublinkError;
use crate::models::{ProtocolParams, Proxy};
use crate::utils::url::{decoded_username, fragment_label, get_param, host_of, query_map};

use super::common::{tls_from_params, transport_from_params};

/// Parse a VLESS link into a Proxy object
///
/// Format: `vless://uuid@host:port?security=tls|reality&type=ws&flow=..#tag`
pub fn explode_vless(vless: &str) -> Result<Proxy, SublinkError> {
    let url = Url::parse(vless).map_err(|e| SublinkError::protocol(format!("vless: {}", e)))?;

    let uuid = decoded_username(&url);
    if uuid.is_empty() {
        return Err(SublinkError::protocol("vless: missing uuid"));
    }
    let server = host_of(&url).ok_or_else(|| SublinkError::protocol("vless: missing server"))?;
    let port = url
        .port()
        .filter(|p| *p != 0)
        .ok_or_else(|| SublinkError::protocol("vless: missing port"))?;

    let params = query_map(&url);

    Ok(Proxy::new(
        &fragment_label(&url),
        &server,
        port,
        ProtocolParams::Vless {
            uuid,
            flow: get_param(&params, "flow"),
            packet_encoding: get_param(&params, "packetEncoding"),
        },
    )
    .with_tls(tls_from_params(&params, false)?)
    .with_transport(transport_from_params(&params)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transport;

    #[test]
    fn test_reality() {
        let proxy = explode_vless(
            "vless://b831381d-6324-4d53-ad4f-8cda48b30811@1.2.3.4:443?encryption=none&flow=xtls-rprx-vision&security=reality&sni=www.microsoft.com&fp=chrome&pbk=PUBKEY&sid=6ba8&type=tcp#US%20Reality",
        )
        .unwrap();
        assert_eq!(proxy.tag, "US Reality");
        assert!(proxy.transport.is_none());
        match &proxy.params {
            ProtocolParams::Vless { flow, .. } => {
                assert_eq!(flow.as_deref(), Some("xtls-rprx-vision"))
            }
            other => panic!("unexpected params {:?}", other),
        }
        let tls = proxy.tls.unwrap();
        assert_eq!(tls.fingerprint.as_deref(), Some("chrome"));
        let reality = tls.reality.unwrap();
        assert_eq!(reality.public_key, "PUBKEY");
        assert_eq!(reality.short_id.as_deref(), Some("6ba8"));
    }

    #[test]
    fn test_ws_without_tls() {
        let proxy =
            explode_vless("vless://id@example.com:80?type=ws&path=%2Fws&host=cdn.example.com")
                .unwrap();
        assert!(proxy.tls.is_none());
        assert_eq!(
            proxy.transport,
            Some(Transport::Ws {
                path: Some("/ws".to_string()),
                host: Some("cdn.example.com".to_string()),
            })
        );
    }

    #[test]
    fn test_missing_port() {
        assert!(explode_vless("vless://id@example.com").is_err());
        assert!(explode_vless("vless://example.com:443").is_err());
    }
}
