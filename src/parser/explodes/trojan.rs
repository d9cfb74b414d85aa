use url::Url;

use crate::error::SublinkError;
use crate::models::{ProtocolParams, Proxy};
use crate::utils::url::{decoded_username, fragment_label, host_of, parse_bool, query_map};

use super::common::{tls_from_params, transport_from_params};

/// Parse a Trojan link into a Proxy object
///
/// TLS is always on; `sni` falls back to `peer`, and the legacy `ws=1&wspath=`
/// pair is read as a WebSocket transport.
pub fn explode_trojan(trojan: &str) -> Result<Proxy, SublinkError> {
    let url = Url::parse(trojan).map_err(|e| SublinkError::protocol(format!("trojan: {}", e)))?;

    let password = decoded_username(&url);
    if password.is_empty() {
        return Err(SublinkError::protocol("trojan: missing password"));
    }
    let server = host_of(&url).ok_or_else(|| SublinkError::protocol("trojan: missing server"))?;
    let port = url.port().unwrap_or(443);
    if port == 0 {
        return Err(SublinkError::protocol("trojan: invalid port"));
    }

    let mut params = query_map(&url);
    if params.get("ws").map_or(false, |v| parse_bool(v)) {
        params.insert("type".to_string(), "ws".to_string());
        if let Some(path) = params.get("wspath").cloned() {
            params.insert("path".to_string(), path);
        }
    }

    Ok(Proxy::new(
        &fragment_label(&url),
        &server,
        port,
        ProtocolParams::Trojan { password },
    )
    .with_tls(tls_from_params(&params, true)?)
    .with_transport(transport_from_params(&params))
    .with_tfo(params.get("tfo").map(|v| parse_bool(v))))
}
