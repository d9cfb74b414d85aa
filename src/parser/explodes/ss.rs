use crate::error::SublinkError;
use crate::models::{ProtocolParams, Proxy};
use crate::utils::base64::try_base64_decode;
use crate::utils::url::url_decode;

use super::common::{parse_query, split_host_port};

/// Parse a Shadowsocks link into a Proxy object
///
/// Accepts SIP002 (`ss://base64(method:password)@host:port/?plugin=..#tag`),
/// SIP002 with plain percent-encoded userinfo, and the legacy form where the
/// whole `method:password@host:port` is base64 encoded.
pub fn explode_ss(ss: &str) -> Result<Proxy, SublinkError> {
    let body = match ss.split_once("://") {
        Some((scheme, body)) if scheme.eq_ignore_ascii_case("ss") => body,
        _ => return Err(SublinkError::protocol("not a shadowsocks link")),
    };

    let (body, tag) = match body.split_once('#') {
        Some((body, fragment)) => (body, url_decode(fragment)),
        None => (body, String::new()),
    };
    let (body, query) = match body.split_once('?') {
        Some((body, query)) => (body, query),
        None => (body, ""),
    };
    let body = body.trim_end_matches('/');

    let (userinfo, hostport) = match body.rsplit_once('@') {
        Some((userinfo, hostport)) => (decode_userinfo(userinfo)?, hostport.to_string()),
        None => {
            let decoded = try_base64_decode(body)
                .ok_or_else(|| SublinkError::decode("shadowsocks link is not valid base64"))?;
            let (userinfo, hostport) = decoded
                .rsplit_once('@')
                .ok_or_else(|| SublinkError::protocol("shadowsocks link has no server"))?;
            (userinfo.to_string(), hostport.to_string())
        }
    };

    let (method, password) = userinfo
        .split_once(':')
        .ok_or_else(|| SublinkError::protocol("shadowsocks credentials must be method:password"))?;
    if method.is_empty() {
        return Err(SublinkError::protocol("shadowsocks method is empty"));
    }

    let (server, port) = split_host_port(&hostport)?;

    let params = parse_query(query);
    let (plugin, plugin_opts) = match params.get("plugin").filter(|p| !p.is_empty()) {
        Some(plugin) => match plugin.split_once(';') {
            Some((name, opts)) => (Some(name.to_string()), Some(opts.to_string())),
            None => (Some(plugin.to_string()), None),
        },
        None => (None, None),
    };

    Ok(Proxy::new(
        &tag,
        &server,
        port,
        ProtocolParams::Shadowsocks {
            method: method.to_string(),
            password: password.to_string(),
            plugin,
            plugin_opts,
        },
    ))
}

/// SIP002 userinfo is either base64(`method:password`) or percent-encoded plain text.
fn decode_userinfo(userinfo: &str) -> Result<String, SublinkError> {
    let plain = url_decode(userinfo);
    if let Some(decoded) = try_base64_decode(&plain) {
        if decoded.contains(':') {
            return Ok(decoded);
        }
    }
    if plain.contains(':') {
        return Ok(plain);
    }
    Err(SublinkError::decode("shadowsocks userinfo is neither base64 nor method:password"))
}
