use std::collections::HashMap;

use crate::error::SublinkError;
use crate::models::{ProtocolParams, Proxy};
use crate::utils::url::url_decode;

use super::common::{parse_query, split_host_port, split_list};

const DEFAULT_ADDRESS: &str = "10.0.0.2/32";

fn first_param(params: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| params.get(*key).filter(|v| !v.is_empty()).cloned())
}

/// Parse a WireGuard link (`wireguard://` or `wg://`) into a Proxy object
///
/// Format: `wireguard://privatekey@host:port?publickey=..&address=10.0.0.2/32&mtu=1420&reserved=1,2,3#tag`.
/// Keys are base64 and are often left unescaped, so the link is split by hand
/// rather than through a URL parser.
pub fn explode_wireguard(wireguard: &str) -> Result<Proxy, SublinkError> {
    let body = match wireguard.split_once("://") {
        Some((scheme, body))
            if scheme.eq_ignore_ascii_case("wireguard") || scheme.eq_ignore_ascii_case("wg") =>
        {
            body
        }
        _ => return Err(SublinkError::protocol("not a wireguard link")),
    };

    let (body, tag) = match body.split_once('#') {
        Some((body, fragment)) => (body, url_decode(fragment)),
        None => (body, String::new()),
    };
    let (body, query) = body.split_once('?').unwrap_or((body, ""));
    let params = parse_query(query);

    let (userinfo, hostport) = match body.rsplit_once('@') {
        Some((userinfo, hostport)) => (Some(url_decode(userinfo)), hostport),
        None => (None, body),
    };
    let (server, port) = split_host_port(hostport)?;

    let private_key = userinfo
        .filter(|k| !k.is_empty())
        .or_else(|| first_param(&params, &["privatekey", "privateKey"]))
        .ok_or_else(|| SublinkError::protocol("wireguard: missing private key"))?;
    let peer_public_key = first_param(&params, &["publickey", "publicKey", "peer"])
        .ok_or_else(|| SublinkError::protocol("wireguard: missing peer public key"))?;

    let mut local_address = first_param(&params, &["address", "ip"])
        .map(|a| split_list(&a))
        .unwrap_or_default();
    if local_address.is_empty() {
        local_address.push(DEFAULT_ADDRESS.to_string());
    }

    let reserved = match first_param(&params, &["reserved"]) {
        Some(value) => Some(
            split_list(&value)
                .iter()
                .map(|b| b.parse::<u8>())
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|_| SublinkError::protocol(format!("wireguard: bad reserved '{}'", value)))?,
        ),
        None => None,
    };

    Ok(Proxy::new(
        &tag,
        &server,
        port,
        ProtocolParams::WireGuard {
            private_key,
            peer_public_key,
            pre_shared_key: first_param(&params, &["presharedkey", "presharedKey", "psk"]),
            local_address,
            mtu: first_param(&params, &["mtu"]).and_then(|m| m.parse().ok()),
            reserved,
        },
    )
    .with_udp(Some(true)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wireguard() {
        let proxy = explode_wireguard(
            "wireguard://cGFzc3dvcmQ/PQ+=@162.159.192.1:2408?publickey=bmXOC%2BF1FxEMF9dyiK2H5%2F1SUtzH0JuVo51h2wPfgyo%3D&address=172.16.0.2/32,2606:4700::2/128&mtu=1280&reserved=1,2,3#WARP",
        )
        .unwrap();
        assert_eq!(proxy.tag, "WARP");
        assert_eq!(proxy.port, 2408);
        match &proxy.params {
            ProtocolParams::WireGuard {
                private_key,
                peer_public_key,
                local_address,
                mtu,
                reserved,
                ..
            } => {
                assert_eq!(private_key, "cGFzc3dvcmQ/PQ+=");
                assert_eq!(peer_public_key, "bmXOC+F1FxEMF9dyiK2H5/1SUtzH0JuVo51h2wPfgyo=");
                assert_eq!(local_address.len(), 2);
                assert_eq!(*mtu, Some(1280));
                assert_eq!(reserved.as_deref(), Some(&[1u8, 2, 3][..]));
            }
            other => panic!("unexpected params {:?}", other),
        }
    }

    #[test]
    fn test_raw_base64_key_keeps_plus() {
        let proxy = explode_wireguard(
            "wireguard://cGl2K2tleQ==@wg.example.com:51820?publickey=Ab+Cd/Ef=&presharedkey=x+y=#wg",
        )
        .unwrap();
        match proxy.params {
            ProtocolParams::WireGuard {
                peer_public_key,
                pre_shared_key,
                ..
            } => {
                assert_eq!(peer_public_key, "Ab+Cd/Ef=");
                assert_eq!(pre_shared_key.as_deref(), Some("x+y="));
            }
            other => panic!("unexpected params {:?}", other),
        }
    }

    #[test]
    fn test_wg_alias_defaults() {
        let proxy = explode_wireguard("wg://host.example.com:51820?privateKey=AAA&publicKey=BBB").unwrap();
        match proxy.params {
            ProtocolParams::WireGuard { local_address, .. } => {
                assert_eq!(local_address, vec![DEFAULT_ADDRESS.to_string()])
            }
            other => panic!("unexpected params {:?}", other),
        }
    }

    #[test]
    fn test_missing_keys() {
        assert!(explode_wireguard("wireguard://key@1.1.1.1:51820").is_err());
        assert!(explode_wireguard("wireguard://1.1.1.1:51820?publickey=x").is_err());
    }
}
