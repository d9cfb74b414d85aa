//! Structural converter: Clash-style `proxies` entries to canonical records.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::SublinkError;
use crate::models::{
    Obfs, ProtocolParams, Proxy, ProxyOrigin, RealityOptions, TlsOptions, Transport,
};

use super::common::parse_mbps;

// Fields that generators emit either as a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumberVisitor;

    impl<'de> Visitor<'de> for StringOrNumberVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("string or number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = deserialize_string_or_number(deserializer)?
        .ok_or_else(|| de::Error::custom("missing port"))?;
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(de::Error::custom(format!("invalid port '{}'", raw))),
        Ok(port) => Ok(port),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => s
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Reserved {
    Bytes(Vec<u8>),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct WsOpts {
    path: Option<String>,
    headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct GrpcOpts {
    #[serde(rename = "grpc-service-name")]
    service_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct H2Opts {
    path: Option<String>,
    host: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RealityOpts {
    public_key: String,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    short_id: Option<String>,
}

/// TLS, transport and socket options shared by every proxy type
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct ClashCommonOpts {
    udp: Option<bool>,
    tfo: Option<bool>,
    tls: Option<bool>,
    skip_cert_verify: Option<bool>,
    sni: Option<String>,
    servername: Option<String>,
    alpn: Option<OneOrMany>,
    client_fingerprint: Option<String>,
    network: Option<String>,
    ws_opts: Option<WsOpts>,
    grpc_opts: Option<GrpcOpts>,
    h2_opts: Option<H2Opts>,
    reality_opts: Option<RealityOpts>,
}

impl ClashCommonOpts {
    fn tls(&self, force: bool) -> Option<TlsOptions> {
        if !force && self.tls != Some(true) && self.reality_opts.is_none() {
            return None;
        }
        Some(TlsOptions {
            server_name: self
                .sni
                .clone()
                .or_else(|| self.servername.clone())
                .filter(|s| !s.is_empty()),
            insecure: self.skip_cert_verify.unwrap_or(false),
            alpn: self.alpn.clone().map(OneOrMany::into_vec).unwrap_or_default(),
            fingerprint: self.client_fingerprint.clone(),
            reality: self.reality_opts.as_ref().map(|r| RealityOptions {
                public_key: r.public_key.clone(),
                short_id: r.short_id.clone(),
            }),
        })
    }

    fn transport(&self) -> Option<Transport> {
        let network = self.network.as_deref()?;
        let ws = self.ws_opts.clone().unwrap_or_default();
        let ws_host = ws.headers.as_ref().and_then(|h| {
            h.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("host"))
                .map(|(_, v)| v.clone())
        });
        match network {
            "ws" => Some(Transport::Ws {
                path: ws.path,
                host: ws_host,
            }),
            "httpupgrade" => Some(Transport::HttpUpgrade {
                path: ws.path,
                host: ws_host,
            }),
            "grpc" => Some(Transport::Grpc {
                service_name: self.grpc_opts.as_ref().and_then(|g| g.service_name.clone()),
            }),
            "h2" | "http" => {
                let h2 = self.h2_opts.clone().unwrap_or_default();
                Some(Transport::Http {
                    path: h2.path,
                    hosts: h2.host,
                })
            }
            _ => None,
        }
    }
}

/// Represents a single proxy in a Clash `proxies` list
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ClashProxyYamlInput {
    #[serde(rename = "ss", rename_all = "kebab-case")]
    Shadowsocks {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        cipher: String,
        #[serde(deserialize_with = "deserialize_string_or_number")]
        password: Option<String>,
        #[serde(default)]
        plugin: Option<String>,
        #[serde(default)]
        plugin_opts: Option<Mapping>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(rename = "vmess")]
    VMess {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        uuid: String,
        #[serde(rename = "alterId", default, deserialize_with = "deserialize_string_or_number")]
        alter_id: Option<String>,
        #[serde(default)]
        cipher: Option<String>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(rename = "vless", rename_all = "kebab-case")]
    Vless {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        uuid: String,
        #[serde(default)]
        flow: Option<String>,
        #[serde(default)]
        packet_encoding: Option<String>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(rename = "trojan")]
    Trojan {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        #[serde(deserialize_with = "deserialize_string_or_number")]
        password: Option<String>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(rename = "hysteria", rename_all = "kebab-case")]
    Hysteria {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        #[serde(default, alias = "auth_str", alias = "auth")]
        auth_str: Option<String>,
        #[serde(default, deserialize_with = "deserialize_string_or_number")]
        up: Option<String>,
        #[serde(default, deserialize_with = "deserialize_string_or_number")]
        down: Option<String>,
        #[serde(default)]
        obfs: Option<String>,
        #[serde(default)]
        protocol: Option<String>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(rename = "hysteria2", rename_all = "kebab-case")]
    Hysteria2 {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        #[serde(default, alias = "auth", deserialize_with = "deserialize_string_or_number")]
        password: Option<String>,
        #[serde(default, deserialize_with = "deserialize_string_or_number")]
        up: Option<String>,
        #[serde(default, deserialize_with = "deserialize_string_or_number")]
        down: Option<String>,
        #[serde(default)]
        obfs: Option<String>,
        #[serde(default)]
        obfs_password: Option<String>,
        #[serde(default)]
        ports: Option<String>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(rename = "tuic", rename_all = "kebab-case")]
    Tuic {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        uuid: String,
        #[serde(deserialize_with = "deserialize_string_or_number")]
        password: Option<String>,
        #[serde(default)]
        congestion_controller: Option<String>,
        #[serde(default)]
        udp_relay_mode: Option<String>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(rename = "wireguard", rename_all = "kebab-case")]
    WireGuard {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        private_key: String,
        public_key: String,
        #[serde(default, alias = "preshared-key")]
        pre_shared_key: Option<String>,
        #[serde(default)]
        ip: Option<String>,
        #[serde(default)]
        ipv6: Option<String>,
        #[serde(default)]
        mtu: Option<u16>,
        #[serde(default)]
        reserved: Option<Reserved>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(rename = "socks5")]
    Socks5 {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        #[serde(default, deserialize_with = "deserialize_string_or_number")]
        username: Option<String>,
        #[serde(default, deserialize_with = "deserialize_string_or_number")]
        password: Option<String>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(rename = "http")]
    Http {
        name: String,
        server: String,
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
        #[serde(default, deserialize_with = "deserialize_string_or_number")]
        username: Option<String>,
        #[serde(default, deserialize_with = "deserialize_string_or_number")]
        password: Option<String>,
        #[serde(flatten)]
        common: ClashCommonOpts,
    },

    #[serde(other)]
    Unknown,
}

fn required(value: Option<String>, what: &str) -> Result<String, SublinkError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SublinkError::protocol(format!("missing {}", what)))
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// `plugin-opts` mapping in the `key=value;key=value` form used by links.
/// Clash calls the obfs type `mode`; links call it `obfs`.
fn plugin_opts_string(plugin: Option<&str>, opts: &Mapping) -> String {
    opts.iter()
        .map(|(k, v)| {
            let key = scalar_to_string(k);
            let key = match (plugin, key.as_str()) {
                (Some("obfs"), "mode") => "obfs".to_string(),
                (Some("obfs"), "host") => "obfs-host".to_string(),
                _ => key,
            };
            format!("{}={}", key, scalar_to_string(v))
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Convert one entry of a structured `proxies` collection into a canonical record.
pub fn explode_clash_proxy(value: &Value) -> Result<Proxy, SublinkError> {
    let type_name = value
        .get("type")
        .map(scalar_to_string)
        .unwrap_or_default();
    let input: ClashProxyYamlInput = serde_yaml::from_value(value.clone())
        .map_err(|e| SublinkError::protocol(format!("invalid '{}' proxy: {}", type_name, e)))?;

    let proxy = match input {
        ClashProxyYamlInput::Shadowsocks {
            name,
            server,
            port,
            cipher,
            password,
            plugin,
            plugin_opts,
            common,
        } => {
            let plugin_opts = plugin_opts
                .as_ref()
                .map(|opts| plugin_opts_string(plugin.as_deref(), opts))
                .filter(|s| !s.is_empty());
            let plugin = plugin.map(|p| match p.as_str() {
                "obfs" => "obfs-local".to_string(),
                _ => p,
            });
            Proxy::new(
                &name,
                &server,
                port,
                ProtocolParams::Shadowsocks {
                    method: cipher,
                    password: required(password, "password")?,
                    plugin,
                    plugin_opts,
                },
            )
            .with_udp(common.udp)
            .with_tfo(common.tfo)
        }
        ClashProxyYamlInput::VMess {
            name,
            server,
            port,
            uuid,
            alter_id,
            cipher,
            common,
        } => Proxy::new(
            &name,
            &server,
            port,
            ProtocolParams::VMess {
                uuid,
                alter_id: alter_id.and_then(|a| a.parse().ok()).unwrap_or(0),
                security: cipher.unwrap_or_else(|| "auto".to_string()),
            },
        )
        .with_tls(common.tls(false))
        .with_transport(common.transport())
        .with_udp(common.udp)
        .with_tfo(common.tfo),
        ClashProxyYamlInput::Vless {
            name,
            server,
            port,
            uuid,
            flow,
            packet_encoding,
            common,
        } => Proxy::new(
            &name,
            &server,
            port,
            ProtocolParams::Vless {
                uuid,
                flow: flow.filter(|f| !f.is_empty()),
                packet_encoding,
            },
        )
        .with_tls(common.tls(false))
        .with_transport(common.transport())
        .with_udp(common.udp)
        .with_tfo(common.tfo),
        ClashProxyYamlInput::Trojan {
            name,
            server,
            port,
            password,
            common,
        } => Proxy::new(
            &name,
            &server,
            port,
            ProtocolParams::Trojan {
                password: required(password, "password")?,
            },
        )
        .with_tls(common.tls(true))
        .with_transport(common.transport())
        .with_udp(common.udp)
        .with_tfo(common.tfo),
        ClashProxyYamlInput::Hysteria {
            name,
            server,
            port,
            auth_str,
            up,
            down,
            obfs,
            protocol,
            common,
        } => Proxy::new(
            &name,
            &server,
            port,
            ProtocolParams::Hysteria {
                auth: auth_str,
                up_mbps: up.as_deref().and_then(parse_mbps),
                down_mbps: down.as_deref().and_then(parse_mbps),
                obfs,
                protocol,
            },
        )
        .with_tls(common.tls(true)),
        ClashProxyYamlInput::Hysteria2 {
            name,
            server,
            port,
            password,
            up,
            down,
            obfs,
            obfs_password,
            ports,
            common,
        } => Proxy::new(
            &name,
            &server,
            port,
            ProtocolParams::Hysteria2 {
                password: required(password, "password")?,
                up_mbps: up.as_deref().and_then(parse_mbps),
                down_mbps: down.as_deref().and_then(parse_mbps),
                obfs: obfs.filter(|o| !o.is_empty()).map(|kind| Obfs {
                    kind,
                    password: obfs_password,
                }),
                ports,
            },
        )
        .with_tls(common.tls(true)),
        ClashProxyYamlInput::Tuic {
            name,
            server,
            port,
            uuid,
            password,
            congestion_controller,
            udp_relay_mode,
            common,
        } => Proxy::new(
            &name,
            &server,
            port,
            ProtocolParams::Tuic {
                uuid,
                password: required(password, "password")?,
                congestion_control: congestion_controller,
                udp_relay_mode,
            },
        )
        .with_tls(common.tls(true)),
        ClashProxyYamlInput::WireGuard {
            name,
            server,
            port,
            private_key,
            public_key,
            pre_shared_key,
            ip,
            ipv6,
            mtu,
            reserved,
            common,
        } => {
            let reserved = match reserved {
                Some(Reserved::Bytes(bytes)) => Some(bytes),
                Some(Reserved::Text(text)) => Some(
                    text.split(',')
                        .map(|b| b.trim().parse::<u8>())
                        .collect::<Result<Vec<u8>, _>>()
                        .map_err(|_| SublinkError::protocol(format!("bad reserved '{}'", text)))?,
                ),
                None => None,
            };
            let local_address = ip
                .into_iter()
                .chain(ipv6)
                .map(|addr| {
                    if addr.contains('/') {
                        addr
                    } else if addr.contains(':') {
                        format!("{}/128", addr)
                    } else {
                        format!("{}/32", addr)
                    }
                })
                .collect();
            Proxy::new(
                &name,
                &server,
                port,
                ProtocolParams::WireGuard {
                    private_key,
                    peer_public_key: public_key,
                    pre_shared_key,
                    local_address,
                    mtu,
                    reserved,
                },
            )
            .with_udp(common.udp)
        }
        ClashProxyYamlInput::Socks5 {
            name,
            server,
            port,
            username,
            password,
            common,
        } => Proxy::new(
            &name,
            &server,
            port,
            ProtocolParams::Socks5 { username, password },
        )
        .with_tls(common.tls(false))
        .with_udp(common.udp)
        .with_tfo(common.tfo),
        ClashProxyYamlInput::Http {
            name,
            server,
            port,
            username,
            password,
            common,
        } => Proxy::new(
            &name,
            &server,
            port,
            ProtocolParams::Http { username, password },
        )
        .with_tls(common.tls(false))
        .with_tfo(common.tfo),
        ClashProxyYamlInput::Unknown => {
            return Err(SublinkError::protocol(format!(
                "unsupported proxy type '{}'",
                type_name
            )))
        }
    };

    Ok(proxy.with_origin(ProxyOrigin::Structured))
}
