//! Clash proxy entries as they are written to the `proxies` sequence.

use serde::Serialize;

use crate::error::SublinkError;
use crate::models::{ProtocolParams, Proxy, TlsOptions, Transport};

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WsOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<WsHeaders>,
    #[serde(
        rename = "v2ray-http-upgrade",
        skip_serializing_if = "is_false"
    )]
    pub http_upgrade: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WsHeaders {
    #[serde(rename = "Host")]
    pub host: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct GrpcOpts {
    pub grpc_service_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct H2Opts {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RealityOpts {
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

/// Fields shared by every Clash proxy entry.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CommonProxyOptions {
    pub name: String,
    pub server: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tfo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<RealityOpts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOpts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOpts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h2_opts: Option<H2Opts>,
}

/// Where a protocol expects the TLS server name.
#[derive(Clone, Copy)]
enum SniKey {
    Servername,
    Sni,
}

impl CommonProxyOptions {
    fn from_proxy(proxy: &Proxy, sni_key: SniKey) -> Self {
        let mut common = CommonProxyOptions {
            name: proxy.tag.clone(),
            server: proxy.server.clone(),
            port: proxy.port,
            udp: proxy.udp,
            tfo: proxy.tcp_fast_open,
            ..Default::default()
        };
        if let Some(tls) = &proxy.tls {
            common.apply_tls(tls, sni_key);
        }
        if let Some(transport) = &proxy.transport {
            common.apply_transport(transport);
        }
        common
    }

    fn apply_tls(&mut self, tls: &TlsOptions, sni_key: SniKey) {
        self.tls = Some(true);
        if tls.insecure {
            self.skip_cert_verify = Some(true);
        }
        match sni_key {
            SniKey::Servername => self.servername = tls.server_name.clone(),
            SniKey::Sni => self.sni = tls.server_name.clone(),
        }
        self.alpn = tls.alpn.clone();
        self.client_fingerprint = tls.fingerprint.clone();
        self.reality_opts = tls.reality.as_ref().map(|r| RealityOpts {
            public_key: r.public_key.clone(),
            short_id: r.short_id.clone(),
        });
    }

    fn apply_transport(&mut self, transport: &Transport) {
        match transport {
            Transport::Ws { path, host } | Transport::HttpUpgrade { path, host } => {
                self.network = Some("ws".to_string());
                self.ws_opts = Some(WsOpts {
                    path: path.clone(),
                    headers: host.clone().map(|host| WsHeaders { host }),
                    http_upgrade: matches!(transport, Transport::HttpUpgrade { .. }),
                });
            }
            Transport::Grpc { service_name } => {
                self.network = Some("grpc".to_string());
                self.grpc_opts = Some(GrpcOpts {
                    grpc_service_name: service_name.clone().unwrap_or_default(),
                });
            }
            Transport::Http { path, hosts } => {
                self.network = Some("h2".to_string());
                self.h2_opts = Some(H2Opts {
                    host: hosts.clone(),
                    path: path.clone(),
                });
            }
        }
    }
}

/// One entry of the Clash `proxies` sequence.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClashProxyOutput {
    Ss {
        #[serde(flatten)]
        common: CommonProxyOptions,
        cipher: String,
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        plugin: Option<String>,
        #[serde(rename = "plugin-opts", skip_serializing_if = "Option::is_none")]
        plugin_opts: Option<serde_json::Map<String, serde_json::Value>>,
    },
    Vmess {
        #[serde(flatten)]
        common: CommonProxyOptions,
        uuid: String,
        #[serde(rename = "alterId")]
        alter_id: u16,
        cipher: String,
    },
    Vless {
        #[serde(flatten)]
        common: CommonProxyOptions,
        uuid: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        flow: Option<String>,
        #[serde(rename = "packet-encoding", skip_serializing_if = "Option::is_none")]
        packet_encoding: Option<String>,
    },
    Trojan {
        #[serde(flatten)]
        common: CommonProxyOptions,
        password: String,
    },
    Hysteria {
        #[serde(flatten)]
        common: CommonProxyOptions,
        #[serde(rename = "auth-str", skip_serializing_if = "Option::is_none")]
        auth_str: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        up: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        down: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        obfs: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
    },
    Hysteria2 {
        #[serde(flatten)]
        common: CommonProxyOptions,
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        up: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        down: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        obfs: Option<String>,
        #[serde(rename = "obfs-password", skip_serializing_if = "Option::is_none")]
        obfs_password: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ports: Option<String>,
    },
    Tuic {
        #[serde(flatten)]
        common: CommonProxyOptions,
        uuid: String,
        password: String,
        #[serde(rename = "congestion-controller", skip_serializing_if = "Option::is_none")]
        congestion_controller: Option<String>,
        #[serde(rename = "udp-relay-mode", skip_serializing_if = "Option::is_none")]
        udp_relay_mode: Option<String>,
    },
    Wireguard {
        #[serde(flatten)]
        common: CommonProxyOptions,
        #[serde(rename = "private-key")]
        private_key: String,
        #[serde(rename = "public-key")]
        public_key: String,
        #[serde(rename = "pre-shared-key", skip_serializing_if = "Option::is_none")]
        pre_shared_key: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ipv6: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mtu: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reserved: Option<Vec<u8>>,
    },
    Socks5 {
        #[serde(flatten)]
        common: CommonProxyOptions,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    Http {
        #[serde(flatten)]
        common: CommonProxyOptions,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
}

/// `obfs=http;obfs-host=example.com` into the mapping Clash expects.
/// Clash names the obfs plugin `obfs` and its keys `mode`/`host`.
fn plugin_opts_map(plugin: &str, opts: &str) -> serde_json::Map<String, serde_json::Value> {
    opts.split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, "true"));
            let key = match (plugin, key) {
                ("obfs", "obfs") => "mode",
                ("obfs", "obfs-host") => "host",
                _ => key,
            };
            let value = match value {
                "true" => serde_json::Value::Bool(true),
                "false" => serde_json::Value::Bool(false),
                v => serde_json::Value::String(v.to_string()),
            };
            Some((key.to_string(), value))
        })
        .collect()
}

impl TryFrom<&Proxy> for ClashProxyOutput {
    type Error = SublinkError;

    fn try_from(proxy: &Proxy) -> Result<Self, Self::Error> {
        let output = match &proxy.params {
            ProtocolParams::Shadowsocks {
                method,
                password,
                plugin,
                plugin_opts,
            } => {
                let plugin = plugin.as_deref().map(|p| match p {
                    "obfs-local" | "simple-obfs" => "obfs",
                    other => other,
                });
                ClashProxyOutput::Ss {
                    common: CommonProxyOptions::from_proxy(proxy, SniKey::Sni),
                    cipher: method.clone(),
                    password: password.clone(),
                    plugin_opts: match (plugin, plugin_opts) {
                        (Some(p), Some(opts)) => Some(plugin_opts_map(p, opts)),
                        _ => None,
                    },
                    plugin: plugin.map(str::to_string),
                }
            }
            ProtocolParams::VMess {
                uuid,
                alter_id,
                security,
            } => ClashProxyOutput::Vmess {
                common: CommonProxyOptions::from_proxy(proxy, SniKey::Servername),
                uuid: uuid.clone(),
                alter_id: *alter_id,
                cipher: security.clone(),
            },
            ProtocolParams::Vless {
                uuid,
                flow,
                packet_encoding,
            } => ClashProxyOutput::Vless {
                common: CommonProxyOptions::from_proxy(proxy, SniKey::Servername),
                uuid: uuid.clone(),
                flow: flow.clone(),
                packet_encoding: packet_encoding.clone(),
            },
            ProtocolParams::Trojan { password } => {
                let mut common = CommonProxyOptions::from_proxy(proxy, SniKey::Sni);
                // trojan is always TLS in Clash
                common.tls = None;
                ClashProxyOutput::Trojan {
                    common,
                    password: password.clone(),
                }
            }
            ProtocolParams::Hysteria {
                auth,
                up_mbps,
                down_mbps,
                obfs,
                protocol,
            } => ClashProxyOutput::Hysteria {
                common: CommonProxyOptions::from_proxy(proxy, SniKey::Sni),
                auth_str: auth.clone(),
                up: *up_mbps,
                down: *down_mbps,
                obfs: obfs.clone(),
                protocol: protocol.clone(),
            },
            ProtocolParams::Hysteria2 {
                password,
                up_mbps,
                down_mbps,
                obfs,
                ports,
            } => {
                let mut common = CommonProxyOptions::from_proxy(proxy, SniKey::Sni);
                common.tls = None;
                ClashProxyOutput::Hysteria2 {
                    common,
                    password: password.clone(),
                    up: *up_mbps,
                    down: *down_mbps,
                    obfs: obfs.as_ref().map(|o| o.kind.clone()),
                    obfs_password: obfs.as_ref().and_then(|o| o.password.clone()),
                    ports: ports.clone(),
                }
            }
            ProtocolParams::Tuic {
                uuid,
                password,
                congestion_control,
                udp_relay_mode,
            } => {
                let mut common = CommonProxyOptions::from_proxy(proxy, SniKey::Sni);
                common.tls = None;
                ClashProxyOutput::Tuic {
                    common,
                    uuid: uuid.clone(),
                    password: password.clone(),
                    congestion_controller: congestion_control.clone(),
                    udp_relay_mode: udp_relay_mode.clone(),
                }
            }
            ProtocolParams::WireGuard {
                private_key,
                peer_public_key,
                pre_shared_key,
                local_address,
                mtu,
                reserved,
            } => {
                let strip = |a: &String| a.split('/').next().unwrap_or(a.as_str()).to_string();
                ClashProxyOutput::Wireguard {
                    common: CommonProxyOptions::from_proxy(proxy, SniKey::Sni),
                    private_key: private_key.clone(),
                    public_key: peer_public_key.clone(),
                    pre_shared_key: pre_shared_key.clone(),
                    ip: local_address.iter().find(|a| !a.contains(':')).map(strip),
                    ipv6: local_address.iter().find(|a| a.contains(':')).map(strip),
                    mtu: *mtu,
                    reserved: reserved.clone(),
                }
            }
            ProtocolParams::Socks5 { username, password } => ClashProxyOutput::Socks5 {
                common: CommonProxyOptions::from_proxy(proxy, SniKey::Sni),
                username: username.clone(),
                password: password.clone(),
            },
            ProtocolParams::Http { username, password } => ClashProxyOutput::Http {
                common: CommonProxyOptions::from_proxy(proxy, SniKey::Sni),
                username: username.clone(),
                password: password.clone(),
            },
        };
        Ok(output)
    }
}

impl ClashProxyOutput {
    pub fn common(&self) -> &CommonProxyOptions {
        match self {
            ClashProxyOutput::Ss { common, .. }
            | ClashProxyOutput::Vmess { common, .. }
            | ClashProxyOutput::Vless { common, .. }
            | ClashProxyOutput::Trojan { common, .. }
            | ClashProxyOutput::Hysteria { common, .. }
            | ClashProxyOutput::Hysteria2 { common, .. }
            | ClashProxyOutput::Tuic { common, .. }
            | ClashProxyOutput::Wireguard { common, .. }
            | ClashProxyOutput::Socks5 { common, .. }
            | ClashProxyOutput::Http { common, .. } => common,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Obfs, RealityOptions};
    use serde_json::json;

    fn to_json(proxy: &Proxy) -> serde_json::Value {
        serde_json::to_value(ClashProxyOutput::try_from(proxy).unwrap()).unwrap()
    }

    #[test]
    fn test_vless_reality_grpc() {
        let proxy = Proxy::new(
            "R",
            "r.example.com",
            443,
            ProtocolParams::Vless {
                uuid: "id".into(),
                flow: Some("xtls-rprx-vision".into()),
                packet_encoding: None,
            },
        )
        .with_tls(Some(TlsOptions {
            server_name: Some("www.example.com".into()),
            fingerprint: Some("chrome".into()),
            reality: Some(RealityOptions {
                public_key: "pbk".into(),
                short_id: Some("ab".into()),
            }),
            ..Default::default()
        }))
        .with_transport(Some(Transport::Grpc {
            service_name: Some("svc".into()),
        }));

        assert_eq!(
            to_json(&proxy),
            json!({
                "type": "vless",
                "name": "R",
                "server": "r.example.com",
                "port": 443,
                "tls": true,
                "servername": "www.example.com",
                "client-fingerprint": "chrome",
                "reality-opts": {"public-key": "pbk", "short-id": "ab"},
                "network": "grpc",
                "grpc-opts": {"grpc-service-name": "svc"},
                "uuid": "id",
                "flow": "xtls-rprx-vision"
            })
        );
    }

    #[test]
    fn test_ss_obfs_plugin() {
        let proxy = Proxy::new(
            "S",
            "1.2.3.4",
            8388,
            ProtocolParams::Shadowsocks {
                method: "aes-128-gcm".into(),
                password: "pw".into(),
                plugin: Some("obfs-local".into()),
                plugin_opts: Some("obfs=http;obfs-host=example.com".into()),
            },
        );
        let value = to_json(&proxy);
        assert_eq!(value["plugin"], json!("obfs"));
        assert_eq!(value["plugin-opts"], json!({"mode": "http", "host": "example.com"}));
    }

    #[test]
    fn test_hysteria2_and_wireguard() {
        let hy2 = Proxy::new(
            "H",
            "h.example.com",
            443,
            ProtocolParams::Hysteria2 {
                password: "pw".into(),
                up_mbps: None,
                down_mbps: Some(100),
                obfs: Some(Obfs {
                    kind: "salamander".into(),
                    password: Some("o".into()),
                }),
                ports: None,
            },
        )
        .with_tls(Some(TlsOptions::with_server_name(Some("h.example.com".into()))));
        let value = to_json(&hy2);
        assert_eq!(value["type"], json!("hysteria2"));
        assert_eq!(value["sni"], json!("h.example.com"));
        assert_eq!(value["obfs-password"], json!("o"));
        assert!(value.get("tls").is_none());

        let wg = Proxy::new(
            "W",
            "wg.example.com",
            51820,
            ProtocolParams::WireGuard {
                private_key: "priv".into(),
                peer_public_key: "pub".into(),
                pre_shared_key: None,
                local_address: vec!["10.0.0.2/32".into(), "fd00::2/128".into()],
                mtu: Some(1280),
                reserved: Some(vec![1, 2, 3]),
            },
        );
        let value = to_json(&wg);
        assert_eq!(value["ip"], json!("10.0.0.2"));
        assert_eq!(value["ipv6"], json!("fd00::2"));
        assert_eq!(value["reserved"], json!([1, 2, 3]));
    }
}
