//! Proxy model definitions
//!
//! Contains the canonical, dialect-independent proxy record every decode path
//! produces and every emitter consumes.

use std::fmt;

/// Represents the type of a proxy.
/// This is the canonical enum used for proxy type identification across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    Shadowsocks,
    VMess,
    Vless,
    Trojan,
    Hysteria,
    Hysteria2,
    Tuic,
    WireGuard,
    Socks5,
    Http,
}

impl ProxyType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProxyType::Shadowsocks => "SS",
            ProxyType::VMess => "VMess",
            ProxyType::Vless => "VLESS",
            ProxyType::Trojan => "Trojan",
            ProxyType::Hysteria => "Hysteria",
            ProxyType::Hysteria2 => "Hysteria2",
            ProxyType::Tuic => "TUIC",
            ProxyType::WireGuard => "WireGuard",
            ProxyType::Socks5 => "SOCKS5",
            ProxyType::Http => "HTTP",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which decode path produced a record. Only used for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOrigin {
    /// A literal link from the input text.
    Link,
    /// A link found inside a base64 blob.
    EncodedBlob,
    /// An entry of a `proxies` collection in a structured document.
    Structured,
    /// Content fetched from a remote subscription URL.
    Remote(String),
}

impl Default for ProxyOrigin {
    fn default() -> Self {
        ProxyOrigin::Link
    }
}

/// REALITY parameters carried inside the TLS block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RealityOptions {
    pub public_key: String,
    pub short_id: Option<String>,
}

/// TLS settings shared by every TLS-capable protocol.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TlsOptions {
    pub server_name: Option<String>,
    pub insecure: bool,
    pub alpn: Vec<String>,
    /// uTLS client fingerprint, e.g. `chrome`
    pub fingerprint: Option<String>,
    pub reality: Option<RealityOptions>,
}

/// Transport layered over TCP. Plain TCP is represented by `None` on the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Ws {
        path: Option<String>,
        host: Option<String>,
    },
    Grpc {
        service_name: Option<String>,
    },
    Http {
        path: Option<String>,
        hosts: Vec<String>,
    },
    HttpUpgrade {
        path: Option<String>,
        host: Option<String>,
    },
}

impl Transport {
    /// Build a transport from the loosely named `type`/`network` parameter used by links.
    ///
    /// Returns `None` for tcp and for networks this crate does not model.
    pub fn from_network(
        network: &str,
        path: Option<String>,
        host: Option<String>,
        service_name: Option<String>,
    ) -> Option<Transport> {
        match network.to_ascii_lowercase().as_str() {
            "ws" | "websocket" => Some(Transport::Ws { path, host }),
            "grpc" => Some(Transport::Grpc {
                service_name: service_name.or(path),
            }),
            "h2" | "http" => Some(Transport::Http {
                path,
                hosts: host
                    .map(|h| {
                        h.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            }),
            "httpupgrade" => Some(Transport::HttpUpgrade { path, host }),
            _ => None,
        }
    }

    pub fn network(&self) -> &'static str {
        match self {
            Transport::Ws { .. } => "ws",
            Transport::Grpc { .. } => "grpc",
            Transport::Http { .. } => "h2",
            Transport::HttpUpgrade { .. } => "httpupgrade",
        }
    }
}

/// Obfuscation wrapper used by the Hysteria family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obfs {
    pub kind: String,
    pub password: Option<String>,
}

/// Protocol specific parameters of a proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolParams {
    Shadowsocks {
        method: String,
        password: String,
        plugin: Option<String>,
        /// Plugin options in the format of `key1=value1;key2=value2`
        plugin_opts: Option<String>,
    },
    VMess {
        uuid: String,
        alter_id: u16,
        security: String,
    },
    Vless {
        uuid: String,
        flow: Option<String>,
        packet_encoding: Option<String>,
    },
    Trojan {
        password: String,
    },
    Hysteria {
        auth: Option<String>,
        /// upload speed in Mbps
        up_mbps: Option<u32>,
        /// download speed in Mbps
        down_mbps: Option<u32>,
        obfs: Option<String>,
        protocol: Option<String>,
    },
    Hysteria2 {
        password: String,
        up_mbps: Option<u32>,
        down_mbps: Option<u32>,
        obfs: Option<Obfs>,
        /// Port hopping range, e.g. `20000-30000`
        ports: Option<String>,
    },
    Tuic {
        uuid: String,
        password: String,
        congestion_control: Option<String>,
        udp_relay_mode: Option<String>,
    },
    WireGuard {
        private_key: String,
        peer_public_key: String,
        pre_shared_key: Option<String>,
        local_address: Vec<String>,
        mtu: Option<u16>,
        reserved: Option<Vec<u8>>,
    },
    Socks5 {
        username: Option<String>,
        password: Option<String>,
    },
    Http {
        username: Option<String>,
        password: Option<String>,
    },
}

impl ProtocolParams {
    pub fn proxy_type(&self) -> ProxyType {
        match self {
            ProtocolParams::Shadowsocks { .. } => ProxyType::Shadowsocks,
            ProtocolParams::VMess { .. } => ProxyType::VMess,
            ProtocolParams::Vless { .. } => ProxyType::Vless,
            ProtocolParams::Trojan { .. } => ProxyType::Trojan,
            ProtocolParams::Hysteria { .. } => ProxyType::Hysteria,
            ProtocolParams::Hysteria2 { .. } => ProxyType::Hysteria2,
            ProtocolParams::Tuic { .. } => ProxyType::Tuic,
            ProtocolParams::WireGuard { .. } => ProxyType::WireGuard,
            ProtocolParams::Socks5 { .. } => ProxyType::Socks5,
            ProtocolParams::Http { .. } => ProxyType::Http,
        }
    }
}

/// Represents a canonical proxy record.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    /// Display name, unique within one build once tags are deduplicated.
    pub tag: String,
    pub server: String,
    pub port: u16,
    pub params: ProtocolParams,
    pub tls: Option<TlsOptions>,
    pub transport: Option<Transport>,
    pub udp: Option<bool>,
    pub tcp_fast_open: Option<bool>,
    /// ISO 3166 alpha-2 code inferred from the tag.
    pub country: Option<String>,
    pub origin: ProxyOrigin,
}

impl Proxy {
    pub fn proxy_type(&self) -> ProxyType {
        self.params.proxy_type()
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// True when both records describe the same server with the same parameters.
    ///
    /// Tag, inferred country and origin are ignored.
    pub fn same_endpoint(&self, other: &Proxy) -> bool {
        self.server == other.server
            && self.port == other.port
            && self.params == other.params
            && self.tls == other.tls
            && self.transport == other.transport
            && self.udp == other.udp
            && self.tcp_fast_open == other.tcp_fast_open
    }
}

/// Default remark used when a link carries no label.
pub fn default_tag(server: &str, port: u16) -> String {
    format!("{}:{}", server, port)
}
