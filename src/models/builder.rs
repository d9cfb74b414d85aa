use super::proxy::{default_tag, ProtocolParams, Proxy, ProxyOrigin, TlsOptions, Transport};

impl Proxy {
    /// Create a record with no TLS, plain TCP transport and no inferred country.
    ///
    /// An empty `tag` is replaced by `server:port`.
    pub fn new(tag: &str, server: &str, port: u16, params: ProtocolParams) -> Proxy {
        let tag = tag.trim();
        Proxy {
            tag: if tag.is_empty() {
                default_tag(server, port)
            } else {
                tag.to_string()
            },
            server: server.to_string(),
            port,
            params,
            tls: None,
            transport: None,
            udp: None,
            tcp_fast_open: None,
            country: None,
            origin: ProxyOrigin::Link,
        }
    }

    pub fn with_tls(mut self, tls: Option<TlsOptions>) -> Proxy {
        self.tls = tls;
        self
    }

    pub fn with_transport(mut self, transport: Option<Transport>) -> Proxy {
        self.transport = transport;
        self
    }

    pub fn with_udp(mut self, udp: Option<bool>) -> Proxy {
        self.udp = udp;
        self
    }

    pub fn with_tfo(mut self, tfo: Option<bool>) -> Proxy {
        self.tcp_fast_open = tfo;
        self
    }

    pub fn with_origin(mut self, origin: ProxyOrigin) -> Proxy {
        self.origin = origin;
        self
    }
}

impl TlsOptions {
    pub fn with_server_name(server_name: Option<String>) -> TlsOptions {
        TlsOptions {
            server_name: server_name.filter(|s| !s.is_empty()),
            ..Default::default()
        }
    }
}
