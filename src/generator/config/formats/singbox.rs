use serde_json::{json, Map, Value};

use crate::constants::rule_sets::{SINGBOX_IP_RULE_SET_BASE_URL, SINGBOX_SITE_RULE_SET_BASE_URL};
use crate::error::SublinkError;
use crate::generator::config::emitter::DialectEmitter;
use crate::generator::config::ruleconvert::{collect_rule_sets, final_outbound, ordered_rules, RuleSetRef};
use crate::models::{
    Group, GroupKind, MatchPredicate, ProtocolParams, Proxy, RuleCategory, TlsOptions, Transport,
    DIRECT, REJECT,
};

use super::{into_mapping, take_sequence, upsert};

/// Outbound types that are not proxies.
const NON_PROXY_TYPES: &[&str] = &["direct", "block", "dns", "selector", "urltest"];

/// Emits sing-box JSON documents.
pub struct SingBoxEmitter {
    document: Map<String, Value>,
    outbounds: Vec<Value>,
}

impl SingBoxEmitter {
    pub fn new(document: Value) -> Self {
        let mut document = into_mapping(document);
        let mut outbounds = take_sequence(&mut document, "outbounds");
        for (tag, kind) in [(DIRECT, "direct"), (REJECT, "block")] {
            if !outbounds.iter().any(|o| o["tag"] == tag) {
                outbounds.push(json!({ "type": kind, "tag": tag }));
            }
        }
        SingBoxEmitter {
            document,
            outbounds,
        }
    }
}

fn tls_value(tls: &TlsOptions) -> Value {
    let mut value = json!({ "enabled": true });
    if let Some(server_name) = &tls.server_name {
        value["server_name"] = json!(server_name);
    }
    if tls.insecure {
        value["insecure"] = json!(true);
    }
    if !tls.alpn.is_empty() {
        value["alpn"] = json!(tls.alpn);
    }
    // reality needs uTLS
    let fingerprint = tls
        .fingerprint
        .clone()
        .or_else(|| tls.reality.as_ref().map(|_| "chrome".to_string()));
    if let Some(fingerprint) = fingerprint {
        value["utls"] = json!({ "enabled": true, "fingerprint": fingerprint });
    }
    if let Some(reality) = &tls.reality {
        let mut r = json!({ "enabled": true, "public_key": reality.public_key });
        if let Some(short_id) = &reality.short_id {
            r["short_id"] = json!(short_id);
        }
        value["reality"] = r;
    }
    value
}

fn transport_value(transport: &Transport) -> Value {
    let mut value = json!({ "type": transport.network() });
    match transport {
        Transport::Ws { path, host } => {
            if let Some(path) = path {
                value["path"] = json!(path);
            }
            if let Some(host) = host {
                value["headers"] = json!({ "Host": host });
            }
        }
        Transport::HttpUpgrade { path, host } => {
            if let Some(path) = path {
                value["path"] = json!(path);
            }
            if let Some(host) = host {
                value["host"] = json!(host);
            }
        }
        Transport::Grpc { service_name } => {
            if let Some(service_name) = service_name {
                value["service_name"] = json!(service_name);
            }
        }
        Transport::Http { path, hosts } => {
            // sing-box calls h2 "http"
            value["type"] = json!("http");
            if !hosts.is_empty() {
                value["host"] = json!(hosts);
            }
            if let Some(path) = path {
                value["path"] = json!(path);
            }
        }
    }
    value
}

fn insert_some<T: serde::Serialize>(value: &mut Value, key: &str, field: &Option<T>) {
    if let Some(field) = field {
        value[key] = json!(field);
    }
}

fn group_value(group: &Group) -> Value {
    match group.kind {
        GroupKind::URLTest | GroupKind::LoadBalance => {
            let mut value = json!({
                "type": "urltest",
                "tag": group.name,
                "outbounds": group.members,
            });
            insert_some(&mut value, "url", &group.url);
            if let Some(interval) = group.interval {
                value["interval"] = json!(format!("{}s", interval));
            }
            value
        }
        GroupKind::Select => json!({
            "type": "selector",
            "tag": group.name,
            "outbounds": group.members,
        }),
        // no fallback chain outbound; the first member is the default pick
        GroupKind::Fallback => {
            let mut value = json!({
                "type": "selector",
                "tag": group.name,
                "outbounds": group.members,
            });
            if let Some(first) = group.members.first() {
                value["default"] = json!(first);
            }
            value
        }
    }
}

fn rule_set_tag(set: &RuleSetRef<'_>) -> String {
    if set.is_ip() {
        format!("geoip-{}", set.name())
    } else {
        format!("geosite-{}", set.name())
    }
}

fn rule_set_value(set: &RuleSetRef<'_>) -> Value {
    let tag = rule_set_tag(set);
    let base = if set.is_ip() {
        SINGBOX_IP_RULE_SET_BASE_URL
    } else {
        SINGBOX_SITE_RULE_SET_BASE_URL
    };
    json!({
        "tag": tag,
        "type": "remote",
        "format": "binary",
        "url": format!("{}{}.srs", base, tag),
        "download_detour": DIRECT,
    })
}

fn route_rule(predicate: &MatchPredicate, outbound: &str) -> Option<Value> {
    let mut rule = match predicate {
        MatchPredicate::DomainSuffix(s) => json!({ "domain_suffix": [s] }),
        MatchPredicate::DomainKeyword(s) => json!({ "domain_keyword": [s] }),
        MatchPredicate::IpCidr(s) => json!({ "ip_cidr": [s] }),
        MatchPredicate::GeoSite(name) => json!({ "rule_set": [rule_set_tag(&RuleSetRef::Site(name))] }),
        MatchPredicate::GeoIp(name) => json!({ "rule_set": [rule_set_tag(&RuleSetRef::Ip(name))] }),
        // handled by route.final
        MatchPredicate::Final => return None,
    };
    rule["outbound"] = json!(outbound);
    Some(rule)
}

impl DialectEmitter for SingBoxEmitter {
    fn proxies(&self) -> Vec<&Value> {
        self.outbounds
            .iter()
            .filter(|o| {
                o.get("type")
                    .and_then(Value::as_str)
                    .map_or(true, |t| !NON_PROXY_TYPES.contains(&t))
            })
            .collect()
    }

    fn proxy_name(&self, proxy: &Value) -> Option<String> {
        proxy.get("tag").and_then(Value::as_str).map(str::to_string)
    }

    fn convert_proxy(&self, proxy: &Proxy) -> Result<Value, SublinkError> {
        let mut value = json!({
            "tag": proxy.tag,
            "server": proxy.server,
            "server_port": proxy.port,
        });

        match &proxy.params {
            ProtocolParams::Shadowsocks {
                method,
                password,
                plugin,
                plugin_opts,
            } => {
                value["type"] = json!("shadowsocks");
                value["method"] = json!(method);
                value["password"] = json!(password);
                insert_some(&mut value, "plugin", plugin);
                insert_some(&mut value, "plugin_opts", plugin_opts);
            }
            ProtocolParams::VMess {
                uuid,
                alter_id,
                security,
            } => {
                value["type"] = json!("vmess");
                value["uuid"] = json!(uuid);
                value["alter_id"] = json!(alter_id);
                value["security"] = json!(security);
            }
            ProtocolParams::Vless {
                uuid,
                flow,
                packet_encoding,
            } => {
                value["type"] = json!("vless");
                value["uuid"] = json!(uuid);
                insert_some(&mut value, "flow", flow);
                insert_some(&mut value, "packet_encoding", packet_encoding);
            }
            ProtocolParams::Trojan { password } => {
                value["type"] = json!("trojan");
                value["password"] = json!(password);
            }
            ProtocolParams::Hysteria {
                auth,
                up_mbps,
                down_mbps,
                obfs,
                protocol: _,
            } => {
                value["type"] = json!("hysteria");
                insert_some(&mut value, "auth_str", auth);
                insert_some(&mut value, "up_mbps", up_mbps);
                insert_some(&mut value, "down_mbps", down_mbps);
                insert_some(&mut value, "obfs", obfs);
            }
            ProtocolParams::Hysteria2 {
                password,
                up_mbps,
                down_mbps,
                obfs,
                ports,
            } => {
                value["type"] = json!("hysteria2");
                value["password"] = json!(password);
                insert_some(&mut value, "up_mbps", up_mbps);
                insert_some(&mut value, "down_mbps", down_mbps);
                if let Some(obfs) = obfs {
                    let mut o = json!({ "type": obfs.kind });
                    insert_some(&mut o, "password", &obfs.password);
                    value["obfs"] = o;
                }
                if let Some(ports) = ports {
                    let ranges: Vec<String> = ports.split(',').map(|r| r.trim().replace('-', ":")).collect();
                    value["server_ports"] = json!(ranges);
                }
            }
            ProtocolParams::Tuic {
                uuid,
                password,
                congestion_control,
                udp_relay_mode,
            } => {
                value["type"] = json!("tuic");
                value["uuid"] = json!(uuid);
                value["password"] = json!(password);
                insert_some(&mut value, "congestion_control", congestion_control);
                insert_some(&mut value, "udp_relay_mode", udp_relay_mode);
            }
            ProtocolParams::WireGuard {
                private_key,
                peer_public_key,
                pre_shared_key,
                local_address,
                mtu,
                reserved,
            } => {
                value["type"] = json!("wireguard");
                value["private_key"] = json!(private_key);
                value["peer_public_key"] = json!(peer_public_key);
                value["local_address"] = json!(local_address);
                insert_some(&mut value, "pre_shared_key", pre_shared_key);
                insert_some(&mut value, "mtu", mtu);
                insert_some(&mut value, "reserved", reserved);
            }
            ProtocolParams::Socks5 { username, password } => {
                value["type"] = json!("socks");
                value["version"] = json!("5");
                insert_some(&mut value, "username", username);
                insert_some(&mut value, "password", password);
            }
            ProtocolParams::Http { username, password } => {
                value["type"] = json!("http");
                insert_some(&mut value, "username", username);
                insert_some(&mut value, "password", password);
            }
        }

        if let Some(tls) = &proxy.tls {
            value["tls"] = tls_value(tls);
        }
        if let Some(transport) = &proxy.transport {
            value["transport"] = transport_value(transport);
        }
        if proxy.tcp_fast_open == Some(true) {
            value["tcp_fast_open"] = json!(true);
        }
        if proxy.udp == Some(false) {
            value["network"] = json!("tcp");
        }
        Ok(value)
    }

    fn add_proxy(&mut self, proxy: Value) {
        let tag = self.proxy_name(&proxy);
        upsert(&mut self.outbounds, proxy, |o| {
            o.get("tag").and_then(Value::as_str) == tag.as_deref()
        });
    }

    fn add_group(&mut self, group: &Group) {
        upsert(&mut self.outbounds, group_value(group), |o| {
            o.get("tag").and_then(Value::as_str) == Some(group.name.as_str())
        });
    }

    fn finish(&mut self, categories: &[RuleCategory]) -> Value {
        let mut document = std::mem::take(&mut self.document);

        let mut route = match document.remove("route") {
            Some(Value::Object(route)) => route,
            _ => Map::new(),
        };

        let mut rule_sets = take_sequence(&mut route, "rule_set");
        for set in collect_rule_sets(categories) {
            let entry = rule_set_value(&set);
            if !rule_sets.iter().any(|r| r["tag"] == entry["tag"]) {
                rule_sets.push(entry);
            }
        }

        let mut rules = take_sequence(&mut route, "rules");
        rules.extend(
            ordered_rules(categories)
                .into_iter()
                .filter_map(|(predicate, outbound)| route_rule(predicate, outbound)),
        );

        route.insert("rule_set".to_string(), Value::Array(rule_sets));
        route.insert("rules".to_string(), Value::Array(rules));
        if let Some(fallback) = final_outbound(categories) {
            route.insert("final".to_string(), json!(fallback));
        }

        document.insert("outbounds".to_string(), Value::Array(std::mem::take(&mut self.outbounds)));
        document.insert("route".to_string(), Value::Object(route));
        Value::Object(document)
    }

    fn render(&self, document: &Value) -> Result<String, SublinkError> {
        Ok(serde_json::to_string_pretty(document)?)
    }
}
