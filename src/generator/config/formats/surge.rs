use log::debug;
use serde_json::{Map, Value};

use crate::constants::rule_sets::{SURGE_IP_RULE_SET_BASE_URL, SURGE_SITE_RULE_SET_BASE_URL};
use crate::error::SublinkError;
use crate::generator::config::emitter::DialectEmitter;
use crate::generator::config::ruleconvert::ordered_rules;
use crate::models::{Group, GroupKind, MatchPredicate, ProtocolParams, Proxy, RuleCategory, TlsOptions, Transport};

use super::{into_mapping, take_sequence, upsert};

const MANAGED_CONFIG_INTERVAL: u32 = 43200;

/// Emits Surge profiles.
///
/// Proxies, groups and rules are held as finished lines; every other mapping
/// in the document becomes a `[Section]` of `key = value` lines.
pub struct SurgeEmitter {
    document: Map<String, Value>,
    proxies: Vec<Value>,
    groups: Vec<Value>,
    subscription_url: Option<String>,
}

impl SurgeEmitter {
    pub fn new(document: Value, subscription_url: Option<String>) -> Self {
        let mut document = into_mapping(document);
        let proxies = take_sequence(&mut document, "proxies");
        let groups = take_sequence(&mut document, "proxy-groups");
        SurgeEmitter {
            document,
            proxies,
            groups,
            subscription_url,
        }
    }
}

fn line_name(line: &Value) -> Option<&str> {
    line.as_str()
        .and_then(|l| l.split_once(" = "))
        .map(|(name, _)| name.trim())
}

fn unsupported(proxy: &Proxy) -> SublinkError {
    SublinkError::Emit(format!(
        "Surge does not support {} proxy '{}'",
        proxy.proxy_type(),
        proxy.tag
    ))
}

fn push_tls(parts: &mut Vec<String>, tls: &TlsOptions) {
    if let Some(sni) = &tls.server_name {
        parts.push(format!("sni={}", sni));
    }
    if tls.insecure {
        parts.push("skip-cert-verify=true".to_string());
    }
}

fn push_ws(parts: &mut Vec<String>, proxy: &Proxy) -> Result<(), SublinkError> {
    match &proxy.transport {
        None => Ok(()),
        Some(Transport::Ws { path, host }) => {
            parts.push("ws=true".to_string());
            if let Some(path) = path {
                parts.push(format!("ws-path={}", path));
            }
            if let Some(host) = host {
                parts.push(format!("ws-headers=Host:{}", host));
            }
            Ok(())
        }
        Some(other) => Err(SublinkError::Emit(format!(
            "Surge does not support {} transport on '{}'",
            other.network(),
            proxy.tag
        ))),
    }
}

/// `key1=value1;key2=value2` plugin options as a lookup.
fn plugin_opt<'a>(opts: &'a str, key: &str) -> Option<&'a str> {
    opts.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

fn proxy_line(proxy: &Proxy) -> Result<String, SublinkError> {
    if proxy.tag.contains(&[',', '=', '\n', '\r'][..]) {
        return Err(SublinkError::Emit(format!(
            "Surge proxy name '{}' cannot contain ',', '=' or line breaks",
            proxy.tag
        )));
    }
    let mut parts = vec![proxy.server.clone(), proxy.port.to_string()];
    let kind = match &proxy.params {
        ProtocolParams::Shadowsocks {
            method,
            password,
            plugin,
            plugin_opts,
        } => {
            parts.push(format!("encrypt-method={}", method));
            parts.push(format!("password={}", password));
            match (plugin.as_deref(), plugin_opts.as_deref()) {
                (None, _) => {}
                (Some("obfs-local" | "simple-obfs" | "obfs"), opts) => {
                    let opts = opts.unwrap_or_default();
                    if let Some(mode) = plugin_opt(opts, "obfs") {
                        parts.push(format!("obfs={}", mode));
                    }
                    if let Some(host) = plugin_opt(opts, "obfs-host") {
                        parts.push(format!("obfs-host={}", host));
                    }
                }
                (Some(other), _) => {
                    return Err(SublinkError::Emit(format!(
                        "Surge does not support plugin {} on '{}'",
                        other, proxy.tag
                    )))
                }
            }
            "ss"
        }
        ProtocolParams::VMess { uuid, alter_id, .. } => {
            parts.push(format!("username={}", uuid));
            if *alter_id == 0 {
                parts.push("vmess-aead=true".to_string());
            }
            if let Some(tls) = &proxy.tls {
                parts.push("tls=true".to_string());
                push_tls(&mut parts, tls);
            }
            push_ws(&mut parts, proxy)?;
            "vmess"
        }
        ProtocolParams::Trojan { password } => {
            parts.push(format!("password={}", password));
            if let Some(tls) = &proxy.tls {
                push_tls(&mut parts, tls);
            }
            push_ws(&mut parts, proxy)?;
            "trojan"
        }
        ProtocolParams::Hysteria2 {
            password,
            down_mbps,
            obfs,
            ..
        } => {
            if obfs.is_some() {
                return Err(SublinkError::Emit(format!(
                    "Surge does not support hysteria2 obfs on '{}'",
                    proxy.tag
                )));
            }
            parts.push(format!("password={}", password));
            if let Some(down) = down_mbps {
                parts.push(format!("download-bandwidth={}", down));
            }
            if let Some(tls) = &proxy.tls {
                push_tls(&mut parts, tls);
            }
            "hysteria2"
        }
        ProtocolParams::Tuic { uuid, password, .. } => {
            parts.push(format!("uuid={}", uuid));
            parts.push(format!("password={}", password));
            if let Some(tls) = &proxy.tls {
                push_tls(&mut parts, tls);
                if !tls.alpn.is_empty() {
                    parts.push(format!("alpn={}", tls.alpn.join(",")));
                }
            }
            "tuic-v5"
        }
        ProtocolParams::Socks5 { username, password } | ProtocolParams::Http { username, password } => {
            if let (Some(user), Some(pass)) = (username, password) {
                parts.push(user.clone());
                parts.push(pass.clone());
            }
            if let Some(tls) = &proxy.tls {
                push_tls(&mut parts, tls);
            }
            match (&proxy.params, proxy.tls.is_some()) {
                (ProtocolParams::Socks5 { .. }, false) => "socks5",
                (ProtocolParams::Socks5 { .. }, true) => "socks5-tls",
                (_, false) => "http",
                (_, true) => "https",
            }
        }
        ProtocolParams::Vless { .. }
        | ProtocolParams::Hysteria { .. }
        | ProtocolParams::WireGuard { .. } => return Err(unsupported(proxy)),
    };

    if proxy.udp == Some(true) {
        parts.push("udp-relay=true".to_string());
    }
    if proxy.tcp_fast_open == Some(true) {
        parts.push("tfo=true".to_string());
    }
    Ok(format!("{} = {}, {}", proxy.tag, kind, parts.join(", ")))
}

fn group_line(group: &Group) -> String {
    let mut parts = vec![group.type_str().to_string()];
    parts.extend(group.members.iter().cloned());
    if group.kind != GroupKind::Select {
        if let Some(url) = &group.url {
            parts.push(format!("url={}", url));
        }
        if let Some(interval) = group.interval {
            parts.push(format!("interval={}", interval));
        }
    }
    format!("{} = {}", group.name, parts.join(", "))
}

fn rule_line(predicate: &MatchPredicate, outbound: &str) -> String {
    match predicate {
        MatchPredicate::DomainSuffix(s) => format!("DOMAIN-SUFFIX,{},{}", s, outbound),
        MatchPredicate::DomainKeyword(s) => format!("DOMAIN-KEYWORD,{},{}", s, outbound),
        MatchPredicate::IpCidr(s) => format!("IP-CIDR,{},{},no-resolve", s, outbound),
        MatchPredicate::GeoSite(s) => {
            format!("RULE-SET,{}{}.conf,{}", SURGE_SITE_RULE_SET_BASE_URL, s, outbound)
        }
        MatchPredicate::GeoIp(s) => format!(
            "RULE-SET,{}{}.txt,{},no-resolve",
            SURGE_IP_RULE_SET_BASE_URL, s, outbound
        ),
        MatchPredicate::Final => format!("FINAL,{}", outbound),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Section title for a document key, `general` becomes `General`.
fn section_title(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn push_section(out: &mut String, title: &str, lines: impl IntoIterator<Item = String>) {
    out.push_str(&format!("[{}]\n", title));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
}

impl DialectEmitter for SurgeEmitter {
    fn proxies(&self) -> Vec<&Value> {
        self.proxies.iter().collect()
    }

    fn proxy_name(&self, proxy: &Value) -> Option<String> {
        line_name(proxy).map(str::to_string)
    }

    fn convert_proxy(&self, proxy: &Proxy) -> Result<Value, SublinkError> {
        proxy_line(proxy).map(Value::String)
    }

    fn add_proxy(&mut self, proxy: Value) {
        let name = line_name(&proxy).map(str::to_string);
        upsert(&mut self.proxies, proxy, |p| line_name(p) == name.as_deref());
    }

    fn add_group(&mut self, group: &Group) {
        upsert(&mut self.groups, Value::String(group_line(group)), |g| {
            line_name(g) == Some(group.name.as_str())
        });
    }

    fn finish(&mut self, categories: &[RuleCategory]) -> Value {
        let mut document = std::mem::take(&mut self.document);
        let rules: Vec<Value> = ordered_rules(categories)
            .into_iter()
            .map(|(predicate, outbound)| Value::String(rule_line(predicate, outbound)))
            .collect();
        document.insert("proxies".to_string(), Value::Array(std::mem::take(&mut self.proxies)));
        document.insert("proxy-groups".to_string(), Value::Array(std::mem::take(&mut self.groups)));
        document.insert("rules".to_string(), Value::Array(rules));
        Value::Object(document)
    }

    fn render(&self, document: &Value) -> Result<String, SublinkError> {
        let map = document
            .as_object()
            .ok_or_else(|| SublinkError::Serialize("Surge document is not a mapping".to_string()))?;

        let mut out = String::new();
        if let Some(url) = &self.subscription_url {
            out.push_str(&format!(
                "#!MANAGED-CONFIG {} interval={} strict=false\n\n",
                url, MANAGED_CONFIG_INTERVAL
            ));
        }

        for (key, value) in map {
            match (key.as_str(), value) {
                ("proxies" | "proxy-groups" | "rules", _) => {}
                (_, Value::Object(entries)) => push_section(
                    &mut out,
                    &section_title(key),
                    entries
                        .iter()
                        .map(|(k, v)| format!("{} = {}", k, scalar_text(v))),
                ),
                (_, Value::Array(lines)) => {
                    push_section(&mut out, &section_title(key), lines.iter().map(scalar_text))
                }
                _ => debug!("Skipping non-section key {} in Surge document", key),
            }
        }

        let lines = |key: &str| -> Vec<String> {
            map.get(key)
                .and_then(Value::as_array)
                .map(|items| items.iter().map(scalar_text).collect())
                .unwrap_or_default()
        };
        push_section(&mut out, "Proxy", lines("proxies"));
        push_section(&mut out, "Proxy Group", lines("proxy-groups"));
        push_section(&mut out, "Rule", lines("rules"));
        Ok(out)
    }
}
