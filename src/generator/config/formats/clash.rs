use log::debug;
use serde_json::{json, Map, Value};

use crate::constants::rule_sets::{CLASH_IP_RULE_SET_BASE_URL, CLASH_SITE_RULE_SET_BASE_URL};
use crate::error::SublinkError;
use crate::generator::config::emitter::DialectEmitter;
use crate::generator::config::ruleconvert::{collect_rule_sets, ip_rule_set_tag, ordered_rules, RuleSetRef};
use crate::generator::yaml::ClashProxyOutput;
use crate::models::{Group, MatchPredicate, Proxy, RuleCategory};

use super::{into_mapping, take_sequence, upsert};

/// Emits Clash (mihomo) YAML documents.
pub struct ClashEmitter {
    document: Map<String, Value>,
    proxies: Vec<Value>,
    groups: Vec<Value>,
    /// `proxy-groups` came from the user's overrides; their groups win on name clashes.
    keep_existing_groups: bool,
}

impl ClashEmitter {
    pub fn new(document: Value, applied_override_keys: &[String]) -> Self {
        let mut document = into_mapping(document);
        let proxies = take_sequence(&mut document, "proxies");
        let groups = take_sequence(&mut document, "proxy-groups");
        ClashEmitter {
            document,
            proxies,
            groups,
            keep_existing_groups: applied_override_keys.iter().any(|k| k == "proxy-groups"),
        }
    }
}

fn rule_provider(set: &RuleSetRef<'_>) -> Value {
    let (behavior, base) = if set.is_ip() {
        ("ipcidr", CLASH_IP_RULE_SET_BASE_URL)
    } else {
        ("domain", CLASH_SITE_RULE_SET_BASE_URL)
    };
    json!({
        "type": "http",
        "format": "mrs",
        "behavior": behavior,
        "url": format!("{}{}.mrs", base, set.name()),
        "path": format!("./ruleset/{}.mrs", set.tag()),
        "interval": 86400
    })
}

fn rule_line(predicate: &MatchPredicate, outbound: &str) -> String {
    match predicate {
        MatchPredicate::DomainSuffix(s) => format!("DOMAIN-SUFFIX,{},{}", s, outbound),
        MatchPredicate::DomainKeyword(s) => format!("DOMAIN-KEYWORD,{},{}", s, outbound),
        MatchPredicate::IpCidr(s) => format!("IP-CIDR,{},{},no-resolve", s, outbound),
        MatchPredicate::GeoSite(s) => format!("RULE-SET,{},{}", s, outbound),
        MatchPredicate::GeoIp(s) => format!("RULE-SET,{},{},no-resolve", ip_rule_set_tag(s), outbound),
        MatchPredicate::Final => format!("MATCH,{}", outbound),
    }
}

impl DialectEmitter for ClashEmitter {
    fn proxies(&self) -> Vec<&Value> {
        self.proxies.iter().collect()
    }

    fn proxy_name(&self, proxy: &Value) -> Option<String> {
        proxy.get("name").and_then(Value::as_str).map(str::to_string)
    }

    fn convert_proxy(&self, proxy: &Proxy) -> Result<Value, SublinkError> {
        let output = ClashProxyOutput::try_from(proxy)?;
        Ok(serde_json::to_value(output)?)
    }

    fn add_proxy(&mut self, proxy: Value) {
        let name = self.proxy_name(&proxy);
        upsert(&mut self.proxies, proxy, |p| {
            p.get("name").and_then(Value::as_str) == name.as_deref()
        });
    }

    fn add_group(&mut self, group: &Group) {
        let same_name = |g: &Value| g.get("name").and_then(Value::as_str) == Some(group.name.as_str());
        if self.keep_existing_groups && self.groups.iter().any(same_name) {
            debug!("Keeping user supplied group {}", group.name);
            return;
        }
        let mut value = json!({
            "name": group.name,
            "type": group.type_str(),
            "proxies": group.members,
        });
        if let Some(url) = &group.url {
            value["url"] = json!(url);
        }
        if let Some(interval) = group.interval {
            value["interval"] = json!(interval);
        }
        upsert(&mut self.groups, value, same_name);
    }

    fn finish(&mut self, categories: &[RuleCategory]) -> Value {
        let mut document = std::mem::take(&mut self.document);

        let mut providers = match document.remove("rule-providers") {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };
        for set in collect_rule_sets(categories) {
            providers.insert(set.tag(), rule_provider(&set));
        }

        let rules: Vec<Value> = ordered_rules(categories)
            .into_iter()
            .map(|(predicate, outbound)| Value::String(rule_line(predicate, outbound)))
            .collect();

        document.insert("proxies".to_string(), Value::Array(std::mem::take(&mut self.proxies)));
        document.insert("proxy-groups".to_string(), Value::Array(std::mem::take(&mut self.groups)));
        document.insert("rule-providers".to_string(), Value::Object(providers));
        document.insert("rules".to_string(), Value::Array(rules));
        Value::Object(document)
    }

    fn render(&self, document: &Value) -> Result<String, SublinkError> {
        Ok(serde_yaml::to_string(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::templates::clash_base;
    use crate::models::{GroupKind, GroupOrigin, ProtocolParams};

    fn trojan(tag: &str) -> Proxy {
        Proxy::new(
            tag,
            "t.example.com",
            443,
            ProtocolParams::Trojan {
                password: "pw".into(),
            },
        )
    }

    fn select(name: &str, members: &[&str]) -> Group {
        Group::new(
            name.to_string(),
            GroupKind::Select,
            members.iter().map(|m| m.to_string()).collect(),
            GroupOrigin::NodeSelect,
        )
    }

    #[test]
    fn test_document_sections() {
        let mut emitter = ClashEmitter::new(clash_base(), &[]);
        let converted = emitter.convert_proxy(&trojan("T1")).unwrap();
        emitter.add_proxy(converted);
        emitter.add_group(&select("Proxy", &["T1", "DIRECT"]));

        let categories = vec![
            {
                let mut c = RuleCategory::new("Google", vec![
                    MatchPredicate::GeoSite("google".into()),
                    MatchPredicate::GeoIp("google".into()),
                ]);
                c.outbound = "Proxy".into();
                c
            },
            {
                let mut c = RuleCategory::new("Fall Back", vec![MatchPredicate::Final]);
                c.outbound = "Proxy".into();
                c
            },
        ];
        let document = emitter.finish(&categories);

        assert_eq!(document["proxies"][0]["name"], "T1");
        assert_eq!(document["proxies"][0]["type"], "trojan");
        assert_eq!(document["proxy-groups"][0]["proxies"], json!(["T1", "DIRECT"]));
        assert_eq!(document["rule-providers"]["google"]["behavior"], "domain");
        assert_eq!(document["rule-providers"]["google-ip"]["behavior"], "ipcidr");
        assert_eq!(
            document["rules"],
            json!([
                "RULE-SET,google,Proxy",
                "RULE-SET,google-ip,Proxy,no-resolve",
                "MATCH,Proxy"
            ])
        );
        assert_eq!(document["mode"], "rule");

        let text = emitter.render(&document).unwrap();
        assert!(text.contains("proxy-groups:"));
        assert!(text.contains("MATCH,Proxy"));
    }

    #[test]
    fn test_override_groups_win() {
        let base = json!({
            "proxy-groups": [{"name": "Proxy", "type": "select", "proxies": ["DIRECT"]}]
        });
        let mut kept = ClashEmitter::new(base.clone(), &["proxy-groups".to_string()]);
        kept.add_group(&select("Proxy", &["T1"]));
        kept.add_group(&select("Other", &["T1"]));
        let document = kept.finish(&[]);
        assert_eq!(document["proxy-groups"][0]["proxies"], json!(["DIRECT"]));
        assert_eq!(document["proxy-groups"][1]["name"], "Other");

        let mut replaced = ClashEmitter::new(base, &[]);
        replaced.add_group(&select("Proxy", &["T1"]));
        let document = replaced.finish(&[]);
        assert_eq!(document["proxy-groups"], json!([{"name": "Proxy", "type": "select", "proxies": ["T1"]}]));
    }
}
