//! Group Assembler
//!
//! Builds the routing groups in a fixed order, each stage referring only to
//! proxies and groups built before it:
//! auto-select, node-select, countries, rule categories, custom rules, fallback.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::constants::countries::find_country;
use crate::constants::messages::{outbound_name, AUTO_SELECT, FALL_BACK, NODE_SELECT};
use crate::constants::rule_sets::prefers_direct;
use crate::constants::{DEFAULT_TEST_INTERVAL, DEFAULT_TEST_URL};
use crate::error::{Diagnostic, SublinkError};
use crate::generator::config::emitter::DialectEmitter;
use crate::models::{
    is_builtin_outbound, Group, GroupKind, GroupOrigin, Lang, Proxy, RuleCategory, DIRECT,
    REJECT,
};

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub group_by_country: bool,
    pub lang: Lang,
    /// Probe URL of the auto-select and fallback groups
    pub test_url: String,
    pub test_interval: u32,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        AssembleOptions {
            group_by_country: false,
            lang: Lang::default(),
            test_url: DEFAULT_TEST_URL.to_string(),
            test_interval: DEFAULT_TEST_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// Groups in construction order.
    pub groups: Vec<Group>,
    /// Names of the proxies the groups were built over.
    pub proxy_names: Vec<String>,
    /// Records the dialect could not express.
    pub diagnostics: Vec<Diagnostic>,
}

pub struct GroupAssembler<'a> {
    emitter: &'a mut dyn DialectEmitter,
    options: AssembleOptions,
    known: HashSet<String>,
    proxy_tags: HashSet<String>,
    groups: Vec<Group>,
}

impl<'a> GroupAssembler<'a> {
    pub fn new(emitter: &'a mut dyn DialectEmitter, options: AssembleOptions) -> Self {
        GroupAssembler {
            emitter,
            options,
            known: HashSet::new(),
            proxy_tags: HashSet::new(),
            groups: Vec::new(),
        }
    }

    fn name(&self, fixed: &str) -> String {
        outbound_name(self.options.lang, fixed)
    }

    /// Check membership, then hand the group to the emitter via `hook`.
    fn push(
        &mut self,
        group: Group,
        hook: fn(&mut dyn DialectEmitter, &Group),
    ) -> Result<(), SublinkError> {
        if self.proxy_tags.contains(&group.name) {
            return Err(SublinkError::Assembly(format!(
                "group '{}' has the same name as a proxy",
                group.name
            )));
        }
        if self.known.contains(&group.name) {
            debug!("Group {} already built, skipping", group.name);
            return Ok(());
        }
        if let Some(missing) = group
            .members
            .iter()
            .find(|m| !is_builtin_outbound(m) && !self.known.contains(*m))
        {
            return Err(SublinkError::Assembly(format!(
                "group '{}' references '{}' before it exists",
                group.name, missing
            )));
        }
        hook(&mut *self.emitter, &group);
        self.known.insert(group.name.clone());
        self.groups.push(group);
        Ok(())
    }

    /// Convert and append every proxy, then build all groups.
    ///
    /// Fails with `Exhausted` when the dialect accepted no proxy at all, and
    /// with `Assembly` if a group would reference something not yet built.
    pub fn assemble(
        mut self,
        proxies: &[Proxy],
        categories: &[RuleCategory],
    ) -> Result<Assembly, SublinkError> {
        let mut diagnostics = Vec::new();
        let mut emitted: Vec<&Proxy> = Vec::with_capacity(proxies.len());
        for proxy in proxies {
            match self.emitter.convert_proxy(proxy) {
                Ok(converted) => {
                    self.emitter.add_proxy(converted);
                    emitted.push(proxy);
                }
                Err(e) => {
                    warn!("Proxy {} not emitted: {}", proxy.tag, e);
                    diagnostics.push(Diagnostic::from_error(&e, &proxy.tag, self.options.lang));
                }
            }
        }

        let proxy_names = self.emitter.proxy_names();
        if proxy_names.is_empty() {
            return Err(SublinkError::exhausted(self.options.lang, diagnostics));
        }
        self.known.extend(proxy_names.iter().cloned());
        self.proxy_tags.extend(proxy_names.iter().cloned());

        let auto = self.name(AUTO_SELECT);
        let node = self.name(NODE_SELECT);
        let (test_url, test_interval) = (self.options.test_url.clone(), self.options.test_interval);

        self.push(
            Group::new(auto.clone(), GroupKind::URLTest, proxy_names.clone(), GroupOrigin::Auto)
                .with_probe(&test_url, test_interval),
            |e, g| e.add_auto_select_group(g),
        )?;

        let mut node_members = vec![auto.clone()];
        node_members.extend(proxy_names.iter().cloned());
        self.push(
            Group::new(node.clone(), GroupKind::Select, node_members, GroupOrigin::NodeSelect),
            |e, g| e.add_node_select_group(g),
        )?;

        let mut country_groups = Vec::new();
        if self.options.group_by_country {
            for group in country_groups_for(&emitted, self.options.lang) {
                country_groups.push(group.name.clone());
                self.push(group, |e, g| e.add_country_group(g))?;
            }
        }

        let selector_members = |direct_first: bool| {
            let mut members = Vec::with_capacity(country_groups.len() + 3);
            if direct_first {
                members.push(DIRECT.to_string());
            }
            members.push(node.clone());
            members.push(auto.clone());
            members.extend(country_groups.iter().cloned());
            if !direct_first {
                members.push(DIRECT.to_string());
            }
            members
        };

        let (custom, predefined): (Vec<&RuleCategory>, Vec<&RuleCategory>) = categories
            .iter()
            .filter(|c| !c.is_catch_all())
            .partition(|c| c.custom);

        for category in predefined {
            let group = Group::new(
                category.outbound.clone(),
                GroupKind::Select,
                selector_members(prefers_direct(&category.name)),
                GroupOrigin::RuleCategory,
            );
            self.push(group, |e, g| e.add_outbound_group(g))?;
        }

        for category in custom {
            let group = Group::new(
                category.outbound.clone(),
                GroupKind::Select,
                selector_members(false),
                GroupOrigin::Custom,
            );
            self.push(group, |e, g| e.add_custom_rule_group(g))?;
        }

        let fallback = categories
            .iter()
            .rev()
            .find(|c| c.is_catch_all())
            .map(|c| c.outbound.clone())
            .unwrap_or_else(|| self.name(FALL_BACK));
        self.push(
            Group::new(
                fallback,
                GroupKind::Fallback,
                vec![node.clone(), auto.clone(), DIRECT.to_string()],
                GroupOrigin::Fallback,
            )
            .with_probe(&test_url, test_interval),
            |e, g| e.add_fallback_group(g),
        )?;

        info!(
            "Assembled {} groups over {} proxies",
            self.groups.len(),
            proxy_names.len()
        );
        Ok(Assembly {
            groups: self.groups,
            proxy_names,
            diagnostics,
        })
    }
}

/// Every group name `assemble` may build for these proxies and categories,
/// plus the builtin outbounds. Proxy tags must stay clear of them.
pub fn reserved_group_names(
    proxies: &[Proxy],
    categories: &[RuleCategory],
    options: &AssembleOptions,
) -> HashSet<String> {
    let lang = options.lang;
    let mut names: HashSet<String> = [DIRECT, REJECT]
        .iter()
        .map(|s| s.to_string())
        .chain([AUTO_SELECT, NODE_SELECT, FALL_BACK].iter().map(|s| outbound_name(lang, s)))
        .collect();
    names.extend(categories.iter().map(|c| c.outbound.clone()));
    if options.group_by_country {
        let proxies: Vec<&Proxy> = proxies.iter().collect();
        names.extend(country_groups_for(&proxies, lang).into_iter().map(|g| g.name));
    }
    names
}

/// One selector per inferred country, in order of first appearance.
/// Proxies without a country are left out.
fn country_groups_for(proxies: &[&Proxy], lang: Lang) -> Vec<Group> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for proxy in proxies {
        let Some(code) = proxy.country.as_deref() else {
            continue;
        };
        match groups.iter_mut().find(|(c, _)| c == code) {
            Some((_, members)) => members.push(proxy.tag.clone()),
            None => groups.push((code.to_string(), vec![proxy.tag.clone()])),
        }
    }
    groups
        .into_iter()
        .map(|(code, members)| {
            let name = find_country(&code)
                .map(|c| c.group_name(lang))
                .unwrap_or(code);
            Group::new(name, GroupKind::Select, members, GroupOrigin::Country)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchPredicate, ProtocolParams};
    use crate::parser::node_manip::preprocess_nodes;
    use crate::parser::ruleset::resolve;
    use crate::models::RuleSpec;
    use serde_json::{json, Value};

    /// Records hook calls; refuses proxies whose tag starts with "bad".
    #[derive(Default)]
    struct RecordingEmitter {
        proxies: Vec<Value>,
        calls: Vec<(String, String)>,
    }

    impl DialectEmitter for RecordingEmitter {
        fn proxies(&self) -> Vec<&Value> {
            self.proxies.iter().collect()
        }

        fn proxy_name(&self, proxy: &Value) -> Option<String> {
            proxy["name"].as_str().map(str::to_string)
        }

        fn convert_proxy(&self, proxy: &Proxy) -> Result<Value, SublinkError> {
            if proxy.tag.starts_with("bad") {
                return Err(SublinkError::Emit("unsupported".into()));
            }
            Ok(json!({ "name": proxy.tag }))
        }

        fn add_proxy(&mut self, proxy: Value) {
            self.proxies.push(proxy);
        }

        fn add_group(&mut self, group: &Group) {
            self.calls.push(("group".into(), group.name.clone()));
        }

        fn add_fallback_group(&mut self, group: &Group) {
            self.calls.push(("fallback".into(), group.name.clone()));
        }

        fn finish(&mut self, _categories: &[RuleCategory]) -> Value {
            Value::Null
        }

        fn render(&self, _document: &Value) -> Result<String, SublinkError> {
            Ok(String::new())
        }
    }

    fn proxy(tag: &str) -> Proxy {
        Proxy::new(
            tag,
            "example.com",
            443,
            ProtocolParams::Trojan {
                password: tag.to_string(),
            },
        )
    }

    fn options(group_by_country: bool) -> AssembleOptions {
        AssembleOptions {
            group_by_country,
            lang: Lang::EnUs,
            ..Default::default()
        }
    }

    #[test]
    fn test_construction_order_and_no_forward_refs() {
        let proxies = preprocess_nodes(vec![proxy("🇯🇵 Tokyo"), proxy("US West"), proxy("Office")], |_| HashSet::new());
        let categories = resolve(&RuleSpec::Named("minimal".into()), &[], Lang::EnUs);
        let mut emitter = RecordingEmitter::default();
        let assembly = GroupAssembler::new(&mut emitter, options(true))
            .assemble(&proxies, &categories)
            .unwrap();

        let origins: Vec<_> = assembly.groups.iter().map(|g| g.built_from).collect();
        let mut sorted = origins.clone();
        sorted.sort();
        assert_eq!(origins, sorted);

        let mut seen: HashSet<String> = assembly.proxy_names.iter().cloned().collect();
        for group in &assembly.groups {
            for member in &group.members {
                assert!(is_builtin_outbound(member) || seen.contains(member), "{}", member);
            }
            seen.insert(group.name.clone());
        }

        let fallback = assembly.groups.last().unwrap();
        assert_eq!(fallback.kind, GroupKind::Fallback);
        assert_eq!(fallback.members, vec!["🚀 Node Select", "⚡ Auto Select", "DIRECT"]);
        assert_eq!(emitter.calls.last().unwrap().0, "fallback");
    }

    #[test]
    fn test_country_groups_exclude_unclassified() {
        let proxies = preprocess_nodes(vec![proxy("🇯🇵 Tokyo"), proxy("US West"), proxy("Office")], |_| HashSet::new());
        let categories = resolve(&RuleSpec::Named("minimal".into()), &[], Lang::EnUs);
        let mut emitter = RecordingEmitter::default();
        let assembly = GroupAssembler::new(&mut emitter, options(true))
            .assemble(&proxies, &categories)
            .unwrap();

        let countries: Vec<_> = assembly
            .groups
            .iter()
            .filter(|g| g.built_from == GroupOrigin::Country)
            .collect();
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0].name, "🇯🇵 Japan");
        assert_eq!(countries[0].members, vec!["🇯🇵 Tokyo"]);
        assert_eq!(countries[1].name, "🇺🇸 United States");
        assert!(countries.iter().all(|g| !g.members.contains(&"Office".to_string())));

        let node = &assembly.groups[1];
        assert_eq!(node.built_from, GroupOrigin::NodeSelect);
        assert!(node.members.contains(&"Office".to_string()));

        let cn = assembly
            .groups
            .iter()
            .find(|g| g.name == "🔒 Location:CN")
            .unwrap();
        assert_eq!(cn.members[0], "DIRECT");
        assert!(cn.members.contains(&"🇯🇵 Japan".to_string()));
    }

    #[test]
    fn test_custom_groups_and_emit_failures() {
        let proxies = vec![proxy("A"), proxy("bad one")];
        let mut work = RuleCategory::new("Work", vec![MatchPredicate::DomainSuffix("corp.example".into())]);
        work.custom = true;
        let categories = resolve(&RuleSpec::Named("minimal".into()), &[work], Lang::EnUs);
        let mut emitter = RecordingEmitter::default();
        let assembly = GroupAssembler::new(&mut emitter, options(false))
            .assemble(&proxies, &categories)
            .unwrap();

        assert_eq!(assembly.proxy_names, vec!["A"]);
        assert_eq!(assembly.diagnostics.len(), 1);
        let custom: Vec<_> = assembly
            .groups
            .iter()
            .filter(|g| g.built_from == GroupOrigin::Custom)
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(custom, vec!["Work"]);
        assert!(assembly.groups.iter().all(|g| g.built_from != GroupOrigin::Country));
    }

    #[test]
    fn test_group_named_like_proxy_is_an_error() {
        let categories = resolve(&RuleSpec::Named("minimal".into()), &[], Lang::EnUs);
        let mut emitter = RecordingEmitter::default();
        let result = GroupAssembler::new(&mut emitter, options(false))
            .assemble(&[proxy("⚡ Auto Select")], &categories);
        assert!(matches!(result, Err(SublinkError::Assembly(_))));
    }

    #[test]
    fn test_reserved_names_keep_country_groups() {
        let opts = AssembleOptions {
            group_by_country: true,
            lang: Lang::ZhCn,
            ..Default::default()
        };
        let categories = resolve(&RuleSpec::Named("minimal".into()), &[], Lang::ZhCn);
        let mut raw = vec![proxy("🇭🇰 香港"), proxy("🇭🇰 香港"), proxy("US 01")];
        raw[1].server = "other.example.com".to_string();
        let proxies = preprocess_nodes(raw, |p| reserved_group_names(p, &categories, &opts));
        let tags: Vec<_> = proxies.iter().map(|p| p.tag.as_str()).collect();
        assert_eq!(tags, vec!["🇭🇰 香港 2", "🇭🇰 香港 3", "US 01"]);

        let mut emitter = RecordingEmitter::default();
        let assembly = GroupAssembler::new(&mut emitter, opts)
            .assemble(&proxies, &categories)
            .unwrap();
        let countries: Vec<_> = assembly
            .groups
            .iter()
            .filter(|g| g.built_from == GroupOrigin::Country)
            .map(|g| (g.name.as_str(), g.members.len()))
            .collect();
        assert_eq!(countries, vec![("🇭🇰 香港", 2), ("🇺🇸 美国", 1)]);
    }

    #[test]
    fn test_nothing_emitted_is_exhausted() {
        let mut emitter = RecordingEmitter::default();
        let result = GroupAssembler::new(&mut emitter, options(false)).assemble(&[proxy("bad")], &[]);
        match result {
            Err(SublinkError::Exhausted { summary, diagnostics }) => {
                assert_eq!(summary, "No usable proxy found");
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].subject, "bad");
            }
            other => panic!("unexpected result {:?}", other.map(|a| a.groups)),
        }
    }
}
