//! Rule Resolver: expands a rule specification into the ordered category
//! list the assembler builds groups and the emitters build rules from.

use log::warn;

use crate::constants::messages::{outbound_name, FALL_BACK};
use crate::constants::rule_sets::{find_unified_rule, predefined_rule_set, UnifiedRule, MINIMAL};
use crate::models::{Lang, MatchPredicate, RuleCategory, RuleSpec};

fn unified_category(rule: &UnifiedRule, lang: Lang) -> RuleCategory {
    let predicates = rule
        .site_rules
        .iter()
        .map(|s| MatchPredicate::GeoSite(s.to_string()))
        .chain(rule.ip_rules.iter().map(|s| MatchPredicate::GeoIp(s.to_string())))
        .collect();
    let mut category = RuleCategory::new(rule.name, predicates);
    category.outbound = outbound_name(lang, rule.name);
    category
}

fn categories_from_names<'a>(names: impl IntoIterator<Item = &'a str>, lang: Lang) -> Vec<RuleCategory> {
    names
        .into_iter()
        .filter_map(|name| match find_unified_rule(name) {
            Some(rule) => Some(unified_category(rule, lang)),
            None => {
                warn!("Unknown rule category '{}' ignored", name);
                None
            }
        })
        .collect()
}

fn minimal(lang: Lang) -> Vec<RuleCategory> {
    categories_from_names(MINIMAL.iter().copied(), lang)
}

/// Resolve `spec` plus separately supplied custom categories.
///
/// Custom categories are appended in order; one whose name already exists
/// replaces that entry's predicates in place. The result always ends with a
/// single catch-all routed to the fallback group.
pub fn resolve(spec: &RuleSpec, custom: &[RuleCategory], lang: Lang) -> Vec<RuleCategory> {
    let mut categories = match spec {
        RuleSpec::Named(name) => match predefined_rule_set(name) {
            Some(names) => categories_from_names(names, lang),
            None => {
                warn!("Unknown rule set '{}', falling back to minimal", name);
                minimal(lang)
            }
        },
        RuleSpec::Selection(names) => {
            let selected = categories_from_names(names.iter().map(String::as_str), lang);
            if selected.is_empty() {
                warn!("No known rule category selected, falling back to minimal");
                minimal(lang)
            } else {
                selected
            }
        }
        RuleSpec::Custom(list) => list.clone(),
    };

    for extra in custom {
        match categories.iter_mut().find(|c| c.name == extra.name) {
            Some(existing) => existing.predicates = extra.predicates.clone(),
            None => {
                let mut category = extra.clone();
                category.outbound = outbound_name(lang, &category.name);
                categories.push(category);
            }
        }
    }

    let fallback = outbound_name(lang, FALL_BACK);
    let mut catch_all = None;
    categories.retain(|c| {
        if c.is_catch_all() {
            catch_all = Some(c.clone());
            false
        } else {
            true
        }
    });
    let mut catch_all =
        catch_all.unwrap_or_else(|| RuleCategory::new(FALL_BACK, vec![MatchPredicate::Final]));
    catch_all.outbound = fallback;
    categories.push(catch_all);

    categories
}
