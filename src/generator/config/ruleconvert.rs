//! Dialect-independent rule ordering shared by the emitters.

use crate::models::{MatchPredicate, RuleCategory};

/// Geo rule set referenced by a category predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSetRef<'a> {
    Site(&'a str),
    Ip(&'a str),
}

impl<'a> RuleSetRef<'a> {
    /// Provider tag; ip sets get an `-ip` suffix so `cn` site and ip sets can coexist.
    pub fn tag(&self) -> String {
        match self {
            RuleSetRef::Site(name) => name.to_string(),
            RuleSetRef::Ip(name) => ip_rule_set_tag(name),
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            RuleSetRef::Site(name) | RuleSetRef::Ip(name) => name,
        }
    }

    pub fn is_ip(&self) -> bool {
        matches!(self, RuleSetRef::Ip(_))
    }
}

pub fn ip_rule_set_tag(name: &str) -> String {
    format!("{}-ip", name)
}

/// Every distinct geo rule set, in order of first appearance.
pub fn collect_rule_sets(categories: &[RuleCategory]) -> Vec<RuleSetRef<'_>> {
    let mut sets: Vec<RuleSetRef<'_>> = Vec::new();
    for category in categories {
        for predicate in &category.predicates {
            let set = match predicate {
                MatchPredicate::GeoSite(name) => RuleSetRef::Site(name),
                MatchPredicate::GeoIp(name) => RuleSetRef::Ip(name),
                _ => continue,
            };
            if !sets.contains(&set) {
                sets.push(set);
            }
        }
    }
    sets
}

fn is_ip_predicate(predicate: &MatchPredicate) -> bool {
    matches!(predicate, MatchPredicate::IpCidr(_) | MatchPredicate::GeoIp(_))
}

/// Flatten categories into `(predicate, outbound)` pairs.
///
/// Domain and geosite predicates of all categories come first, then IP
/// predicates, so a domain rule is never shadowed by an IP match that forces a
/// DNS lookup. The catch-all is always the single last entry.
pub fn ordered_rules(categories: &[RuleCategory]) -> Vec<(&MatchPredicate, &str)> {
    let pairs = || {
        categories.iter().flat_map(|c| {
            c.predicates
                .iter()
                .map(move |p| (p, c.outbound.as_str()))
        })
    };

    let mut rules: Vec<_> = pairs()
        .filter(|(p, _)| !is_ip_predicate(p) && !matches!(p, MatchPredicate::Final))
        .collect();
    rules.extend(pairs().filter(|(p, _)| is_ip_predicate(p)));
    if let Some(last) = pairs()
        .filter(|(p, _)| matches!(p, MatchPredicate::Final))
        .last()
    {
        rules.push(last);
    }
    rules
}

/// Outbound of the catch-all category, if there is one.
pub fn final_outbound(categories: &[RuleCategory]) -> Option<&str> {
    categories
        .iter()
        .rev()
        .find(|c| c.is_catch_all())
        .map(|c| c.outbound.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lang, RuleSpec};
    use crate::parser::ruleset::resolve;

    #[test]
    fn test_rule_sets_are_distinct() {
        let categories = resolve(&RuleSpec::Named("balanced".into()), &[], Lang::EnUs);
        let sets = collect_rule_sets(&categories);
        assert_eq!(sets[0], RuleSetRef::Site("geolocation-cn"));
        assert!(sets.contains(&RuleSetRef::Ip("cn")));
        assert!(sets.contains(&RuleSetRef::Site("cn")));
        assert_eq!(RuleSetRef::Ip("cn").tag(), "cn-ip");
        let google = sets.iter().filter(|s| s.name() == "google").count();
        assert_eq!(google, 2);
    }

    #[test]
    fn test_ip_rules_follow_domain_rules() {
        let mut work = RuleCategory::new(
            "Work",
            vec![
                MatchPredicate::IpCidr("10.0.0.0/8".into()),
                MatchPredicate::DomainSuffix("corp.example".into()),
            ],
        );
        work.custom = true;
        let categories = resolve(&RuleSpec::Named("minimal".into()), &[work], Lang::EnUs);
        let rules = ordered_rules(&categories);

        let first_ip = rules.iter().position(|(p, _)| is_ip_predicate(p)).unwrap();
        assert!(rules[first_ip..]
            .iter()
            .all(|(p, _)| is_ip_predicate(p) || matches!(p, MatchPredicate::Final)));
        assert!(rules[..first_ip]
            .iter()
            .any(|(p, o)| matches!(p, MatchPredicate::DomainSuffix(_)) && *o == "Work"));

        let (last, outbound) = rules.last().unwrap();
        assert_eq!(**last, MatchPredicate::Final);
        assert_eq!(*outbound, "🐟 Fall Back");
        assert_eq!(final_outbound(&categories), Some("🐟 Fall Back"));
    }
}
