use serde::{Deserialize, Serialize};

/// A single match condition of a rule category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPredicate {
    DomainSuffix(String),
    DomainKeyword(String),
    IpCidr(String),
    /// Reference to a geosite rule set, e.g. `google`
    GeoSite(String),
    /// Reference to a geoip rule set, e.g. `cn`
    GeoIp(String),
    /// Catch-all, matches everything not matched earlier.
    Final,
}

/// A named routing category bound to the outbound group it routes to.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCategory {
    pub name: String,
    pub predicates: Vec<MatchPredicate>,
    /// Group name traffic matching this category is sent to.
    pub outbound: String,
    /// Declared by the user rather than taken from the predefined table.
    pub custom: bool,
}

impl RuleCategory {
    pub fn new(name: &str, predicates: Vec<MatchPredicate>) -> Self {
        RuleCategory {
            name: name.to_string(),
            predicates,
            outbound: name.to_string(),
            custom: false,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.predicates
            .iter()
            .any(|p| matches!(p, MatchPredicate::Final))
    }
}

/// What rule categories a build should route by.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSpec {
    /// One of the predefined sets: `minimal`, `balanced`, `comprehensive`.
    Named(String),
    /// A selection of category names from the predefined table.
    Selection(Vec<String>),
    /// A fully custom ordered category list.
    Custom(Vec<RuleCategory>),
}

impl Default for RuleSpec {
    fn default() -> Self {
        RuleSpec::Named("minimal".to_string())
    }
}

impl RuleSpec {
    /// Interpret a request parameter: a predefined set name, or a JSON array of
    /// category names.
    pub fn from_param(param: &str) -> RuleSpec {
        let trimmed = param.trim();
        if trimmed.starts_with('[') {
            if let Ok(names) = serde_json::from_str::<Vec<String>>(trimmed) {
                return RuleSpec::Selection(names);
            }
        }
        RuleSpec::Named(trimmed.to_string())
    }
}

/// A user-declared routing rule as it arrives in a request.
///
/// List fields are comma separated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CustomRule {
    pub name: String,
    pub site: String,
    pub ip: String,
    pub domain_suffix: String,
    pub domain_keyword: String,
    pub ip_cidr: String,
}

fn split_list(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
}

impl From<CustomRule> for RuleCategory {
    fn from(rule: CustomRule) -> Self {
        let mut predicates = Vec::new();
        predicates.extend(split_list(&rule.domain_suffix).map(MatchPredicate::DomainSuffix));
        predicates.extend(split_list(&rule.domain_keyword).map(MatchPredicate::DomainKeyword));
        predicates.extend(split_list(&rule.site).map(MatchPredicate::GeoSite));
        predicates.extend(split_list(&rule.ip).map(MatchPredicate::GeoIp));
        predicates.extend(split_list(&rule.ip_cidr).map(MatchPredicate::IpCidr));
        let mut category = RuleCategory::new(rule.name.trim(), predicates);
        category.custom = true;
        category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_rule_into_category() {
        let rule: CustomRule = serde_json::from_str(
            r#"{"name":"Work","site":"github, gitlab","domain_suffix":"corp.example","ip_cidr":"10.0.0.0/8"}"#,
        )
        .unwrap();
        let category: RuleCategory = rule.into();
        assert_eq!(category.name, "Work");
        assert!(category.custom);
        assert_eq!(
            category.predicates,
            vec![
                MatchPredicate::DomainSuffix("corp.example".to_string()),
                MatchPredicate::GeoSite("github".to_string()),
                MatchPredicate::GeoSite("gitlab".to_string()),
                MatchPredicate::IpCidr("10.0.0.0/8".to_string()),
            ]
        );
        assert!(!category.is_catch_all());
    }

    #[test]
    fn test_rule_spec_from_param() {
        assert_eq!(
            RuleSpec::from_param("balanced"),
            RuleSpec::Named("balanced".to_string())
        );
        assert_eq!(
            RuleSpec::from_param(r#"["Google","Telegram"]"#),
            RuleSpec::Selection(vec!["Google".to_string(), "Telegram".to_string()])
        );
    }
}
