//! Predefined rule categories and the named sets built from them.

pub struct UnifiedRule {
    pub name: &'static str,
    pub site_rules: &'static [&'static str],
    pub ip_rules: &'static [&'static str],
    /// Categories whose traffic should go direct unless the user picks otherwise.
    pub prefer_direct: bool,
}

pub static UNIFIED_RULES: &[UnifiedRule] = &[
    UnifiedRule { name: "Ad Block", site_rules: &["category-ads-all"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "AI Services", site_rules: &["category-ai-!cn"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Bilibili", site_rules: &["bilibili"], ip_rules: &[], prefer_direct: true },
    UnifiedRule { name: "Youtube", site_rules: &["youtube"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Google", site_rules: &["google"], ip_rules: &["google"], prefer_direct: false },
    UnifiedRule { name: "Private", site_rules: &[], ip_rules: &["private"], prefer_direct: true },
    UnifiedRule { name: "Location:CN", site_rules: &["geolocation-cn", "cn"], ip_rules: &["cn"], prefer_direct: true },
    UnifiedRule { name: "Telegram", site_rules: &[], ip_rules: &["telegram"], prefer_direct: false },
    UnifiedRule { name: "Github", site_rules: &["github", "gitlab"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Microsoft", site_rules: &["microsoft"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Apple", site_rules: &["apple"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Social Media", site_rules: &["facebook", "instagram", "twitter", "tiktok", "linkedin"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Streaming", site_rules: &["netflix", "hulu", "disney", "hbo", "amazon", "bahamut"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Gaming", site_rules: &["steam", "epicgames", "ea", "ubisoft", "blizzard"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Education", site_rules: &["coursera", "edx", "udemy", "khanacademy", "category-scholar-!cn"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Financial", site_rules: &["paypal", "visa", "mastercard", "stripe", "wise"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Cloud Services", site_rules: &["aws", "azure", "digitalocean", "heroku", "dropbox"], ip_rules: &[], prefer_direct: false },
    UnifiedRule { name: "Non-China", site_rules: &["geolocation-!cn"], ip_rules: &[], prefer_direct: false },
];

pub const MINIMAL: &[&str] = &["Location:CN", "Private", "Non-China"];

pub const BALANCED: &[&str] = &[
    "Location:CN",
    "Private",
    "Non-China",
    "Github",
    "Google",
    "Youtube",
    "AI Services",
    "Telegram",
];

/// Category names of a predefined set, `None` when the name is unknown.
pub fn predefined_rule_set(name: &str) -> Option<Vec<&'static str>> {
    match name.to_ascii_lowercase().as_str() {
        "minimal" => Some(MINIMAL.to_vec()),
        "balanced" => Some(BALANCED.to_vec()),
        "comprehensive" => Some(UNIFIED_RULES.iter().map(|r| r.name).collect()),
        _ => None,
    }
}

pub fn find_unified_rule(name: &str) -> Option<&'static UnifiedRule> {
    UNIFIED_RULES.iter().find(|r| r.name == name)
}

pub fn prefers_direct(name: &str) -> bool {
    find_unified_rule(name).map_or(false, |r| r.prefer_direct)
}

/// Remote rule set locations, per dialect.
pub const CLASH_SITE_RULE_SET_BASE_URL: &str =
    "https://github.com/MetaCubeX/meta-rules-dat/raw/meta/geo/geosite/";
pub const CLASH_IP_RULE_SET_BASE_URL: &str =
    "https://github.com/MetaCubeX/meta-rules-dat/raw/meta/geo/geoip/";
pub const SINGBOX_SITE_RULE_SET_BASE_URL: &str =
    "https://raw.githubusercontent.com/lyc8503/sing-box-rules/rule-set-geosite/";
pub const SINGBOX_IP_RULE_SET_BASE_URL: &str =
    "https://raw.githubusercontent.com/lyc8503/sing-box-rules/rule-set-geoip/";
pub const SURGE_SITE_RULE_SET_BASE_URL: &str =
    "https://github.com/NSZA156/surge-geox-rules/raw/refs/heads/main/geo/geosite/";
pub const SURGE_IP_RULE_SET_BASE_URL: &str =
    "https://github.com/NSZA156/surge-geox-rules/raw/refs/heads/main/geo/geoip/";
