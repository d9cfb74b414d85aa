use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Lang;

pub struct Country {
    /// ISO 3166 alpha-2 code
    pub code: &'static str,
    pub flag: &'static str,
    pub name_zh: &'static str,
    pub name_en: &'static str,
    /// Extra spellings found in node names. Short ASCII codes only match
    /// when not embedded in a longer word.
    pub aliases: &'static [&'static str],
}

pub static COUNTRIES: &[Country] = &[
    Country { code: "HK", flag: "🇭🇰", name_zh: "香港", name_en: "Hong Kong", aliases: &["HK", "HKG", "Hongkong"] },
    Country { code: "TW", flag: "🇹🇼", name_zh: "台湾", name_en: "Taiwan", aliases: &["TW", "TWN", "台灣", "台北"] },
    Country { code: "SG", flag: "🇸🇬", name_zh: "新加坡", name_en: "Singapore", aliases: &["SG", "SGP", "狮城"] },
    Country { code: "JP", flag: "🇯🇵", name_zh: "日本", name_en: "Japan", aliases: &["JP", "JPN", "东京", "大阪", "Tokyo", "Osaka"] },
    Country { code: "KR", flag: "🇰🇷", name_zh: "韩国", name_en: "Korea", aliases: &["KR", "KOR", "首尔", "Seoul"] },
    Country { code: "US", flag: "🇺🇸", name_zh: "美国", name_en: "United States", aliases: &["US", "USA", "America", "洛杉矶", "硅谷", "Los Angeles", "San Jose"] },
    Country { code: "GB", flag: "🇬🇧", name_zh: "英国", name_en: "United Kingdom", aliases: &["UK", "GB", "Britain", "England", "伦敦", "London"] },
    Country { code: "DE", flag: "🇩🇪", name_zh: "德国", name_en: "Germany", aliases: &["DE", "Frankfurt", "法兰克福"] },
    Country { code: "FR", flag: "🇫🇷", name_zh: "法国", name_en: "France", aliases: &["FR", "Paris", "巴黎"] },
    Country { code: "NL", flag: "🇳🇱", name_zh: "荷兰", name_en: "Netherlands", aliases: &["NL", "Amsterdam", "阿姆斯特丹"] },
    Country { code: "CA", flag: "🇨🇦", name_zh: "加拿大", name_en: "Canada", aliases: &["CA", "Toronto", "多伦多"] },
    Country { code: "AU", flag: "🇦🇺", name_zh: "澳大利亚", name_en: "Australia", aliases: &["AU", "Sydney", "悉尼", "澳洲"] },
    Country { code: "RU", flag: "🇷🇺", name_zh: "俄罗斯", name_en: "Russia", aliases: &["RU", "Moscow", "莫斯科"] },
    Country { code: "IN", flag: "🇮🇳", name_zh: "印度", name_en: "India", aliases: &["IN", "Mumbai", "孟买"] },
    Country { code: "TR", flag: "🇹🇷", name_zh: "土耳其", name_en: "Turkey", aliases: &["TR", "Istanbul", "伊斯坦布尔"] },
    Country { code: "BR", flag: "🇧🇷", name_zh: "巴西", name_en: "Brazil", aliases: &["BR", "Sao Paulo", "圣保罗"] },
    Country { code: "MY", flag: "🇲🇾", name_zh: "马来西亚", name_en: "Malaysia", aliases: &["MY", "Kuala Lumpur", "吉隆坡"] },
    Country { code: "TH", flag: "🇹🇭", name_zh: "泰国", name_en: "Thailand", aliases: &["TH", "Bangkok", "曼谷"] },
    Country { code: "VN", flag: "🇻🇳", name_zh: "越南", name_en: "Vietnam", aliases: &["VN", "Hanoi", "河内"] },
    Country { code: "PH", flag: "🇵🇭", name_zh: "菲律宾", name_en: "Philippines", aliases: &["PH", "Manila", "马尼拉"] },
    Country { code: "ID", flag: "🇮🇩", name_zh: "印度尼西亚", name_en: "Indonesia", aliases: &["ID", "Jakarta", "雅加达", "印尼"] },
    Country { code: "IT", flag: "🇮🇹", name_zh: "意大利", name_en: "Italy", aliases: &["IT", "Milan", "米兰"] },
    Country { code: "ES", flag: "🇪🇸", name_zh: "西班牙", name_en: "Spain", aliases: &["ES", "Madrid", "马德里"] },
    Country { code: "CH", flag: "🇨🇭", name_zh: "瑞士", name_en: "Switzerland", aliases: &["CH", "Zurich", "苏黎世"] },
    Country { code: "AE", flag: "🇦🇪", name_zh: "阿联酋", name_en: "United Arab Emirates", aliases: &["AE", "UAE", "Dubai", "迪拜"] },
];

static COUNTRY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    COUNTRIES
        .iter()
        .map(|country| {
            let mut alternatives = vec![
                regex::escape(country.flag),
                regex::escape(country.name_zh),
                regex::escape(country.name_en),
            ];
            for alias in country.aliases {
                if alias.len() <= 3 && alias.chars().all(|c| c.is_ascii_alphabetic()) {
                    // codes such as HK must not match inside words like "Hackney"
                    alternatives.push(format!(
                        "(?-i:(?:^|[^A-Za-z]){}(?:[^A-Za-z]|$))",
                        regex::escape(alias)
                    ));
                } else {
                    alternatives.push(regex::escape(alias));
                }
            }
            Regex::new(&format!("(?i){}", alternatives.join("|")))
                .expect("country patterns are built from escaped literals")
        })
        .collect()
});

/// Infer the country of a proxy from its display name. First table match wins.
pub fn parse_country_from_name(name: &str) -> Option<&'static Country> {
    COUNTRIES
        .iter()
        .zip(COUNTRY_PATTERNS.iter())
        .find(|(_, pattern)| pattern.is_match(name))
        .map(|(country, _)| country)
}

pub fn find_country(code: &str) -> Option<&'static Country> {
    COUNTRIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

impl Country {
    /// Group name used for the per-country selector, e.g. `🇯🇵 日本`.
    pub fn group_name(&self, lang: Lang) -> String {
        match lang {
            Lang::ZhCn => format!("{} {}", self.flag, self.name_zh),
            Lang::EnUs => format!("{} {}", self.flag, self.name_en),
        }
    }
}
