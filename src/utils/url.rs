//! URL helpers shared by the link decoders

use std::collections::HashMap;

use url::Url;

/// Decodes a URL-encoded string
///
/// Returns the original string if decoding fails.
///
/// # Examples
/// ```
/// use sublink::utils::url::url_decode;
///
/// assert_eq!(url_decode("Tokyo%2001"), "Tokyo 01");
/// ```
pub fn url_decode(input: &str) -> String {
    urlencoding::decode(input)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

/// Whether `link` is a fetchable http(s) URL, i.e. a remote subscription.
pub fn is_link(link: &str) -> bool {
    let lower = link.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Parse `k=v&k2=v2`, percent-decoding both sides. Later duplicates win.
///
/// `+` is kept literally: link credentials are often raw base64.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (url_decode(key), url_decode(value))
        })
        .collect()
}

/// Query parameters of a parsed URL.
pub fn query_map(url: &Url) -> HashMap<String, String> {
    url.query().map(parse_query).unwrap_or_default()
}

/// Interpret the usual truthy spellings found in links: `1`, `true`, `yes`.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Non-empty query value.
pub fn get_param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|v| !v.is_empty()).cloned()
}

/// Decoded URL fragment, the conventional label slot of proxy links.
pub fn fragment_label(url: &Url) -> String {
    url.fragment().map(url_decode).unwrap_or_default()
}

/// Decoded userinfo user part. `Url` keeps it percent-encoded.
pub fn decoded_username(url: &Url) -> String {
    url_decode(url.username())
}

/// Host without the brackets `Url` keeps around IPv6 literals.
pub fn host_of(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
        .filter(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_link() {
        assert!(is_link("https://example.com/sub"));
        assert!(is_link("HTTP://example.com"));
        assert!(!is_link("ss://abc"));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1"));
        assert!(parse_bool("True"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_fragment_and_host() {
        let url = Url::parse("trojan://p%40ss@[2001:db8::1]:443?sni=a.com#My%20Node").unwrap();
        assert_eq!(fragment_label(&url), "My Node");
        assert_eq!(decoded_username(&url), "p@ss");
        assert_eq!(host_of(&url).as_deref(), Some("2001:db8::1"));
        assert_eq!(query_map(&url).get("sni").map(String::as_str), Some("a.com"));
    }

    #[test]
    fn test_query_keeps_plus() {
        let params = parse_query("pbk=Ab+Cd/Ef=&path=%2Fws%3Fed%3D2048&flag");
        assert_eq!(params["pbk"], "Ab+Cd/Ef=");
        assert_eq!(params["path"], "/ws?ed=2048");
        assert_eq!(params["flag"], "");

        let url = Url::parse("hysteria2://pw@h.example.com:443?obfs-password=x+y%2Bz").unwrap();
        assert_eq!(query_map(&url)["obfs-password"], "x+y+z");
    }
}
