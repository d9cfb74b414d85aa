use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::{engine::general_purpose, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

/// Standard alphabet, padding optional.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

static BASE64_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=\r\n]+$").expect("static pattern"));

/// Encodes a string to Base64 format.
pub fn base64_encode(input: &str) -> String {
    general_purpose::STANDARD.encode(input)
}

/// Reverses a URL-safe Base64 string to standard Base64 format.
pub fn url_safe_base64_reverse(input: &str) -> String {
    input.replace('-', "+").replace('_', "/")
}

/// Decodes Base64 text into a UTF-8 string.
///
/// Accepts both the standard and the URL-safe alphabet, tolerates missing
/// padding and embedded whitespace. Returns `None` when the input is not valid
/// Base64 or does not decode to UTF-8.
pub fn try_base64_decode(input: &str) -> Option<String> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    let normalized = url_safe_base64_reverse(&compact);
    let bytes = STANDARD_LENIENT.decode(normalized.as_bytes()).ok()?;
    String::from_utf8(bytes).ok()
}

/// Whether a whole document plausibly is one Base64 block: restricted alphabet
/// and a length, ignoring line breaks, that is a multiple of four.
pub fn is_base64_like(input: &str) -> bool {
    if !BASE64_LIKE.is_match(input) {
        return false;
    }
    let len = input.chars().filter(|c| *c != '\r' && *c != '\n').count();
    len > 0 && len % 4 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let encoded = base64_encode("ss://abc\nvmess://def");
        assert_eq!(
            try_base64_decode(&encoded).as_deref(),
            Some("ss://abc\nvmess://def")
        );
    }

    #[test]
    fn test_unpadded_and_url_safe() {
        // "method:pass?" in url-safe form without padding
        assert_eq!(try_base64_decode("bWV0aG9kOnBhc3M_").as_deref(), Some("method:pass?"));
        assert_eq!(try_base64_decode("YWJj").as_deref(), Some("abc"));
        assert_eq!(try_base64_decode("YWI").as_deref(), Some("ab"));
    }

    #[test]
    fn test_invalid() {
        assert!(try_base64_decode("not base64!").is_none());
        assert!(try_base64_decode("").is_none());
        assert!(try_base64_decode("@@@").is_none());
    }

    #[test]
    fn test_is_base64_like() {
        assert!(is_base64_like("YWJj\r\nZGVm"));
        assert!(!is_base64_like("YWJjZ"));
        assert!(!is_base64_like("proxies:\n  - type: ss"));
        assert!(!is_base64_like(""));
    }
}
