pub mod countries;
pub mod messages;
pub mod rule_sets;
pub mod templates;

/// URL probed by latency-test and fallback groups.
pub const DEFAULT_TEST_URL: &str = "https://www.gstatic.com/generate_204";
/// Probe interval in seconds.
pub const DEFAULT_TEST_INTERVAL: u32 = 300;
/// User agent sent when fetching remote subscriptions.
pub const DEFAULT_USER_AGENT: &str = "curl/7.74.0";
