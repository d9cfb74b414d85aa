/// Always-available outbound every dialect provides.
pub const DIRECT: &str = "DIRECT";
/// Always-available blocking outbound every dialect provides.
pub const REJECT: &str = "REJECT";

/// Type of proxy group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Manual selection
    Select,
    /// Latency probe, picks the fastest member
    URLTest,
    /// Ordered chain, first healthy member wins
    Fallback,
    LoadBalance,
}

impl GroupKind {
    /// Get string representation of the proxy group type
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Select => "select",
            GroupKind::URLTest => "url-test",
            GroupKind::Fallback => "fallback",
            GroupKind::LoadBalance => "load-balance",
        }
    }
}

/// Construction stage a group came from; fixes where it sits in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupOrigin {
    Auto,
    NodeSelect,
    Country,
    RuleCategory,
    Custom,
    Fallback,
}

/// A routing group produced by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub kind: GroupKind,
    /// Proxy tags, names of earlier groups, or the `DIRECT`/`REJECT` sentinels.
    pub members: Vec<String>,
    pub built_from: GroupOrigin,
    /// Probe URL for `URLTest`, `Fallback` and `LoadBalance` groups.
    pub url: Option<String>,
    /// Probe interval in seconds.
    pub interval: Option<u32>,
}

impl Group {
    pub fn new(name: String, kind: GroupKind, members: Vec<String>, built_from: GroupOrigin) -> Self {
        Self {
            name,
            kind,
            members,
            built_from,
            url: None,
            interval: None,
        }
    }

    pub fn with_probe(mut self, url: &str, interval: u32) -> Self {
        self.url = Some(url.to_string());
        self.interval = Some(interval);
        self
    }

    /// Get string representation of the group type
    pub fn type_str(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Returns true for outbounds that exist in every dialect without being declared.
pub fn is_builtin_outbound(name: &str) -> bool {
    name == DIRECT || name == REJECT
}
