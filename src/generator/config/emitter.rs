use serde_json::Value;

use crate::error::SublinkError;
use crate::models::{Group, Proxy, RuleCategory};

/// Extension points the group assembler drives, one implementation per target
/// dialect.
///
/// The emitter owns the document being built. The assembler calls the proxy
/// hooks first, then exactly one group hook per group in construction order,
/// and the build finally calls [`finish`](DialectEmitter::finish).
pub trait DialectEmitter {
    /// Proxy entries currently in the document, in dialect shape.
    fn proxies(&self) -> Vec<&Value>;

    /// Name other entries use to refer to a converted proxy.
    fn proxy_name(&self, proxy: &Value) -> Option<String>;

    /// Translate a canonical record; `SublinkError::Emit` when the dialect
    /// cannot express it.
    fn convert_proxy(&self, proxy: &Proxy) -> Result<Value, SublinkError>;

    fn add_proxy(&mut self, proxy: Value);

    /// Write a group into the document.
    fn add_group(&mut self, group: &Group);

    fn add_auto_select_group(&mut self, group: &Group) {
        self.add_group(group);
    }

    fn add_node_select_group(&mut self, group: &Group) {
        self.add_group(group);
    }

    fn add_country_group(&mut self, group: &Group) {
        self.add_group(group);
    }

    fn add_outbound_group(&mut self, group: &Group) {
        self.add_group(group);
    }

    fn add_custom_rule_group(&mut self, group: &Group) {
        self.add_group(group);
    }

    fn add_fallback_group(&mut self, group: &Group) {
        self.add_group(group);
    }

    /// Write routing rules for `categories` and hand back the finished document.
    fn finish(&mut self, categories: &[RuleCategory]) -> Value;

    /// Render a finished document to the dialect's text form.
    fn render(&self, document: &Value) -> Result<String, SublinkError>;

    /// Names of every proxy in the document.
    fn proxy_names(&self) -> Vec<String> {
        self.proxies()
            .into_iter()
            .filter_map(|p| self.proxy_name(p))
            .collect()
    }
}
