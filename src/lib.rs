pub mod constants;
pub mod error;
pub mod generator;
pub mod interfaces;
pub mod models;
pub mod parser;
pub mod settings;
pub mod utils;

pub use error::{Diagnostic, DiagnosticKind, SublinkError};
pub use generator::config::Target;
pub use interfaces::{build, BuildOutput, BuildRequest};
pub use models::{CustomRule, Lang, Proxy, ProxyType, RuleSpec};
pub use settings::Settings;
pub use utils::http::{Fetcher, HttpFetcher, StaticFetcher};
