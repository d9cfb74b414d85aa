pub mod explodes;
pub mod node_manip;
pub mod ruleset;
pub mod subparser;
pub mod types;

pub use subparser::{normalize, NormalizeOptions};
pub use types::{Candidate, Normalized, OverrideDocument, OverrideValue, Token};
