pub mod sublink;

pub use sublink::{build, BuildOutput, BuildRequest};
