pub mod base64;
pub mod http;
pub mod url;
pub mod yaml;

// Re-export common utilities
pub use http::{Fetcher, HttpFetcher, StaticFetcher};
