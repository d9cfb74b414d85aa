//! Core data models for the application
//!
//! This module contains the primary data structures used throughout the application,
//! separated from the logic that operates on them.
//!
//! # Usage
//!
//! ```rust
//! use sublink::models::{ProtocolParams, Proxy, ProxyType};
//!
//! let proxy = Proxy::new(
//!     "Tokyo 01",
//!     "example.com",
//!     443,
//!     ProtocolParams::Trojan { password: "secret".to_string() },
//! );
//! assert_eq!(proxy.proxy_type(), ProxyType::Trojan);
//! ```
//!
//! Records and groups are build-scoped values: every build constructs its own
//! and drops them once the document is rendered.

mod builder;
mod lang;
mod proxy;
mod proxy_group_config;
mod rule;

pub use lang::Lang;
pub use proxy::*;
pub use proxy_group_config::*;
pub use rule::*;
