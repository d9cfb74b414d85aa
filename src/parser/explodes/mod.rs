//! Link Decoder Registry: one decoder per link scheme plus the structural
//! converter for Clash-style proxy entries. Every path yields the same
//! canonical [`Proxy`](crate::models::Proxy).

pub mod clash;
pub mod common;
pub mod hysteria;
pub mod hysteria2;
pub mod socks;
pub mod ss;
pub mod trojan;
pub mod tuic;
pub mod vless;
pub mod vmess;
pub mod wireguard;

pub use clash::explode_clash_proxy;
pub use common::{explode, explode_token};
