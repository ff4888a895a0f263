//! polydns - Concurrent DNS queries over UDP, TCP, DoT and DoH
//!
//! This library provides a DNS client that sends a query to one server or
//! fans it out to many, optionally through a SOCKS5 or HTTP proxy, with
//! per-server retries and a caller-controlled deadline.

pub mod cli;
pub mod config;
pub mod core;
pub mod dns;
pub mod formatting;

// Re-export core types for convenience
pub use crate::core::*;
pub use dns::{ClientConfig, DnsClient, DnsError, Protocol, QueryContext};
