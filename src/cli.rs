//! Command-Line Interface (CLI) argument parsing.
//!
//! These arguments are parsed at startup and then merged over the
//! configuration file and `POLYDNS_` environment variables, so any flag
//! given here wins.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Query many DNS servers at once over UDP, TCP, DoT or DoH.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The domain name to resolve.
    pub domain: String,

    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Wire protocol: udp, tcp, dot or doh.
    #[arg(short, long)]
    pub protocol: Option<String>,

    /// Record type to query, by name (A, MX, ...) or numeric code.
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub record_type: Option<String>,

    /// Server to query. Repeat to query several; replaces the default list.
    #[arg(short, long = "server", value_name = "ADDR")]
    pub servers: Vec<String>,

    /// Per-attempt timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Additional attempts per server after a failure.
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Tunnel queries through a SOCKS5 proxy.
    #[arg(long, value_name = "HOST:PORT", conflicts_with = "http_proxy")]
    pub socks5_proxy: Option<String>,

    /// Send DoH requests through an HTTP proxy.
    #[arg(long, value_name = "URL")]
    pub http_proxy: Option<String>,

    #[arg(long, requires = "proxy_password")]
    pub proxy_user: Option<String>,

    #[arg(long, requires = "proxy_user")]
    pub proxy_password: Option<String>,

    /// Accept any TLS certificate from DoT and DoH servers.
    #[arg(long)]
    pub insecure: bool,

    /// Query only the first server instead of all of them.
    #[arg(long)]
    pub single: bool,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,

    /// Logging filter, e.g. "debug" or "polydns=trace".
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Overall deadline for the whole run in milliseconds.
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,
}

/// Inserts `value` at `section.key`, creating the section table as needed.
fn insert_nested(root: &mut Dict, section: &str, key: &str, value: Value) {
    let entry = root
        .entry(section.to_string())
        .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
    if let Value::Dict(_, table) = entry {
        table.insert(key.to_string(), value);
    }
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            insert_nested(&mut dict, "core", "log_level", Value::from(level.clone()));
        }

        if let Some(protocol) = &self.protocol {
            insert_nested(&mut dict, "query", "protocol", Value::from(protocol.to_ascii_lowercase()));
        }
        if !self.servers.is_empty() {
            insert_nested(&mut dict, "query", "servers", Value::from(self.servers.clone()));
        }
        if let Some(timeout) = self.timeout_ms {
            insert_nested(&mut dict, "query", "timeout_ms", Value::from(timeout));
        }
        if let Some(retries) = self.retries {
            insert_nested(&mut dict, "query", "retries", Value::from(retries));
        }
        if let Some(record_type) = &self.record_type {
            insert_nested(&mut dict, "query", "record_type", Value::from(record_type.clone()));
        }

        let proxy = match (&self.socks5_proxy, &self.http_proxy) {
            (Some(address), _) => Some(("socks5", address)),
            (None, Some(address)) => Some(("http", address)),
            (None, None) => None,
        };
        if let Some((kind, address)) = proxy {
            insert_nested(&mut dict, "proxy", "kind", Value::from(kind));
            insert_nested(&mut dict, "proxy", "address", Value::from(address.clone()));
        }
        if let Some(user) = &self.proxy_user {
            insert_nested(&mut dict, "proxy", "username", Value::from(user.clone()));
        }
        if let Some(password) = &self.proxy_password {
            insert_nested(&mut dict, "proxy", "password", Value::from(password.clone()));
        }

        // Flags only override when present; absent means "keep the file's value".
        if self.insecure {
            insert_nested(&mut dict, "tls", "insecure", Value::from(true));
        }
        if self.json {
            insert_nested(&mut dict, "output", "format", Value::from("Json"));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
