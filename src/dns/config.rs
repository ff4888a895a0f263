//! Immutable client configuration and its builder.

use crate::dns::{
    proxy::{ProxyCredentials, ProxyKind, ProxySettings},
    servers::default_servers,
    tls::TlsSettings,
    DnsError,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RETRIES: u32 = 3;

/// The wire protocol used to reach the configured servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
    /// DNS over TLS
    #[serde(alias = "tls")]
    Dot,
    /// DNS over HTTPS
    #[serde(alias = "https")]
    Doh,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
            Protocol::Dot => "dot",
            Protocol::Doh => "doh",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            "dot" | "tls" => Ok(Protocol::Dot),
            "doh" | "https" => Ok(Protocol::Doh),
            other => Err(DnsError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Resolution parameters shared read-only by every query of a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Additional attempts after a failed one.
    pub retries: u32,
    pub protocol: Protocol,
    /// Servers in configuration order. Fan-out results follow this order.
    pub servers: Vec<String>,
    pub proxy: ProxySettings,
    /// TLS settings. `insecure` applies to DoT and DoH; `server_name` only
    /// to DoT. `None` uses the platform defaults.
    pub tls: Option<TlsSettings>,
    /// Client used for DoH instead of one built per attempt. Shared by all
    /// concurrent queries.
    pub http_client: Option<reqwest::Client>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            protocol: Protocol::Udp,
            servers: default_servers(Protocol::Udp),
            proxy: ProxySettings::default(),
            tls: None,
            http_client: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builds a [`ClientConfig`]. The last call for a setting wins; unset
/// settings keep their defaults.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Selects the protocol and resets the servers to that protocol's
    /// default list. Call [`servers`](Self::servers) afterwards to override.
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol = protocol;
        self.config.servers = default_servers(protocol);
        self
    }

    pub fn servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.servers = servers.into_iter().map(Into::into).collect();
        self
    }

    pub fn socks5_proxy(mut self, address: impl Into<String>, credentials: Option<ProxyCredentials>) -> Self {
        self.config.proxy = ProxySettings::new(ProxyKind::Socks5, address, credentials);
        self
    }

    /// Routes DoH requests through an HTTP proxy. Other transports reject it.
    pub fn http_proxy(mut self, address: impl Into<String>, credentials: Option<ProxyCredentials>) -> Self {
        self.config.proxy = ProxySettings::new(ProxyKind::Http, address, credentials);
        self
    }

    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.config.proxy = proxy;
        self
    }

    pub fn tls(mut self, tls: TlsSettings) -> Self {
        self.config.tls = Some(tls);
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.config.http_client = Some(client);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
