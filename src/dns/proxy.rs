//! Proxy tunnel construction.
//!
//! SOCKS5 proxies are reached through a [`Socks5Dialer`], which produces a
//! tunneled TCP stream usable by every transport. HTTP proxies, and SOCKS5
//! proxies used by the HTTP client, are expressed as proxy URLs and are only
//! meaningful for DNS over HTTPS.

use crate::dns::DnsError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;
use tracing::trace;

/// The kind of proxy a client routes its queries through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    #[default]
    None,
    Socks5,
    Http,
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProxyKind::None => "none",
            ProxyKind::Socks5 => "socks5",
            ProxyKind::Http => "http",
        })
    }
}

/// Username/password authentication for a proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl ProxyCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Proxy configuration of a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    pub kind: ProxyKind,
    /// `host:port` of the proxy. An HTTP proxy may also be given as a URL.
    pub address: String,
    pub credentials: Option<ProxyCredentials>,
}

impl ProxySettings {
    pub fn new(kind: ProxyKind, address: impl Into<String>, credentials: Option<ProxyCredentials>) -> Self {
        Self {
            kind,
            address: address.into(),
            credentials,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.kind != ProxyKind::None
    }

    /// The proxy as a URL for the HTTP client's proxy support.
    ///
    /// A bare `host:port` HTTP proxy becomes `http://host:port`; a SOCKS5
    /// proxy becomes `socks5://host:port`. Credentials, if any, are embedded
    /// in the user-info component.
    pub fn url(&self) -> Result<Url, DnsError> {
        let raw = match self.kind {
            ProxyKind::Http if self.address.starts_with("http") => self.address.clone(),
            ProxyKind::Http => format!("http://{}", self.address),
            ProxyKind::Socks5 => format!("socks5://{}", self.address),
            ProxyKind::None => {
                return Err(DnsError::UnsupportedProxy {
                    transport: "proxy url",
                    proxy: self.kind.to_string(),
                })
            }
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| DnsError::InvalidConfig(format!("invalid proxy address '{}': {}", raw, e)))?;

        if let Some(credentials) = &self.credentials {
            url.set_username(&credentials.username)
                .and_then(|_| url.set_password(Some(&credentials.password)))
                .map_err(|_| {
                    DnsError::InvalidConfig(format!("proxy address '{}' cannot carry credentials", raw))
                })?;
        }

        Ok(url)
    }
}

/// Opens TCP streams tunneled through a SOCKS5 proxy.
#[derive(Debug, Clone)]
pub struct Socks5Dialer {
    proxy_addr: String,
    credentials: Option<ProxyCredentials>,
}

impl Socks5Dialer {
    /// Builds a dialer for `settings`. Any proxy kind other than SOCKS5 is
    /// rejected; there is no fallback to a direct connection.
    pub fn from_settings(settings: &ProxySettings) -> Result<Self, DnsError> {
        match settings.kind {
            ProxyKind::Socks5 => Ok(Self {
                proxy_addr: settings.address.clone(),
                credentials: settings.credentials.clone(),
            }),
            other => Err(DnsError::UnsupportedProxy {
                transport: "stream dialer",
                proxy: other.to_string(),
            }),
        }
    }

    pub fn proxy_addr(&self) -> &str {
        &self.proxy_addr
    }

    /// Opens a tunnel to `target` (`host:port`).
    pub async fn dial(&self, target: &str) -> Result<Socks5Stream<TcpStream>, DnsError> {
        trace!(proxy = %self.proxy_addr, target, "Dialing through SOCKS5 proxy");
        let stream = match &self.credentials {
            Some(credentials) => {
                Socks5Stream::connect_with_password(
                    self.proxy_addr.as_str(),
                    target,
                    &credentials.username,
                    &credentials.password,
                )
                .await
            }
            None => Socks5Stream::connect(self.proxy_addr.as_str(), target).await,
        };

        stream.map_err(|e| {
            DnsError::Transport(format!(
                "failed to dial {} through proxy {}: {}",
                target, self.proxy_addr, e
            ))
        })
    }
}
