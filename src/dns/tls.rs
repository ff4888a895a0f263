//! TLS settings shared by the DoT and DoH transports.

use crate::dns::DnsError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Overrides for the platform TLS defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Accept invalid certificates and mismatched host names.
    pub insecure: bool,
    /// Name used for SNI and certificate verification instead of the
    /// server's host. DoT only; DoH always verifies against the URL host.
    pub server_name: Option<String>,
}

impl TlsSettings {
    pub fn insecure() -> Self {
        Self {
            insecure: true,
            ..Default::default()
        }
    }

    /// Builds an async TLS connector for stream transports.
    pub fn connector(&self) -> Result<tokio_native_tls::TlsConnector, DnsError> {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(self.insecure)
            .danger_accept_invalid_hostnames(self.insecure)
            .build()
            .map_err(|e| DnsError::InvalidConfig(format!("failed to build TLS connector: {}", e)))?;
        Ok(tokio_native_tls::TlsConnector::from(connector))
    }

    /// The name to present during the handshake with `host`.
    pub fn domain_for<'a>(&'a self, host: &'a str) -> &'a str {
        self.server_name.as_deref().unwrap_or(host)
    }

    /// Applies these settings to an HTTP client under construction.
    ///
    /// reqwest takes the TLS name from the request URL, so `server_name`
    /// is not applied here.
    pub fn apply(&self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        if let Some(name) = &self.server_name {
            warn!(server_name = %name, "tls.server_name is ignored for DoH; put the name in the server URL");
        }
        builder
            .danger_accept_invalid_certs(self.insecure)
            .danger_accept_invalid_hostnames(self.insecure)
    }
}
