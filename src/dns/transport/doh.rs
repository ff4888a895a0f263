//! DNS over HTTPS (DOH) transport, RFC 8484 GET requests.

use super::with_io_deadline;
use crate::core::Transport;
use crate::dns::{context::QueryContext, message, ClientConfig, DnsError};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hickory_resolver::proto::op::Message;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Proxy, StatusCode, Url,
};
use std::sync::Arc;
use tracing::{debug, trace};

pub const DNS_MESSAGE: &str = "application/dns-message";

/// Builds the GET URL for `server`, carrying `wire` in the `dns` parameter.
///
/// A server that does not look like a URL is treated as a host and gets the
/// conventional `https://<host>/dns-query` endpoint.
pub fn doh_url(server: &str, wire: &[u8]) -> Result<Url, DnsError> {
    let base = if server.starts_with("http") {
        server.to_string()
    } else {
        format!("https://{}/dns-query", server)
    };
    let mut url = Url::parse(&base)
        .map_err(|e| DnsError::InvalidConfig(format!("invalid DoH URL '{}': {}", base, e)))?;

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "dns")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("dns", &URL_SAFE_NO_PAD.encode(wire));

    Ok(url)
}

pub struct DohTransport {
    config: Arc<ClientConfig>,
}

impl DohTransport {
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    /// Returns the configured client, or builds one honoring the TLS and
    /// proxy settings.
    fn http_client(&self) -> Result<Client, DnsError> {
        if let Some(client) = &self.config.http_client {
            return Ok(client.clone());
        }

        let mut builder = Client::builder().timeout(self.config.timeout);
        if let Some(tls) = &self.config.tls {
            builder = tls.apply(builder);
        }

        builder = if self.config.proxy.is_enabled() {
            let proxy_url = self.config.proxy.url()?;
            debug!(proxy = %self.config.proxy.address, kind = %self.config.proxy.kind, "DoH client using proxy");
            let proxy = Proxy::all(proxy_url.as_str())
                .map_err(|e| DnsError::InvalidConfig(format!("invalid proxy URL: {}", e)))?;
            builder.proxy(proxy)
        } else {
            builder.no_proxy()
        };

        builder
            .build()
            .map_err(|e| DnsError::InvalidConfig(format!("failed to create HTTP client: {}", e)))
    }

    async fn send(client: &Client, url: Url) -> Result<Message, DnsError> {
        let response = client
            .get(url)
            .header(ACCEPT, DNS_MESSAGE)
            .header(CONTENT_TYPE, DNS_MESSAGE)
            .send()
            .await
            .map_err(|e| DnsError::Transport(format!("DoH request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DnsError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DnsError::Transport(format!("failed to read DoH response body: {}", e)))?;
        message::decode(&body)
    }
}

#[async_trait]
impl Transport for DohTransport {
    fn name(&self) -> &'static str {
        "doh"
    }

    async fn exchange(&self, ctx: &QueryContext, query: &Message, server: &str) -> Result<Message, DnsError> {
        let wire = message::encode(query)?;
        let url = doh_url(server, &wire)?;
        let client = self.http_client()?;
        trace!(%url, "DoH GET request");

        let deadline = ctx.attempt_deadline(self.config.timeout);
        ctx.run(with_io_deadline(deadline, Self::send(&client, url))).await
    }
}
