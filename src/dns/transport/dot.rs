//! DNS over TLS (DOT) transport.

use super::{exchange_framed, split_host_port, with_io_deadline};
use crate::core::Transport;
use crate::dns::{
    context::QueryContext, proxy::ProxyKind, ClientConfig, DnsError, Socks5Dialer, TlsSettings,
};
use async_trait::async_trait;
use hickory_resolver::proto::op::Message;
use std::net::Ipv6Addr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

pub const DOT_PORT: u16 = 853;

/// Appends the DoT port to a server address that has none.
pub fn normalize_dot_server(server: &str) -> String {
    if server.parse::<Ipv6Addr>().is_ok() {
        return format!("[{}]:{}", server, DOT_PORT);
    }
    match split_host_port(server) {
        (_, Some(_)) => server.to_string(),
        (_, None) if server.starts_with('[') => format!("{}:{}", server, DOT_PORT),
        (host, None) => format!("{}:{}", host, DOT_PORT),
    }
}

pub struct DotTransport {
    config: Arc<ClientConfig>,
}

impl DotTransport {
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    fn tls_settings(&self) -> TlsSettings {
        self.config.tls.clone().unwrap_or_default()
    }
}

/// Performs the TLS handshake over `stream` and exchanges one query.
async fn exchange_over_tls<S>(
    stream: S,
    tls: &TlsSettings,
    target: &str,
    query: &Message,
) -> Result<Message, DnsError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let connector = tls.connector()?;
    let (host, _) = split_host_port(target);
    let domain = tls.domain_for(host);
    trace!(target, domain, "Starting TLS handshake");

    let mut tls_stream = connector
        .connect(domain, stream)
        .await
        .map_err(|e| DnsError::Transport(format!("TLS handshake with {} failed: {}", target, e)))?;

    let result = exchange_framed(&mut tls_stream, query).await;
    let _ = tls_stream.shutdown().await;
    result
}

#[async_trait]
impl Transport for DotTransport {
    fn name(&self) -> &'static str {
        "dot"
    }

    async fn exchange(&self, ctx: &QueryContext, query: &Message, server: &str) -> Result<Message, DnsError> {
        let target = normalize_dot_server(server);
        let tls = self.tls_settings();

        match self.config.proxy.kind {
            ProxyKind::None => {
                debug!(server = %target, "Direct DoT exchange");
                let deadline = ctx.attempt_deadline(self.config.timeout);
                let exchange = async {
                    let stream = TcpStream::connect(&target)
                        .await
                        .map_err(|e| DnsError::Transport(format!("failed to connect to {}: {}", target, e)))?;
                    exchange_over_tls(stream, &tls, &target, query).await
                };
                ctx.run(with_io_deadline(deadline, exchange)).await
            }
            ProxyKind::Socks5 => {
                debug!(server = %target, proxy = %self.config.proxy.address, "Tunneled DoT exchange");
                let dialer = Socks5Dialer::from_settings(&self.config.proxy)?;
                let deadline = ctx.attempt_deadline(self.config.timeout);
                let query = query.clone();

                ctx.run_detached(with_io_deadline(deadline, async move {
                    let stream = dialer.dial(&target).await?;
                    exchange_over_tls(stream, &tls, &target, &query).await
                }))
                .await
            }
            ProxyKind::Http => Err(DnsError::UnsupportedProxy {
                transport: "dot",
                proxy: ProxyKind::Http.to_string(),
            }),
        }
    }
}
