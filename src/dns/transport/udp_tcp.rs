//! Plain DNS over UDP or TCP, directly or tunneled through SOCKS5.

use super::{exchange_framed, read_err, with_io_deadline, write_err};
use crate::core::Transport;
use crate::dns::{
    context::QueryContext, message, proxy::ProxyKind, ClientConfig, DnsError, Protocol, Socks5Dialer,
};
use async_trait::async_trait;
use hickory_resolver::proto::op::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tracing::{debug, trace};

/// Largest datagram accepted from a server.
const MAX_UDP_PAYLOAD: usize = 65_535;

pub struct UdpTcpTransport {
    config: Arc<ClientConfig>,
}

impl UdpTcpTransport {
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    async fn exchange_udp(query: &Message, server: &str) -> Result<Message, DnsError> {
        let target = resolve_server(server).await?;
        let bind_addr: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| DnsError::Transport(format!("failed to bind UDP socket: {}", e)))?;
        socket
            .connect(target)
            .await
            .map_err(|e| DnsError::Transport(format!("failed to connect to {}: {}", target, e)))?;

        let wire = message::encode(query)?;
        socket.send(&wire).await.map_err(write_err)?;

        let mut buf = vec![0u8; MAX_UDP_PAYLOAD];
        loop {
            let len = socket.recv(&mut buf).await.map_err(read_err)?;
            let response = message::decode(&buf[..len])?;
            if response.id() == query.id() {
                return Ok(response);
            }
            trace!(server, expected = query.id(), got = response.id(), "Discarding response with mismatched id");
        }
    }

    async fn exchange_tcp(query: &Message, server: &str) -> Result<Message, DnsError> {
        let mut stream = TcpStream::connect(server)
            .await
            .map_err(|e| DnsError::Transport(format!("failed to connect to {}: {}", server, e)))?;
        let result = exchange_framed(&mut stream, query).await;
        let _ = stream.shutdown().await;
        result
    }

    /// Exchanges over a SOCKS5 tunnel. The tunnel always carries the
    /// length-prefixed stream framing, whatever the configured protocol.
    async fn exchange_tunneled(&self, ctx: &QueryContext, query: &Message, server: &str) -> Result<Message, DnsError> {
        let dialer = Socks5Dialer::from_settings(&self.config.proxy)?;
        let deadline = ctx.attempt_deadline(self.config.timeout);
        let query = query.clone();
        let server = server.to_string();

        ctx.run_detached(with_io_deadline(deadline, async move {
            let mut stream = dialer.dial(&server).await?;
            let result = exchange_framed(&mut stream, &query).await;
            let _ = stream.shutdown().await;
            result
        }))
        .await
    }
}

#[async_trait]
impl Transport for UdpTcpTransport {
    fn name(&self) -> &'static str {
        "udp/tcp"
    }

    async fn exchange(&self, ctx: &QueryContext, query: &Message, server: &str) -> Result<Message, DnsError> {
        match self.config.proxy.kind {
            ProxyKind::None => {
                let deadline = ctx.attempt_deadline(self.config.timeout);
                debug!(server, protocol = %self.config.protocol, "Direct exchange");
                let exchange = async {
                    match self.config.protocol {
                        Protocol::Tcp => Self::exchange_tcp(query, server).await,
                        _ => Self::exchange_udp(query, server).await,
                    }
                };
                ctx.run(with_io_deadline(deadline, exchange)).await
            }
            ProxyKind::Socks5 => {
                debug!(server, proxy = %self.config.proxy.address, "Tunneled exchange");
                self.exchange_tunneled(ctx, query, server).await
            }
            ProxyKind::Http => Err(DnsError::UnsupportedProxy {
                transport: "udp/tcp",
                proxy: ProxyKind::Http.to_string(),
            }),
        }
    }
}

async fn resolve_server(server: &str) -> Result<SocketAddr, DnsError> {
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    lookup_host(server)
        .await
        .map_err(|e| DnsError::Transport(format!("failed to resolve server address {}: {}", server, e)))?
        .next()
        .ok_or_else(|| DnsError::Transport(format!("no address found for server {}", server)))
}
