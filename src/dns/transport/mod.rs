//! Wire transports: UDP/TCP, DNS over TLS and DNS over HTTPS.

mod doh;
mod dot;
mod udp_tcp;

pub use doh::{doh_url, DohTransport, DNS_MESSAGE};
pub use dot::{normalize_dot_server, DotTransport, DOT_PORT};
pub use udp_tcp::UdpTcpTransport;

use crate::core::Transport;
use crate::dns::{message, ClientConfig, DnsError, Protocol};
use hickory_resolver::proto::op::Message;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

/// Selects the transport implementation for the configured protocol.
pub fn transport_for(config: Arc<ClientConfig>) -> Arc<dyn Transport> {
    match config.protocol {
        Protocol::Udp | Protocol::Tcp => Arc::new(UdpTcpTransport::new(config)),
        Protocol::Dot => Arc::new(DotTransport::new(config)),
        Protocol::Doh => Arc::new(DohTransport::new(config)),
    }
}

/// Bounds every step of `fut` by `deadline`, the stream counterpart of a
/// connection read/write deadline.
pub(crate) async fn with_io_deadline<T, F>(deadline: Instant, fut: F) -> Result<T, DnsError>
where
    F: Future<Output = Result<T, DnsError>>,
{
    match timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(DnsError::Transport("i/o timeout".to_string())),
    }
}

/// Writes `query` to a stream with the two-byte length prefix used by DNS
/// over TCP and TLS, then reads one length-prefixed answer.
pub(crate) async fn exchange_framed<S>(stream: &mut S, query: &Message) -> Result<Message, DnsError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let wire = message::encode(query)?;
    let len = u16::try_from(wire.len())
        .map_err(|_| DnsError::Encode(format!("message too large for a stream: {} bytes", wire.len())))?;

    let mut frame = Vec::with_capacity(wire.len() + 2);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&wire);
    stream.write_all(&frame).await.map_err(write_err)?;
    stream.flush().await.map_err(write_err)?;

    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await.map_err(read_err)?;
    let response_len = u16::from_be_bytes(len_buf) as usize;

    let mut response = vec![0u8; response_len];
    stream.read_exact(&mut response).await.map_err(read_err)?;
    message::decode(&response)
}

pub(crate) fn write_err(e: std::io::Error) -> DnsError {
    DnsError::Transport(format!("failed to write DNS message: {}", e))
}

pub(crate) fn read_err(e: std::io::Error) -> DnsError {
    DnsError::Transport(format!("failed to read DNS response: {}", e))
}

/// Splits `host:port`, accepting bracketed IPv6 literals. A bare IPv6
/// address is returned as a host without port.
pub(crate) fn split_host_port(addr: &str) -> (&str, Option<&str>) {
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':')),
            None => (addr, None),
        };
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => (host, Some(port)),
        _ => (addr, None),
    }
}
