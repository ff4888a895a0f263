pub mod client;
pub mod config;
pub mod context;
pub mod fanout;
pub mod message;
pub mod proxy;
pub mod retry;
pub mod servers;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod tls;
pub mod transport;

use thiserror::Error;

pub use client::DnsClient;
pub use config::{ClientConfig, ClientConfigBuilder, Protocol};
pub use context::{CancelHandle, QueryContext};
pub use proxy::{ProxyCredentials, ProxyKind, ProxySettings, Socks5Dialer};
pub use retry::RetryPolicy;
pub use servers::default_servers;
pub use tls::TlsSettings;
pub use transport::{transport_for, DohTransport, DotTransport, UdpTcpTransport};
pub use crate::core::Transport;

/// Errors produced while configuring or executing a DNS query.
///
/// Configuration errors are fatal and never retried. Transport and
/// application-layer errors are retried by the [`RetryPolicy`]. Cancellation
/// errors end a query immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("no DNS servers configured")]
    NoServers,

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("unsupported proxy type for {transport}: {proxy}")]
    UnsupportedProxy {
        transport: &'static str,
        proxy: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {status} {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("failed to encode DNS message: {0}")]
    Encode(String),

    #[error("failed to decode DNS response: {0}")]
    Decode(String),

    #[error("DNS query cancelled")]
    Cancelled,

    #[error("DNS query deadline exceeded")]
    DeadlineExceeded,
}

impl DnsError {
    /// Returns `true` for errors caused by the client configuration itself.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DnsError::NoServers
                | DnsError::UnsupportedProtocol(_)
                | DnsError::UnsupportedProxy { .. }
                | DnsError::InvalidConfig(_)
        )
    }

    /// Returns `true` when the caller's deadline or cancellation signal fired.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DnsError::Cancelled | DnsError::DeadlineExceeded)
    }

    /// Returns `true` if another attempt may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        !self.is_config_error() && !self.is_cancellation()
    }
}
