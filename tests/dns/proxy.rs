//! Integration tests for queries tunneled through a SOCKS5 proxy.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::{
    fake_dns::FakeDnsServer,
    fake_socks5::{FakeSocks5Proxy, StallingProxy},
    local_config,
};
use polydns::dns::{DnsClient, DnsError, Protocol, ProxyCredentials, QueryContext};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_tcp_through_socks5() {
    let dns = FakeDnsServer::start(&["192.0.2.80"]).await;
    let proxy = FakeSocks5Proxy::start(None).await;
    let target = dns.tcp_addr.to_string();

    let config = local_config(Protocol::Tcp, &[target.clone()])
        .socks5_proxy(proxy.addr.to_string(), None)
        .build();
    let result = DnsClient::new(config)
        .query_a(&QueryContext::background(), "example.com")
        .await
        .unwrap();

    assert_eq!(result.records[0].value, "192.0.2.80");
    assert_eq!(proxy.targets(), vec![target]);
    assert_eq!(dns.tcp_queries(), 1);
}

#[tokio::test]
async fn test_udp_protocol_is_carried_as_stream_through_socks5() {
    let dns = FakeDnsServer::start(&["192.0.2.81"]).await;
    let proxy = FakeSocks5Proxy::start(None).await;

    // The tunnel only carries streams, so the server's TCP side answers.
    let config = local_config(Protocol::Udp, &[dns.tcp_addr.to_string()])
        .socks5_proxy(proxy.addr.to_string(), None)
        .build();
    let result = DnsClient::new(config)
        .query_a(&QueryContext::background(), "example.com")
        .await
        .unwrap();

    assert_eq!(result.records[0].value, "192.0.2.81");
    assert_eq!(dns.udp_queries(), 0);
    assert_eq!(dns.tcp_queries(), 1);
}

#[tokio::test]
async fn test_socks5_with_password() {
    let dns = FakeDnsServer::start(&["192.0.2.82"]).await;
    let proxy = FakeSocks5Proxy::start(Some(("alice", "s3cret"))).await;

    let config = local_config(Protocol::Tcp, &[dns.tcp_addr.to_string()])
        .socks5_proxy(proxy.addr.to_string(), Some(ProxyCredentials::new("alice", "s3cret")))
        .build();
    let result = DnsClient::new(config)
        .query_a(&QueryContext::background(), "example.com")
        .await
        .unwrap();
    assert_eq!(result.records[0].value, "192.0.2.82");
}

#[tokio::test]
async fn test_socks5_rejected_credentials_fail_without_fallback() {
    let dns = FakeDnsServer::start(&["192.0.2.83"]).await;
    let proxy = FakeSocks5Proxy::start(Some(("alice", "s3cret"))).await;

    let config = local_config(Protocol::Tcp, &[dns.tcp_addr.to_string()])
        .socks5_proxy(proxy.addr.to_string(), Some(ProxyCredentials::new("alice", "wrong")))
        .build();
    let err = DnsClient::new(config)
        .query_a(&QueryContext::background(), "example.com")
        .await
        .unwrap_err();

    assert!(matches!(err, DnsError::Transport(_)), "unexpected error: {:?}", err);
    assert!(proxy.targets().is_empty());
    assert_eq!(dns.tcp_queries(), 0, "no direct connection after a proxy failure");
}

#[tokio::test]
async fn test_socks5_fanout_tunnels_every_server() {
    let first = FakeDnsServer::start(&["192.0.2.90"]).await;
    let second = FakeDnsServer::start(&["192.0.2.91"]).await;
    let proxy = FakeSocks5Proxy::start(None).await;

    let servers = vec![first.tcp_addr.to_string(), second.tcp_addr.to_string()];
    let config = local_config(Protocol::Tcp, &servers)
        .socks5_proxy(proxy.addr.to_string(), None)
        .build();
    let result = DnsClient::new(config)
        .multi_query_a(&QueryContext::background(), "example.com")
        .await
        .unwrap();

    assert_eq!(result.results.len(), 2);
    assert_eq!(result.results[0].records[0].value, "192.0.2.90");
    assert_eq!(result.results[1].records[0].value, "192.0.2.91");
    let mut targets = proxy.targets();
    targets.sort();
    let mut expected = servers.clone();
    expected.sort();
    assert_eq!(targets, expected);
}

#[tokio::test]
async fn test_doh_through_socks5() {
    let doh = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&doh)
        .await;
    let proxy = FakeSocks5Proxy::start(None).await;

    let config = local_config(Protocol::Doh, &[format!("{}/dns-query", doh.uri())])
        .socks5_proxy(proxy.addr.to_string(), None)
        .build();
    let err = DnsClient::new(config)
        .query_a(&QueryContext::background(), "example.com")
        .await
        .unwrap_err();

    assert_eq!(err, DnsError::HttpStatus { status: 502, reason: "Bad Gateway".to_string() });
    assert_eq!(proxy.targets(), vec![doh.address().to_string()]);
}

#[tokio::test]
async fn test_cancel_returns_before_tunnel_closes_at_attempt_deadline() {
    let proxy = StallingProxy::start().await;

    let config = local_config(Protocol::Tcp, &["192.0.2.1:53".to_string()])
        .socks5_proxy(proxy.addr.to_string(), None)
        .timeout(Duration::from_millis(300))
        .build();
    let (ctx, cancel) = QueryContext::cancellable();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let err = DnsClient::new(config)
        .query_a(&ctx, "example.com")
        .await
        .unwrap_err();
    let returned_after = started.elapsed();

    assert_eq!(err, DnsError::Cancelled);
    assert!(returned_after < Duration::from_millis(200), "returned after {:?}", returned_after);

    // The detached dial keeps the tunnel open until the attempt deadline.
    let open_for = tokio::time::timeout(Duration::from_secs(2), proxy.closed())
        .await
        .expect("tunnel was never closed");
    assert!(open_for >= Duration::from_millis(250), "closed after {:?}", open_for);
    assert!(open_for < Duration::from_secs(1), "closed after {:?}", open_for);
}
