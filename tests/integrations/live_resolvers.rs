//! Queries against public resolvers. Requires network access; run with
//! `--features live-tests`.

use polydns::dns::{ClientConfig, DnsClient, Protocol, QueryContext};
use std::time::Duration;

async fn resolve_with(protocol: Protocol, servers: &[&str]) {
    let config = ClientConfig::builder()
        .protocol(protocol)
        .servers(servers.iter().copied())
        .timeout(Duration::from_secs(5))
        .retries(1)
        .build();
    let ctx = QueryContext::with_timeout(Duration::from_secs(20));

    let result = DnsClient::new(config)
        .multi_query_a(&ctx, "example.com")
        .await
        .unwrap();

    assert_eq!(result.results.len(), servers.len());
    assert!(!result.all_failed(), "every {} server failed: {:?}", protocol, result.results);
    assert!(!result.all_ips.is_empty());
}

#[tokio::test]
async fn test_live_udp() {
    resolve_with(Protocol::Udp, &["8.8.8.8:53", "1.1.1.1:53"]).await;
}

#[tokio::test]
async fn test_live_tcp() {
    resolve_with(Protocol::Tcp, &["8.8.8.8:53", "1.1.1.1:53"]).await;
}

#[tokio::test]
async fn test_live_dot() {
    resolve_with(Protocol::Dot, &["1.1.1.1", "8.8.8.8:853"]).await;
}

#[tokio::test]
async fn test_live_doh() {
    resolve_with(Protocol::Doh, &["https://1.1.1.1/dns-query", "dns.google"]).await;
}

#[tokio::test]
async fn test_live_mx_single_server() {
    let client = DnsClient::new(ClientConfig::builder().servers(["8.8.8.8:53"]).build());
    let result = client
        .query_mx(&QueryContext::with_timeout(Duration::from_secs(10)), "gmail.com")
        .await
        .unwrap();
    assert!(result.records.iter().all(|r| r.value.split_once(' ').is_some()));
}
