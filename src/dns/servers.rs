//! Curated default resolver lists, one per protocol family.

use crate::dns::Protocol;

const UDP_SERVERS: &[&str] = &[
    "223.5.5.5:53",
    "223.6.6.6:53",
    "114.114.114.114:53",
    "114.114.115.115:53",
    "1.12.12.12:53",
    "120.53.53.53:53",
    "119.29.29.29:53",
    "182.254.116.116:53",
    "8.8.8.8:53",
    "1.1.1.1:53",
];

const DOT_SERVERS: &[&str] = &[
    "223.5.5.5:853",
    "223.6.6.6:853",
    "1.12.12.12:853",
    "120.53.53.53:853",
    "8.8.8.8:853",
    "1.1.1.1:853",
];

const DOH_SERVERS: &[&str] = &[
    "https://dns.alidns.com/dns-query",
    "https://doh.pub/dns-query",
    "https://1.12.12.12/dns-query",
    "https://120.53.53.53/dns-query",
    "https://1.1.1.1/dns-query",
];

/// Returns the default server list for `protocol`. UDP and TCP share a list.
pub fn default_servers(protocol: Protocol) -> Vec<String> {
    let servers = match protocol {
        Protocol::Udp | Protocol::Tcp => UDP_SERVERS,
        Protocol::Dot => DOT_SERVERS,
        Protocol::Doh => DOH_SERVERS,
    };
    servers.iter().map(|s| s.to_string()).collect()
}
