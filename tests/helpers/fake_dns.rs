//! An in-process DNS server answering over UDP and TCP on localhost.

use hickory_resolver::proto::{
    op::{Message, MessageType, ResponseCode},
    rr::{
        rdata::{A, AAAA},
        RData, Record,
    },
};
use std::net::{IpAddr, SocketAddr};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

pub struct FakeDnsServer {
    pub udp_addr: SocketAddr,
    pub tcp_addr: SocketAddr,
    udp_queries: Arc<AtomicUsize>,
    tcp_queries: Arc<AtomicUsize>,
}

impl FakeDnsServer {
    /// Starts a server answering every query with `addresses`.
    pub async fn start(addresses: &[&str]) -> Self {
        Self::spawn(addresses, false).await
    }

    /// Like [`start`](Self::start), but every UDP answer is preceded by a
    /// response carrying the wrong query id.
    pub async fn start_with_decoy(addresses: &[&str]) -> Self {
        Self::spawn(addresses, true).await
    }

    pub fn udp_queries(&self) -> usize {
        self.udp_queries.load(Ordering::SeqCst)
    }

    pub fn tcp_queries(&self) -> usize {
        self.tcp_queries.load(Ordering::SeqCst)
    }

    async fn spawn(addresses: &[&str], decoy: bool) -> Self {
        let addresses: Arc<Vec<IpAddr>> =
            Arc::new(addresses.iter().map(|a| a.parse().unwrap()).collect());
        let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Self {
            udp_addr: udp.local_addr().unwrap(),
            tcp_addr: tcp.local_addr().unwrap(),
            udp_queries: Arc::new(AtomicUsize::new(0)),
            tcp_queries: Arc::new(AtomicUsize::new(0)),
        };

        let udp_queries = server.udp_queries.clone();
        let udp_addresses = addresses.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            while let Ok((len, peer)) = udp.recv_from(&mut buf).await {
                let Ok(query) = Message::from_vec(&buf[..len]) else {
                    continue;
                };
                udp_queries.fetch_add(1, Ordering::SeqCst);
                let response = answer(&query, &udp_addresses);
                if decoy {
                    let mut stale = response.clone();
                    stale.set_id(query.id().wrapping_add(1));
                    let _ = udp.send_to(&stale.to_vec().unwrap(), peer).await;
                }
                let _ = udp.send_to(&response.to_vec().unwrap(), peer).await;
            }
        });

        let tcp_queries = server.tcp_queries.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = tcp.accept().await {
                let tcp_queries = tcp_queries.clone();
                let addresses = addresses.clone();
                tokio::spawn(async move {
                    let _ = serve_stream(stream, &addresses, &tcp_queries).await;
                });
            }
        });

        server
    }
}

/// Answers one length-prefixed query read from `stream`.
pub async fn serve_stream<S>(mut stream: S, addresses: &[IpAddr], queries: &AtomicUsize) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let mut body = vec![0u8; u16::from_be_bytes(len_buf) as usize];
    stream.read_exact(&mut body).await?;
    let query = Message::from_vec(&body).map_err(std::io::Error::other)?;
    queries.fetch_add(1, Ordering::SeqCst);

    let wire = answer(&query, addresses).to_vec().map_err(std::io::Error::other)?;
    stream.write_all(&(wire.len() as u16).to_be_bytes()).await?;
    stream.write_all(&wire).await?;
    stream.flush().await
}

/// Builds the response to `query` with one A/AAAA record per address.
pub fn answer(query: &Message, addresses: &[IpAddr]) -> Message {
    let mut response = Message::new();
    response
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_response_code(ResponseCode::NoError)
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true);
    response.add_queries(query.queries().to_vec());

    if let Some(question) = query.queries().first() {
        for address in addresses {
            let rdata = match address {
                IpAddr::V4(v4) => RData::A(A(*v4)),
                IpAddr::V6(v6) => RData::AAAA(AAAA(*v6)),
            };
            response.add_answer(Record::from_rdata(question.name().clone(), 60, rdata));
        }
    }
    response
}
