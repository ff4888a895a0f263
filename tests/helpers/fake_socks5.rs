//! A minimal SOCKS5 proxy (RFC 1928/1929) supporting CONNECT only.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{copy_bidirectional, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::Instant;

const VERSION: u8 = 0x05;
const NO_AUTH: u8 = 0x00;
const USER_PASS: u8 = 0x02;
const NO_ACCEPTABLE: u8 = 0xff;

pub struct FakeSocks5Proxy {
    pub addr: SocketAddr,
    targets: Arc<Mutex<Vec<String>>>,
}

impl FakeSocks5Proxy {
    /// Starts a proxy. With `credentials`, clients must authenticate with
    /// exactly that username and password.
    pub async fn start(credentials: Option<(&str, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let targets = Arc::new(Mutex::new(Vec::new()));
        let credentials = credentials.map(|(u, p)| (u.to_string(), p.to_string()));

        let recorded = targets.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let credentials = credentials.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, credentials, recorded).await;
                });
            }
        });

        Self { addr, targets }
    }

    /// The CONNECT targets requested so far, as `host:port`.
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

/// A proxy that accepts one connection and never answers the handshake.
pub struct StallingProxy {
    pub addr: SocketAddr,
    closed: oneshot::Receiver<Duration>,
}

impl StallingProxy {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (closed_tx, closed) = oneshot::channel();

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let accepted = Instant::now();
            let mut buf = [0u8; 512];
            while let Ok(n) = stream.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
            let _ = closed_tx.send(accepted.elapsed());
        });

        Self { addr, closed }
    }

    /// Waits until the client closes its connection and returns how long
    /// it stayed open.
    pub async fn closed(self) -> Duration {
        self.closed.await.unwrap()
    }
}

async fn serve(
    mut client: TcpStream,
    credentials: Option<(String, String)>,
    targets: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    // Method negotiation
    let mut header = [0u8; 2];
    client.read_exact(&mut header).await?;
    let mut methods = vec![0u8; header[1] as usize];
    client.read_exact(&mut methods).await?;

    let wanted = if credentials.is_some() { USER_PASS } else { NO_AUTH };
    if !methods.contains(&wanted) {
        client.write_all(&[VERSION, NO_ACCEPTABLE]).await?;
        return Ok(());
    }
    client.write_all(&[VERSION, wanted]).await?;

    if let Some((username, password)) = credentials {
        let mut ver_ulen = [0u8; 2];
        client.read_exact(&mut ver_ulen).await?;
        let mut user = vec![0u8; ver_ulen[1] as usize];
        client.read_exact(&mut user).await?;
        let plen = client.read_u8().await?;
        let mut pass = vec![0u8; plen as usize];
        client.read_exact(&mut pass).await?;

        let ok = user == username.as_bytes() && pass == password.as_bytes();
        client.write_all(&[0x01, if ok { 0x00 } else { 0x01 }]).await?;
        if !ok {
            return Ok(());
        }
    }

    // CONNECT request
    let mut request = [0u8; 4];
    client.read_exact(&mut request).await?;
    let host = match request[3] {
        0x01 => {
            let mut octets = [0u8; 4];
            client.read_exact(&mut octets).await?;
            Ipv4Addr::from(octets).to_string()
        }
        0x03 => {
            let len = client.read_u8().await?;
            let mut name = vec![0u8; len as usize];
            client.read_exact(&mut name).await?;
            String::from_utf8_lossy(&name).into_owned()
        }
        0x04 => {
            let mut octets = [0u8; 16];
            client.read_exact(&mut octets).await?;
            format!("[{}]", Ipv6Addr::from(octets))
        }
        _ => return Ok(()),
    };
    let port = client.read_u16().await?;
    let target = format!("{}:{}", host, port);
    targets.lock().unwrap().push(target.clone());

    let mut upstream = match TcpStream::connect(&target).await {
        Ok(stream) => stream,
        Err(_) => {
            // Host unreachable
            client.write_all(&[VERSION, 0x04, 0x00, 0x01, 0, 0, 0, 0, 0, 0]).await?;
            return Ok(());
        }
    };
    client.write_all(&[VERSION, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]).await?;

    let _ = copy_bidirectional(&mut client, &mut upstream).await;
    Ok(())
}
