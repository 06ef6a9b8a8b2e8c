use std::net::{Ipv4Addr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;

pub const LOCALHOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// Returns a loopback port that nothing is listening on.
pub fn closed_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind((LOCALHOST, 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// A listener that completes TCP handshakes but never speaks SSH.
/// Connections queue in the backlog; nothing is ever accepted.
pub fn silent_listener() -> anyhow::Result<(TcpListener, u16)> {
    let listener = TcpListener::bind((LOCALHOST, 0))?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

/// TCP relay in front of a local server that holds each new connection for
/// `delay` before forwarding anything, and counts client sockets that are
/// still open.
pub struct SlowRelay {
    pub port: u16,
    open: Arc<AtomicUsize>,
}

impl SlowRelay {
    pub async fn start(upstream: u16, delay: Duration) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind((LOCALHOST, 0)).await?;
        let port = listener.local_addr()?.port();
        let open = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&open);
        tokio::spawn(async move {
            while let Ok((client, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    relay(client, upstream, delay).await;
                    counter.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        Ok(Self { port, open })
    }

    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

/// Returns once the client side has closed.
async fn relay(client: TcpStream, upstream: u16, delay: Duration) {
    tokio::time::sleep(delay).await;
    let (mut client_rx, mut client_tx) = client.into_split();
    let Ok(server) = TcpStream::connect((LOCALHOST, upstream)).await else {
        let _ = tokio::io::copy(&mut client_rx, &mut tokio::io::sink()).await;
        return;
    };
    let (mut server_rx, mut server_tx) = server.into_split();

    let downstream = tokio::spawn(async move {
        let _ = tokio::io::copy(&mut server_rx, &mut client_tx).await;
    });
    let _ = tokio::io::copy(&mut client_rx, &mut server_tx).await;
    downstream.abort();
}
