use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// TCP listener that accepts and immediately drops connections.
pub struct FakeOtgEndpoint {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl FakeOtgEndpoint {
    /// Listen on an ephemeral localhost port.
    pub async fn start() -> Result<Self> {
        Self::start_on(0).await
    }

    pub async fn start_on(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = accepted.clone();
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((_stream, peer)) => {
                        counter.fetch_add(1, Ordering::SeqCst);
                        log::debug!("Fake OTG endpoint accepted connection from {peer}");
                    }
                    Err(e) => {
                        log::warn!("Fake OTG endpoint accept failed: {e}");
                        break;
                    }
                }
            }
        });

        log::info!("Fake OTG endpoint listening on {addr}");
        Ok(Self {
            addr,
            accepted,
            handle,
        })
    }

    /// `host:port` as it would appear in the harness configuration.
    pub fn location(&self) -> String {
        self.addr.to_string()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for FakeOtgEndpoint {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
