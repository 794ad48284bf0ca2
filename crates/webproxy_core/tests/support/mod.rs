#![allow(dead_code)]

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use webproxy_cache::ObjectCache;
use webproxy_config::ProxyConfig;
use webproxy_core::{Connect, Master, Proxy};
use webproxy_http::Target;

/// Origin server that answers every request with the same bytes and
/// remembers what it was sent.
pub struct StubOrigin {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
    handle: JoinHandle<()>,
}

impl StubOrigin {
    pub async fn respond_with(response: impl Into<Vec<u8>>) -> io::Result<Self> {
        let response = Arc::new(response.into());
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let hits = hits.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let response = response.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let req = read_until_double_crlf(&mut stream).await;
                        requests.lock().unwrap().push(req);
                        let _ = stream.write_all(&response).await;
                        let _ = stream.shutdown().await;
                    });
                }
            })
        };

        Ok(Self {
            addr,
            hits,
            requests,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubOrigin {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Sends every origin connection to one fixed address, whatever the host.
pub struct FixedConnector {
    addr: SocketAddr,
    pub targets: Arc<Mutex<Vec<Target>>>,
}

impl FixedConnector {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            targets: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Connect for FixedConnector {
    type Stream = TcpStream;

    async fn connect(&self, target: &Target) -> io::Result<TcpStream> {
        self.targets.lock().unwrap().push(target.clone());
        TcpStream::connect(self.addr).await
    }
}

/// A running proxy on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub cache: Arc<ObjectCache>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestProxy {
    pub async fn start<C: Connect>(connector: C) -> io::Result<Self> {
        Self::start_with_cache(connector, Arc::new(ObjectCache::default())).await
    }

    pub async fn start_with_cache<C: Connect>(
        connector: C,
        cache: Arc<ObjectCache>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let proxy = Arc::new(Proxy::with_connector(cache.clone(), connector));
        let master = Master::with_proxy(ProxyConfig::new(addr.port()), proxy);
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(master.serve(listener, async {
            let _ = stopped.await;
        }));
        Ok(Self {
            addr,
            cache,
            stop: Some(stop),
            handle,
        })
    }

    /// Sends `request`, half-closes, and returns everything the proxy wrote.
    pub async fn exchange(&self, request: &[u8]) -> io::Result<Vec<u8>> {
        let mut stream = TcpStream::connect(self.addr).await?;
        stream.write_all(request).await?;
        stream.shutdown().await?;
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await?;
        Ok(out)
    }

    pub async fn stop(mut self) -> anyhow::Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        (&mut self.handle).await?
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn read_until_double_crlf(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    while !buf.ends_with(b"\r\n\r\n") {
        match stream.read(&mut tmp).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
        }
    }
    buf
}

pub fn ok_response(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.0 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}
