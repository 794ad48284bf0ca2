use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use webproxy_cache::ObjectCache;
use webproxy_config::ProxyConfig;

use crate::{Connect, Proxy, TcpConnector};

mod accept;

use accept::{accept_loop, bind_listener};

/// Owns the listening socket and the shared proxy state.
pub struct Master<C = TcpConnector> {
    cfg: Arc<ProxyConfig>,
    proxy: Arc<Proxy<C>>,
}

impl Master<TcpConnector> {
    pub fn new(cfg: ProxyConfig) -> Self {
        let cache = Arc::new(ObjectCache::new(cfg.limits));
        let proxy = Arc::new(Proxy::new(cache));
        Self::with_proxy(cfg, proxy)
    }
}

impl<C: Connect> Master<C> {
    pub fn with_proxy(cfg: ProxyConfig, proxy: Arc<Proxy<C>>) -> Self {
        Self {
            cfg: Arc::new(cfg),
            proxy,
        }
    }

    /// Binds the configured port and serves until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(target: "webproxy::master", "Starting WEBPROXY MASTER");
        self.cfg.print();

        let listener = bind_listener(&self.cfg.listen_addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    /// In-flight workers are detached and keep running.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let listen_addr = match listener.local_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => self.cfg.listen_addr(),
        };

        info!(
            target: "webproxy::master",
            listen = %listen_addr,
            "Master initialized. Waiting for incoming connections (Ctrl+C to stop)..."
        );

        tokio::select! {
            () = accept_loop(listener, listen_addr.clone(), self.proxy.clone()) => {}
            () = shutdown => {
                warn!(
                    target: "webproxy::master",
                    listen = %listen_addr,
                    "Shutdown requested; no longer accepting connections"
                );
            }
        }
        Ok(())
    }
}
