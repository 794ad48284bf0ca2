use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::worker::{ClientStream, ConnOutcome, handle_connection};
use crate::{Connect, Proxy};

/// Pause after a failed `accept` so a full fd table does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Source of client connections for the accept loop.
pub(crate) trait Acceptor: Send + 'static {
    type Stream: ClientStream + 'static;

    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(&*self).await
    }
}

pub(crate) async fn bind_listener(listen_addr: &str) -> anyhow::Result<TcpListener> {
    info!(
        target: "webproxy::master",
        listen = %listen_addr,
        "Binding listener"
    );

    match TcpListener::bind(listen_addr).await {
        Ok(listener) => {
            info!(
                target: "webproxy::master",
                listen = %listen_addr,
                "Bind() successful"
            );
            Ok(listener)
        }
        Err(e) => {
            error!(
                target: "webproxy::master",
                listen = %listen_addr,
                error = ?e,
                "Failed to bind listener"
            );
            Err(e.into())
        }
    }
}

/// Accepts until the caller drops it, one detached task per connection.
/// A failed `accept` is logged and retried after a short pause.
#[instrument(skip_all, fields(listen = %listen_addr))]
pub(crate) async fn accept_loop<A, C>(mut listener: A, listen_addr: String, proxy: Arc<Proxy<C>>)
where
    A: Acceptor,
    C: Connect,
{
    info!(
        target: "webproxy::master",
        listen = %listen_addr,
        "accept_loop started for listening socket"
    );

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(
                    target: "webproxy::master",
                    listen = %listen_addr,
                    error = ?e,
                    "Failed to accept connection; retrying"
                );
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        debug!(
            target: "webproxy::master",
            client_addr = %addr,
            "Connection accepted"
        );

        let proxy = proxy.clone();
        let span = tracing::info_span!(
            "worker_connection",
            client_addr = %addr,
            listen = %listen_addr,
        );

        // The socket moves into the task and is closed when it ends,
        // whether the handler returns, errors or panics.
        tokio::spawn(
            async move {
                debug!(
                    target: "webproxy::worker",
                    "Worker spawned for incoming connection"
                );

                match handle_connection(stream, proxy.clone()).await {
                    Ok(ConnOutcome::Dropped(reason)) => {
                        debug!(
                            target: "webproxy::worker",
                            ?reason,
                            "Connection dropped without response"
                        );
                    }
                    Ok(_) => {
                        let stats = proxy.cache().stats();
                        debug!(
                            target: "webproxy::cache",
                            hits = stats.hits,
                            misses = stats.misses,
                            entries = stats.entries,
                            current_size = stats.current_size,
                            "Cache stats"
                        );
                    }
                    Err(e) => {
                        warn!(
                            target: "webproxy::worker",
                            error = ?e,
                            "Error while handling connection"
                        );
                    }
                }
            }
            .instrument(span),
        );
    }
}
