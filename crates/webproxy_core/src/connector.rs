use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;
use webproxy_http::Target;

/// Opens the connection to an origin server.
///
/// The worker only ever talks to origins through this trait, so tests can
/// point every host at a local stub.
pub trait Connect: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn connect(&self, target: &Target) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Resolves `host:port` and connects over TCP. No connect timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connect for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, target: &Target) -> io::Result<TcpStream> {
        debug!(target: "webproxy::proxy", origin = %target.authority(), "Connecting to origin");
        TcpStream::connect((target.host.as_str(), target.port)).await
    }
}
