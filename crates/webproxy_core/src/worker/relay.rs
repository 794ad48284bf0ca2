use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};
use webproxy_http::LineReader;

/// Bytes read from the origin per iteration.
pub(crate) const RELAY_CHUNK: usize = 8192;

/// Result of streaming one origin response to the client.
#[derive(Debug)]
pub(crate) struct Relayed {
    pub(crate) total: usize,
    /// Copy of the response while it still fits the object ceiling.
    staging: Option<BytesMut>,
}

impl Relayed {
    /// The full response, if it was small enough to keep.
    pub(crate) fn into_cacheable(self) -> Option<Bytes> {
        match self.staging {
            Some(buf) if !buf.is_empty() => Some(buf.freeze()),
            _ => None,
        }
    }
}

/// Copies the origin's response to the client chunk by chunk until the
/// origin closes, staging at most `max_object_size` bytes for the cache.
///
/// Errors on either side abort the relay; nothing is staged for the cache
/// in that case because the caller never sees a `Relayed`.
pub(crate) async fn relay_response<O, W>(
    origin: O,
    client: &mut W,
    max_object_size: usize,
) -> std::io::Result<Relayed>
where
    O: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut origin = LineReader::new(origin);
    let mut staging = Some(BytesMut::new());
    let mut total = 0usize;

    loop {
        let chunk = origin.read_chunk(RELAY_CHUNK).await?;
        if chunk.is_empty() {
            break;
        }

        client.write_all(&chunk).await?;
        total += chunk.len();
        trace!(target: "webproxy::proxy", chunk = chunk.len(), total, "Relayed chunk");

        if let Some(buf) = staging.as_mut() {
            if buf.len() + chunk.len() <= max_object_size {
                buf.extend_from_slice(&chunk);
            } else {
                debug!(
                    target: "webproxy::proxy",
                    total,
                    max_object_size,
                    "Response exceeds object ceiling; relaying without caching"
                );
                staging = None;
            }
        }
    }

    client.flush().await?;
    debug!(target: "webproxy::proxy", total, "Origin closed; relay complete");

    Ok(Relayed { total, staging })
}
