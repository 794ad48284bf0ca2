//! Per-connection proxy handler.
//!
//! Reads one absolute-form request, answers it from the cache or forwards
//! it to the origin, then closes. Every failure path closes the client
//! connection without writing an HTTP response.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};
use webproxy_http::{LineReader, RequestError, build_origin_request, read_request_head, uri};

use crate::{Connect, Proxy};

mod relay;

use relay::relay_response;

pub trait ClientStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ClientStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Where a connection is in its lifetime; logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Accepted,
    ReadRequest,
    Parsed,
    CacheHit,
    ServeCached,
    CacheMiss,
    ConnectOrigin,
    ForwardRequest,
    RelayResponse,
    MaybeStore,
    Closed,
}

/// Why a connection was closed without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    EmptyRequest,
    MalformedRequest,
    UnsupportedMethod,
    MalformedUri,
    OriginUnreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnOutcome {
    ServedFromCache { bytes: usize },
    Relayed { bytes: usize, cached: bool },
    Dropped(DropReason),
}

fn enter(state: ConnState) {
    debug!(target: "webproxy::worker", ?state, "Connection state");
}

/// Serves one client connection from request line to close.
///
/// The peer address is expected on the caller's span.
#[instrument(skip_all)]
pub async fn handle_connection<S, C>(stream: S, proxy: Arc<Proxy<C>>) -> anyhow::Result<ConnOutcome>
where
    S: ClientStream,
    C: Connect,
{
    enter(ConnState::Accepted);
    let mut client = LineReader::new(stream);

    let outcome = serve(&mut client, &proxy).await;
    enter(ConnState::Closed);

    if let Ok(outcome) = &outcome {
        info!(target: "webproxy::worker", ?outcome, "Finished handling connection");
    }
    outcome
}

async fn serve<S, C>(client: &mut LineReader<S>, proxy: &Proxy<C>) -> anyhow::Result<ConnOutcome>
where
    S: ClientStream,
    C: Connect,
{
    // 1) Read request line + headers
    enter(ConnState::ReadRequest);
    let head = match read_request_head(client).await {
        Ok(head) => head,
        Err(RequestError::Empty) => {
            debug!(target: "webproxy::worker", "Client sent nothing; closing");
            return Ok(ConnOutcome::Dropped(DropReason::EmptyRequest));
        }
        Err(RequestError::Io(e)) => return Err(e.into()),
        Err(e) => {
            warn!(target: "webproxy::worker", error = %e, "Unreadable request; closing");
            return Ok(ConnOutcome::Dropped(DropReason::MalformedRequest));
        }
    };

    // 2) Method + absolute URI
    enter(ConnState::Parsed);
    if !head.is_get() {
        warn!(
            target: "webproxy::worker",
            method = %head.method,
            "Proxy does not implement this method; closing"
        );
        return Ok(ConnOutcome::Dropped(DropReason::UnsupportedMethod));
    }

    let key = uri::strip_leading_slash(&head.uri);
    let target = match uri::parse(key) {
        Ok(target) => target,
        Err(e) => {
            warn!(target: "webproxy::worker", error = %e, "URI parsing failed; closing");
            return Ok(ConnOutcome::Dropped(DropReason::MalformedUri));
        }
    };

    debug!(
        target: "webproxy::worker",
        cache_key = %key,
        origin = %target.authority(),
        path = %target.path,
        "Parsed proxy request"
    );

    // 3) Cache
    if let Some(payload) = proxy.cache().find(key) {
        enter(ConnState::CacheHit);
        enter(ConnState::ServeCached);
        let out = client.get_mut();
        out.write_all(&payload).await?;
        out.flush().await?;
        info!(target: "webproxy::worker", cache_key = %key, bytes = payload.len(), "Served from cache");
        return Ok(ConnOutcome::ServedFromCache {
            bytes: payload.len(),
        });
    }
    enter(ConnState::CacheMiss);

    // 4) Origin
    enter(ConnState::ConnectOrigin);
    let mut origin = match proxy.connector().connect(&target).await {
        Ok(origin) => origin,
        Err(e) => {
            warn!(
                target: "webproxy::proxy",
                origin = %target.authority(),
                error = %e,
                "Connection to origin failed; closing"
            );
            return Ok(ConnOutcome::Dropped(DropReason::OriginUnreachable));
        }
    };

    enter(ConnState::ForwardRequest);
    let request = build_origin_request(&target, &head.headers);
    origin.write_all(&request).await?;
    origin.flush().await?;

    enter(ConnState::RelayResponse);
    let max_object_size = proxy.cache().limits().max_object_size();
    let relayed = relay_response(origin, client.get_mut(), max_object_size).await?;

    enter(ConnState::MaybeStore);
    let bytes = relayed.total;
    let cached = match relayed.into_cacheable() {
        Some(payload) => {
            proxy.cache().store(key, payload);
            true
        }
        None => {
            debug!(
                target: "webproxy::worker",
                cache_key = %key,
                bytes,
                max_object_size,
                "Response not cacheable"
            );
            false
        }
    };

    Ok(ConnOutcome::Relayed { bytes, cached })
}
