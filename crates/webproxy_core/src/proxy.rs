use std::sync::Arc;

use webproxy_cache::ObjectCache;

use crate::connector::{Connect, TcpConnector};

/// =======================================================
/// PROXY STATE
/// =======================================================
///
/// Everything a worker shares with other workers: the object cache
/// and the way to reach origins. Built once by the master and handed
/// to each connection as `Arc<Proxy>`.
pub struct Proxy<C = TcpConnector> {
    cache: Arc<ObjectCache>,
    connector: C,
}

impl Proxy<TcpConnector> {
    pub fn new(cache: Arc<ObjectCache>) -> Self {
        Self::with_connector(cache, TcpConnector)
    }
}

impl<C: Connect> Proxy<C> {
    pub fn with_connector(cache: Arc<ObjectCache>, connector: C) -> Self {
        Self { cache, connector }
    }

    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}
