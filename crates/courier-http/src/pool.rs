//! Connection manager for pooled execution

use crate::client::build_reqwest;
use crate::config::ClientParams;
use crate::error::HttpResult;
use crate::scheme::SchemeRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shutdown flag shared between a manager and the client handles built on it.
#[derive(Debug, Clone)]
pub(crate) struct PoolGuard(Arc<AtomicBool>);

impl PoolGuard {
    pub(crate) fn is_shut_down(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Owns the pooled reqwest client shared by every request in pooled mode.
///
/// The underlying client is built on first use. After [`shutdown`](Self::shutdown)
/// every handle built on this manager refuses to execute.
#[derive(Debug)]
pub struct ConnectionManager {
    params: ClientParams,
    registry: SchemeRegistry,
    client: Option<reqwest::Client>,
    shutdown: Arc<AtomicBool>,
}

impl ConnectionManager {
    pub fn new(params: ClientParams, registry: SchemeRegistry) -> Self {
        debug!(schemes = ?registry.names(), "Constructing connection manager");
        Self {
            params,
            registry,
            client: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The pooled client, built on the first call
    pub(crate) fn client(&mut self) -> HttpResult<reqwest::Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = build_reqwest(&self.params, &self.registry, true)?;
        debug!("Pooled client built");
        self.client = Some(client.clone());
        Ok(client)
    }

    pub(crate) fn guard(&self) -> PoolGuard {
        PoolGuard(self.shutdown.clone())
    }

    /// Close the pool. Idle connections are dropped with the last handle.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.client = None;
        debug!("Connection manager shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}
