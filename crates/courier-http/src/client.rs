//! Client handle that executes requests

use crate::config::{ClientParams, ExecutionMode};
use crate::error::{HttpError, HttpResult};
use crate::pool::PoolGuard;
use crate::request::Request;
use crate::response::HttpResponse;
use crate::scheme::SchemeRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Build a reqwest client from the facade parameters.
///
/// `pooled == false` disables idle connection reuse so that every request
/// gets its own connection.
pub(crate) fn build_reqwest(
    params: &ClientParams,
    registry: &SchemeRegistry,
    pooled: bool,
) -> HttpResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(&params.user_agent);

    if let Some(timeout) = params.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = params.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    if pooled {
        builder = builder
            .pool_max_idle_per_host(params.pool_max_idle_per_host)
            .pool_idle_timeout(params.pool_idle_timeout);
    } else {
        builder = builder.pool_max_idle_per_host(0);
    }

    if registry.https_only() {
        builder = builder.https_only(true);
    }

    // Danger: Accept invalid certificates (testing only)
    if params.danger_accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}

/// Ready-to-use client handle.
///
/// Cloning is cheap; clones share the same underlying connection pool.
/// In pooled mode the handle is `Send + Sync` and may be used from many
/// tasks at once. A single-threaded handle must not be shared.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

struct HttpClientInner {
    client: reqwest::Client,
    registry: SchemeRegistry,
    mode: ExecutionMode,
    pool: Option<PoolGuard>,
}

impl HttpClient {
    pub(crate) fn pooled(client: reqwest::Client, registry: SchemeRegistry, pool: PoolGuard) -> Self {
        Self {
            inner: Arc::new(HttpClientInner {
                client,
                registry,
                mode: ExecutionMode::Pooled,
                pool: Some(pool),
            }),
        }
    }

    pub(crate) fn single(client: reqwest::Client, registry: SchemeRegistry) -> Self {
        Self {
            inner: Arc::new(HttpClientInner {
                client,
                registry,
                mode: ExecutionMode::SingleThreaded,
                pool: None,
            }),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.inner.mode
    }

    /// True when both handles refer to the same client instance
    pub fn same_as(&self, other: &HttpClient) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Execute a request.
    ///
    /// The request is consumed by this call: a second execution fails with
    /// [`HttpError::InvalidRequest`]. Aborting the request, before or during
    /// the call, fails it with [`HttpError::Aborted`].
    pub async fn execute(&self, request: &Request) -> HttpResult<HttpResponse> {
        debug!(method = %request.method(), url = %request.url(), "Executing request");

        let result = self.send(request).await;
        if let Err(e) = &result {
            error!(
                method = %request.method(),
                category = ?e.category(),
                "Request failed: {}",
                e.sanitized_message()
            );
        }
        result
    }

    async fn send(&self, request: &Request) -> HttpResult<HttpResponse> {
        if request.is_aborted() {
            return Err(HttpError::Aborted(request.url().to_string()));
        }
        request.mark_executed()?;

        let scheme = request.url().scheme();
        if !self.inner.registry.supports(scheme) {
            return Err(HttpError::UnsupportedScheme(scheme.to_string()));
        }
        if self.inner.pool.as_ref().is_some_and(PoolGuard::is_shut_down) {
            return Err(HttpError::PoolShutdown);
        }

        let start = Instant::now();
        let send = request.to_reqwest(&self.inner.client).send();

        let response = tokio::select! {
            biased;
            _ = request.cancellation().cancelled() => {
                return Err(HttpError::Aborted(request.url().to_string()));
            }
            response = send => response?,
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        Ok(HttpResponse::new(response, latency_ms))
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("mode", &self.inner.mode)
            .field("schemes", &self.inner.registry.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemeSupport;
    use crate::request::HttpMethod;
    use url::Url;

    fn single(support: SchemeSupport) -> HttpClient {
        let registry = SchemeRegistry::with_support(support);
        let client = build_reqwest(&ClientParams::default(), &registry, false).unwrap();
        HttpClient::single(client, registry)
    }

    #[test]
    fn test_clone_is_same_client() {
        let client = single(SchemeSupport::Both);
        let other = client.clone();
        assert!(client.same_as(&other));
        assert!(!client.same_as(&single(SchemeSupport::Both)));
        assert_eq!(client.mode(), ExecutionMode::SingleThreaded);
    }

    #[tokio::test]
    async fn test_unregistered_scheme_rejected() {
        let client = single(SchemeSupport::Https);
        let request = Request::new(HttpMethod::Get, Url::parse("http://127.0.0.1:1/").unwrap());
        let err = client.execute(&request).await.unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedScheme(s) if s == "http"));
    }

    #[tokio::test]
    async fn test_aborted_request_fails_fast() {
        let client = single(SchemeSupport::Both);
        let request = Request::new(HttpMethod::Get, Url::parse("http://127.0.0.1:1/").unwrap());
        request.abort();
        let err = client.execute(&request).await.unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(err, HttpError::Aborted(_)));
    }
}
