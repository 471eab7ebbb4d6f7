//! Request facade: configuration, client acquisition and verb builders

use crate::client::{build_reqwest, HttpClient};
use crate::config::{ExecutionMode, FacadeConfig};
use crate::error::{HttpError, HttpResult};
use crate::pool::ConnectionManager;
use crate::request::{FormBody, HttpMethod, Request};
use crate::response::HttpResponse;
use crate::scheme::SchemeRegistry;
use parking_lot::Mutex;
use tracing::{debug, error};
use url::Url;

/// Empty field set for body-bearing verbs
pub const NO_FIELDS: &[(&str, &str)] = &[];

/// Configurable front end over the HTTP client.
///
/// # Example
///
/// ```ignore
/// use courier_http::{RequestFacade, NO_FIELDS};
///
/// let facade = RequestFacade::complete();
/// let client = facade.acquire_client()?;
/// let request = facade.post("http://localhost:8081", &[("name", "value")])?;
/// let response = client.execute(&request).await?;
/// let body = facade.drain_to_string(response, &request).await?;
/// facade.release();
/// ```
pub struct RequestFacade {
    config: FacadeConfig,
    registry: SchemeRegistry,
    state: Mutex<FacadeState>,
}

#[derive(Default)]
struct FacadeState {
    manager: Option<ConnectionManager>,
    client: Option<HttpClient>,
}

impl RequestFacade {
    /// Apply `config` in order: parameters, scheme registry, scheme
    /// registration, then pool setup (or teardown for single mode).
    pub fn new(config: FacadeConfig) -> Self {
        debug!(params = ?config.params, "Setting up client parameters");
        let registry = SchemeRegistry::with_support(config.schemes);
        let mode = config.mode;
        let facade = Self {
            config,
            registry,
            state: Mutex::new(FacadeState::default()),
        };
        facade.select(mode);
        facade
    }

    /// HTTP only, pooled
    pub fn http() -> Self {
        Self::new(FacadeConfig::http())
    }

    /// HTTPS only, pooled
    pub fn https() -> Self {
        Self::new(FacadeConfig::https())
    }

    /// HTTP and HTTPS, pooled
    pub fn complete() -> Self {
        Self::new(FacadeConfig::complete())
    }

    /// HTTP and HTTPS, single-threaded
    pub fn single() -> Self {
        Self::new(FacadeConfig::single())
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    pub fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    /// Current execution mode
    pub fn mode(&self) -> ExecutionMode {
        if self.state.lock().manager.is_some() {
            ExecutionMode::Pooled
        } else {
            ExecutionMode::SingleThreaded
        }
    }

    /// Switch execution mode.
    ///
    /// Pooled mode reuses an existing connection manager and only creates one
    /// when none is present. Single mode tears the manager down.
    pub fn select(&self, mode: ExecutionMode) {
        match mode {
            ExecutionMode::Pooled => {
                let mut state = self.state.lock();
                if state.manager.is_some() {
                    debug!("Using connection manager from a previous selection");
                    return;
                }
                state.manager = Some(ConnectionManager::new(
                    self.config.params.clone(),
                    self.registry.clone(),
                ));
                state.client = None;
            }
            ExecutionMode::SingleThreaded => {
                debug!("Releasing connection manager for single-threaded use");
                self.release();
            }
        }
    }

    /// Return a client handle.
    ///
    /// Pooled mode caches the handle: repeated calls return the same client
    /// until the mode changes. Single mode builds a new client every call.
    pub fn acquire_client(&self) -> HttpResult<HttpClient> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(manager) = state.manager.as_mut() else {
            debug!("No connection manager, building single-threaded client");
            let client = build_reqwest(&self.config.params, &self.registry, false)
                .inspect_err(log_fault)?;
            return Ok(HttpClient::single(client, self.registry.clone()));
        };

        if let Some(client) = &state.client {
            return Ok(client.clone());
        }

        debug!("Building pooled client over connection manager");
        let client = HttpClient::pooled(
            manager.client().inspect_err(log_fault)?,
            self.registry.clone(),
            manager.guard(),
        );
        state.client = Some(client.clone());
        Ok(client)
    }

    /// Build a request for `method`.
    ///
    /// Body-bearing verbs always get a body, empty when `fields` is empty.
    /// GET and DELETE reject a non-empty field set.
    pub fn build_request<K, V>(
        &self,
        method: HttpMethod,
        url: &str,
        fields: &[(K, V)],
    ) -> HttpResult<Request>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        debug!(%method, url, "Request construction");
        let result = Url::parse(url).map_err(HttpError::from).and_then(|url| {
            if method.has_body() {
                let body = FormBody::new(fields, self.config.charset)?;
                Ok(Request::with_form(method, url, body))
            } else if fields.is_empty() {
                Ok(Request::new(method, url))
            } else {
                Err(HttpError::InvalidRequest(format!(
                    "{} does not carry a form body",
                    method
                )))
            }
        });
        result.inspect_err(log_fault)
    }

    pub fn get(&self, url: &str) -> HttpResult<Request> {
        self.build_request(HttpMethod::Get, url, NO_FIELDS)
    }

    pub fn delete(&self, url: &str) -> HttpResult<Request> {
        self.build_request(HttpMethod::Delete, url, NO_FIELDS)
    }

    pub fn post<K: AsRef<str>, V: AsRef<str>>(
        &self,
        url: &str,
        fields: &[(K, V)],
    ) -> HttpResult<Request> {
        self.build_request(HttpMethod::Post, url, fields)
    }

    pub fn put<K: AsRef<str>, V: AsRef<str>>(
        &self,
        url: &str,
        fields: &[(K, V)],
    ) -> HttpResult<Request> {
        self.build_request(HttpMethod::Put, url, fields)
    }

    pub fn patch<K: AsRef<str>, V: AsRef<str>>(
        &self,
        url: &str,
        fields: &[(K, V)],
    ) -> HttpResult<Request> {
        self.build_request(HttpMethod::Patch, url, fields)
    }

    /// Execute through the client from [`acquire_client`](Self::acquire_client)
    pub async fn execute(&self, request: &Request) -> HttpResult<HttpResponse> {
        let client = self.acquire_client()?;
        client.execute(request).await
    }

    /// See [`HttpResponse::drain_to_string`]
    pub async fn drain_to_string(
        &self,
        response: HttpResponse,
        request: &Request,
    ) -> HttpResult<String> {
        response.drain_to_string(request).await
    }

    /// Shut down the connection manager if there is one. Safe to call
    /// repeatedly. In-flight requests are not interrupted.
    pub fn release(&self) {
        let mut state = self.state.lock();
        match state.manager.take() {
            Some(mut manager) => manager.shutdown(),
            None => debug!("Connection manager has already been released"),
        }
        state.client = None;
    }
}

impl std::fmt::Debug for RequestFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestFacade")
            .field("schemes", &self.registry.names())
            .field("mode", &self.mode())
            .field("charset", &self.config.charset)
            .finish()
    }
}

fn log_fault(e: &HttpError) {
    error!(category = ?e.category(), "{}", e.sanitized_message());
}

/// Build, execute and drain one request on a fresh single-threaded facade.
///
/// This is NOT meant for concurrent use; each call sets up and tears down its
/// own client.
pub async fn run_once<K, V>(method: HttpMethod, url: &str, fields: &[(K, V)]) -> HttpResult<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let facade = RequestFacade::single();
    let client = facade.acquire_client()?;
    let request = facade.build_request(method, url, fields)?;
    let response = client.execute(&request).await?;
    let text = facade.drain_to_string(response, &request).await?;
    facade.release();
    Ok(text)
}

/// One-shot GET, see [`run_once`]
pub async fn simple_get(url: &str) -> HttpResult<String> {
    run_once(HttpMethod::Get, url, NO_FIELDS).await
}

/// One-shot DELETE, see [`run_once`]
pub async fn simple_delete(url: &str) -> HttpResult<String> {
    run_once(HttpMethod::Delete, url, NO_FIELDS).await
}

/// One-shot POST, see [`run_once`]
pub async fn simple_post<K: AsRef<str>, V: AsRef<str>>(
    url: &str,
    fields: &[(K, V)],
) -> HttpResult<String> {
    run_once(HttpMethod::Post, url, fields).await
}

/// One-shot PUT, see [`run_once`]
pub async fn simple_put<K: AsRef<str>, V: AsRef<str>>(
    url: &str,
    fields: &[(K, V)],
) -> HttpResult<String> {
    run_once(HttpMethod::Put, url, fields).await
}

/// One-shot PATCH, see [`run_once`]
pub async fn simple_patch<K: AsRef<str>, V: AsRef<str>>(
    url: &str,
    fields: &[(K, V)],
) -> HttpResult<String> {
    run_once(HttpMethod::Patch, url, fields).await
}
